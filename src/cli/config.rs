//! TOML configuration file support.
//!
//! The `demo` command reads its acquisition geometry from a config file
//! instead of a long list of flags:
//!
//! ```toml
//! # demo.toml
//! [demo]
//! group = "/dataset"
//! samples = 256
//! phase_encodes = 128
//! channels = 8
//! resonance_frequency_hz = 63500000
//! sync_on_write = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use ismrmrd::dataset::DEFAULT_GROUP;

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Settings for the demo command.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Geometry of the synthetic Cartesian scan written by `demo`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Group to write.
    pub group: String,

    /// Readout samples per line.
    pub samples: u16,

    /// Phase encoding lines.
    pub phase_encodes: u16,

    /// Receiver channels.
    pub channels: u16,

    /// H1 resonance frequency in Hz.
    pub resonance_frequency_hz: i64,

    /// `fsync` after every appended record.
    pub sync_on_write: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            samples: 256,
            phase_encodes: 128,
            channels: 8,
            resonance_frequency_hz: 128_000_000,
            sync_on_write: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
