use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed
    Ok,
    /// Check passed, but something looks off
    Warning(String),
    /// Check failed
    Failed(String),
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning(_) => "⚠",
            CheckStatus::Failed(_) => "✗",
        }
    }
}

/// One named check and its outcome
#[derive(Debug, Clone)]
pub struct ValidationCheck {
    /// Name of the check
    pub name: String,
    /// Outcome
    pub status: CheckStatus,
}

impl ValidationCheck {
    pub(crate) fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
        }
    }

    pub(crate) fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warning(message.into()),
        }
    }

    pub(crate) fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Failed(message.into()),
        }
    }
}

/// All checks run against one group of a dataset file
#[derive(Debug)]
pub struct ValidationReport {
    /// Checks in the order they ran
    pub checks: Vec<ValidationCheck>,
    /// Validated file
    pub file_path: String,
    /// Validated group
    pub group: String,
}

impl ValidationReport {
    /// Empty report for `group` of `file_path`
    pub fn new(file_path: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            checks: Vec::new(),
            file_path: file_path.into(),
            group: group.into(),
        }
    }

    /// Record a check
    pub fn add_check(&mut self, check: ValidationCheck) {
        self.checks.push(check);
    }

    /// Look up a check by name
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// True when any check failed
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// True when any check warned
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Number of passed checks
    pub fn success_count(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Ok))
    }

    /// Number of warnings
    pub fn warning_count(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Warning(_)))
    }

    /// Number of failures
    pub fn failure_count(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&CheckStatus) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.status)).count()
    }

    fn verdict(&self) -> &'static str {
        if self.has_failures() {
            "Validation FAILED"
        } else if self.has_warnings() {
            "Validation PASSED with warnings"
        } else {
            "Validation PASSED"
        }
    }

    /// Render the report for a terminal (plain text without `colorized_output`)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();
            output.push_str(&format!("{}\n", style("ISMRMRD Validation Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=========================").cyan()));
            output.push_str(&format!("{}: {}\n", style("File").bold(), self.file_path));
            output.push_str(&format!("{}: {}\n\n", style("Group").bold(), self.group));

            for check in &self.checks {
                let symbol = check.status.symbol();
                match &check.status {
                    CheckStatus::Ok => output.push_str(&format!(
                        "[{}] {}\n",
                        style(symbol).green(),
                        check.name
                    )),
                    CheckStatus::Warning(msg) => output.push_str(&format!(
                        "[{}] {} - {}: {}\n",
                        style(symbol).yellow(),
                        check.name,
                        style("WARNING").yellow().bold(),
                        msg
                    )),
                    CheckStatus::Failed(msg) => output.push_str(&format!(
                        "[{}] {} - {}: {}\n",
                        style(symbol).red(),
                        check.name,
                        style("FAILED").red().bold(),
                        msg
                    )),
                }
            }

            output.push_str(&format!(
                "\n{}: {} passed, {} warnings, {} failed\n\n",
                style("Summary").bold(),
                style(self.success_count()).green(),
                style(self.warning_count()).yellow(),
                style(self.failure_count()).red()
            ));

            let verdict = if self.has_failures() {
                style(self.verdict()).red().bold()
            } else if self.has_warnings() {
                style(self.verdict()).yellow().bold()
            } else {
                style(self.verdict()).green().bold()
            };
            output.push_str(&format!("{}\n", verdict));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            self.to_string()
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ISMRMRD Validation Report")?;
        writeln!(f, "=========================")?;
        writeln!(f, "File: {}", self.file_path)?;
        writeln!(f, "Group: {}", self.group)?;
        writeln!(f)?;

        for check in &self.checks {
            write!(f, "[{}] {}", check.status.symbol(), check.name)?;
            match &check.status {
                CheckStatus::Ok => writeln!(f)?,
                CheckStatus::Warning(msg) => writeln!(f, " - WARNING: {}", msg)?,
                CheckStatus::Failed(msg) => writeln!(f, " - FAILED: {}", msg)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} passed, {} warnings, {} failed",
            self.success_count(),
            self.warning_count(),
            self.failure_count()
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.verdict())
    }
}
