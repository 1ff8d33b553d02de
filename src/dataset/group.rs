//! Group names and the per-group record index

use std::collections::BTreeMap;

use super::store::{BlockKind, BlockRef};
use super::DatasetError;

/// Group used when none is given
pub const DEFAULT_GROUP: &str = "/dataset";

/// Names reserved for the variables stored inside a group
pub const RESERVED_NAMES: [&str; 3] = ["xml", "data", "waveforms"];

/// Check that `name` is an absolute, slash-separated group path
pub(crate) fn validate_group_name(name: &str) -> Result<(), DatasetError> {
    let invalid = |why: &str| {
        DatasetError::unavailable(format!("invalid group name {:?}: {}", name, why))
    };

    let Some(rest) = name.strip_prefix('/') else {
        return Err(invalid("must start with '/'"));
    };
    if rest.is_empty() {
        return Err(invalid("the root cannot hold a dataset"));
    }
    if name.len() > u16::MAX as usize {
        return Err(invalid("too long"));
    }
    if name.contains('\0') {
        return Err(invalid("contains NUL"));
    }
    for component in rest.split('/') {
        match component {
            "" => return Err(invalid("empty path component")),
            "." | ".." => return Err(invalid("relative path component")),
            c if RESERVED_NAMES.contains(&c) => {
                return Err(invalid("component collides with a reserved variable name"))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Check that `name` can label an image or array variable of `group`
pub(crate) fn validate_variable_name(group: &str, name: &str) -> Result<(), DatasetError> {
    let valid = !name.is_empty()
        && !name.contains(['/', '\0'])
        && !matches!(name, "." | "..")
        && !RESERVED_NAMES.contains(&name)
        && group.len() + 1 + name.len() <= u16::MAX as usize;
    if valid {
        Ok(())
    } else {
        Err(DatasetError::InvalidVariable(name.to_string()))
    }
}

/// True when `inner` lies strictly below `outer`
fn encloses(outer: &str, inner: &str) -> bool {
    inner.len() > outer.len()
        && inner.starts_with(outer)
        && inner.as_bytes()[outer.len()] == b'/'
}

/// Reject a group nested inside, or enclosing, an existing group
pub(crate) fn check_collision<'a>(
    name: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> Result<(), DatasetError> {
    for other in existing {
        if encloses(other, name) || encloses(name, other) {
            return Err(DatasetError::unavailable(format!(
                "group {:?} collides with existing group {:?}",
                name, other
            )));
        }
    }
    Ok(())
}

/// Committed blocks of one group
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupIndex {
    /// Most recent header block
    pub header: Option<BlockRef>,
    /// Acquisition blocks in append order
    pub acquisitions: Vec<BlockRef>,
    /// Waveform blocks in append order
    pub waveforms: Vec<BlockRef>,
    /// Image blocks per variable, in append order
    pub images: BTreeMap<String, Vec<BlockRef>>,
    /// Array blocks per variable, in append order
    pub arrays: BTreeMap<String, Vec<BlockRef>>,
}

impl GroupIndex {
    pub(crate) fn record(&mut self, block: BlockRef) {
        match block.kind {
            BlockKind::Group => {}
            BlockKind::Header => self.header = Some(block),
            BlockKind::Acquisition => self.acquisitions.push(block),
            BlockKind::Waveform => self.waveforms.push(block),
            BlockKind::Image | BlockKind::Array => {
                let variable = block.variable.clone().unwrap_or_default();
                self.variables_mut(block.kind).entry(variable).or_default().push(block);
            }
        }
    }

    fn variables_mut(&mut self, kind: BlockKind) -> &mut BTreeMap<String, Vec<BlockRef>> {
        match kind {
            BlockKind::Array => &mut self.arrays,
            _ => &mut self.images,
        }
    }

    /// Image or array variables with their blocks
    pub(crate) fn variables(&self, kind: BlockKind) -> &BTreeMap<String, Vec<BlockRef>> {
        match kind {
            BlockKind::Array => &self.arrays,
            _ => &self.images,
        }
    }

    /// Blocks of one image or array variable; empty when it does not exist
    pub(crate) fn variable_records(&self, kind: BlockKind, variable: &str) -> &[BlockRef] {
        self.variables(kind)
            .get(variable)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Indexed record blocks of one kind
    pub(crate) fn records(&self, kind: BlockKind) -> &[BlockRef] {
        match kind {
            BlockKind::Acquisition => &self.acquisitions,
            BlockKind::Waveform => &self.waveforms,
            BlockKind::Group | BlockKind::Header | BlockKind::Image | BlockKind::Array => &[],
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.header.is_none()
            && self.acquisitions.is_empty()
            && self.waveforms.is_empty()
            && self.images.is_empty()
            && self.arrays.is_empty()
    }
}

/// Index every group found in a file
pub(crate) fn index_blocks(blocks: Vec<BlockRef>) -> BTreeMap<String, GroupIndex> {
    let mut groups: BTreeMap<String, GroupIndex> = BTreeMap::new();
    for block in blocks {
        groups.entry(block.group.clone()).or_default().record(block);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_group_name("/dataset").is_ok());
        assert!(validate_group_name("/study/series_1").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "dataset", "/", "/a//b", "/a/", "/a/../b", "/xml", "/a/data", "/waveforms/x"] {
            assert!(
                matches!(validate_group_name(name), Err(DatasetError::StorageUnavailable(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_variable_names() {
        assert!(validate_variable_name("/dataset", "image_0").is_ok());
        assert!(validate_variable_name("/dataset", "coil maps").is_ok());
        for name in ["", "a/b", ".", "..", "xml", "data", "waveforms", "nul\0"] {
            assert!(
                matches!(
                    validate_variable_name("/dataset", name),
                    Err(DatasetError::InvalidVariable(_))
                ),
                "{:?} should be rejected",
                name
            );
        }
        let long = "v".repeat(u16::MAX as usize);
        assert!(validate_variable_name("/dataset", &long).is_err());
    }

    #[test]
    fn test_collisions() {
        let existing = ["/dataset", "/study/a"];
        assert!(check_collision("/dataset", existing).is_ok());
        assert!(check_collision("/datasets", existing).is_ok());
        assert!(check_collision("/study/b", existing).is_ok());
        assert!(check_collision("/dataset/inner", existing).is_err());
        assert!(check_collision("/study", existing).is_err());
    }
}
