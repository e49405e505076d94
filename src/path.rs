//! Path construction for dataset variables.
//!
//! Every variable of a dataset lives directly below the dataset's root
//! group: `<root_group>/<name>`. Names are single path components, so a
//! name can never reach outside its dataset or into another variable.

/// Separator between path components
pub const SEPARATOR: char = '/';

/// Reserved variable name of the XML header
pub const HEADER_NAME: &str = "xml";

/// Default variable name of the acquisition series
pub const ACQUISITION_SERIES: &str = "data";

/// Prefix reserved for internal staging names
pub(crate) const INTERNAL_PREFIX: char = '.';

/// Errors for invalid root groups or variable names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Name is empty
    #[error("name must not be empty")]
    Empty,

    /// Variable name contains the path separator
    #[error("name '{0}' must not contain '/'")]
    ContainsSeparator(String),

    /// Variable name is reserved
    #[error("name '{0}' is reserved")]
    Reserved(String),

    /// Root group is malformed
    #[error("invalid root group '{0}'")]
    InvalidRoot(String),
}

/// Validate and normalize a root group name.
///
/// A leading separator is kept, trailing separators are removed. The result
/// must name at least one group and contain no empty components.
pub fn normalize_root(root_group: &str) -> Result<String, PathError> {
    if root_group.is_empty() {
        return Err(PathError::Empty);
    }
    let trimmed = root_group.trim_end_matches(SEPARATOR);
    let body = trimmed.strip_prefix(SEPARATOR).unwrap_or(trimmed);
    if body.is_empty() || body.split(SEPARATOR).any(str::is_empty) {
        return Err(PathError::InvalidRoot(root_group.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Validate a caller-supplied variable name.
///
/// Rejects empty names, names containing the separator, the header name and
/// names starting with `.`.
pub fn validate_name(name: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::Empty);
    }
    if name.contains(SEPARATOR) {
        return Err(PathError::ContainsSeparator(name.to_string()));
    }
    if name == HEADER_NAME || name.starts_with(INTERNAL_PREFIX) {
        return Err(PathError::Reserved(name.to_string()));
    }
    Ok(())
}

/// Join a normalized root group and a variable name without validation.
pub(crate) fn join(root_group: &str, name: &str) -> String {
    let mut path = String::with_capacity(root_group.len() + name.len() + 1);
    path.push_str(root_group);
    path.push(SEPARATOR);
    path.push_str(name);
    path
}

/// Build the path of a record variable below a normalized root group.
pub fn resolve(root_group: &str, name: &str) -> Result<String, PathError> {
    validate_name(name)?;
    Ok(join(root_group, name))
}

/// Path of the XML header below a normalized root group
pub fn header_path(root_group: &str) -> String {
    join(root_group, HEADER_NAME)
}
