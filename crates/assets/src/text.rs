use almox_core::{DomainError, DomainResult};

/// Case-insensitive uniqueness key for location and sector names.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn required(value: &str, max_len: usize, field: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} is longer than {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

/// Blank strings collapse to `None`.
pub(crate) fn optional(value: Option<&str>, max_len: usize, field: &str) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required(v, max_len, field).map(Some),
    }
}
