use crate::error::SettingsError;

/// Namespace, organization, and application names end up in file names and
/// settings-file group headers, so they are restricted to alphanumerics,
/// spaces, dashes, and periods.
pub fn validate(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '.')
}

/// Validate `name`, returning it on success and `InvalidNamespace` otherwise.
pub(crate) fn checked(name: &str) -> Result<String, SettingsError> {
    if validate(name) {
        Ok(name.to_string())
    } else {
        Err(SettingsError::InvalidNamespace(name.to_string()))
    }
}
