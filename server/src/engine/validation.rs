/// Maximum server name length (characters).
pub const MAX_SERVER_NAME_LENGTH: usize = 100;

/// Maximum server description length (characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Join codes shorter than this are refused at startup.
pub const MIN_JOIN_CODE_LENGTH: usize = 6;

/// Validate a server name. Must be 1-100 chars and not only whitespace.
pub fn validate_server_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Server name cannot be empty".into());
    }
    if name.chars().count() > MAX_SERVER_NAME_LENGTH {
        return Err(format!(
            "Server name too long (max {} characters)",
            MAX_SERVER_NAME_LENGTH
        ));
    }
    Ok(())
}

/// Validate a description. Can be empty but has a length limit.
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description too long (max {} characters)",
            MAX_DESCRIPTION_LENGTH
        ));
    }
    Ok(())
}
