//! Password rule applied before sign-in and sign-up.

/// Minimum password length in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {min} characters")]
    TooShort { min: usize },
}

/// Check a password against the local rule.
///
/// # Errors
///
/// Returns [`PasswordError::TooShort`] for passwords under
/// [`MIN_PASSWORD_CHARS`] characters.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_CHARS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 3 characters, 9 bytes
        assert!(validate_password("ấấấ").is_err());
        assert!(validate_password("ấấấấấấ").is_ok());
    }
}
