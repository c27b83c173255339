// Input normalization and validation shared by the services
use crate::{AppError, Result};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const COMMUNITY_NAME_MIN: usize = 3;
pub const COMMUNITY_NAME_MAX: usize = 21;
pub const COMMUNITY_DESCRIPTION_MAX: usize = 500;
pub const POST_TITLE_MAX: usize = 300;
pub const POST_BODY_MAX: usize = 40_000;
pub const COMMENT_BODY_MAX: usize = 10_000;

fn is_identifier(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) || !is_identifier(username) {
        return Err(AppError::ValidationError(format!(
            "Username must be {}-{} characters of letters, digits or underscores",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    Ok(username.to_string())
}

pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }
    Ok(email.to_string())
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }
    if password.trim().is_empty() {
        return Err(AppError::ValidationError("Password cannot be only whitespace".to_string()));
    }
    Ok(())
}

pub fn validate_community_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(COMMUNITY_NAME_MIN..=COMMUNITY_NAME_MAX).contains(&len) || !is_identifier(name) {
        return Err(AppError::ValidationError(format!(
            "Community name must be {}-{} characters of letters, digits or underscores",
            COMMUNITY_NAME_MIN, COMMUNITY_NAME_MAX
        )));
    }
    Ok(name.to_string())
}

/// Trim `raw` and check its length in characters. `min == 0` allows empty text.
pub fn validate_text(field: &str, raw: &str, min: usize, max: usize) -> Result<String> {
    let text = raw.trim();
    let len = text.chars().count();
    if len < min {
        return Err(AppError::ValidationError(format!("{} cannot be empty", field)));
    }
    if len > max {
        return Err(AppError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username("  reddit_fan9 ").unwrap(), "reddit_fan9");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-name").is_err());
        assert!(validate_username(&"x".repeat(USERNAME_MAX + 1)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("a@b.io").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@domain.com").is_err());
        assert!(validate_email("two@@ats").is_err());
        assert!(validate_email("sp ace@x.io").is_err());
    }

    #[test]
    fn test_text_bounds() {
        assert_eq!(validate_text("Title", "  hi  ", 1, 10).unwrap(), "hi");
        assert!(validate_text("Title", "   ", 1, 10).is_err());
        assert!(validate_text("Title", "eleven char", 1, 10).is_err());
        assert_eq!(validate_text("Body", "", 0, 10).unwrap(), "");
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("          ").is_err());
    }
}
