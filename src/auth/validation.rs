use std::sync::OnceLock;

use regex::Regex;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 50;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9.]+$").expect("valid username regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9]([.]?[a-zA-Z0-9]+)*@(gmail\.com|hotmail\.com|yahoo\.com)$")
            .expect("valid email regex")
    })
}

pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        ));
    }
    if !username_regex().is_match(username) {
        return Err("Username may only contain letters, digits and dots".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if !email_regex().is_match(email) {
        return Err("Email must be a gmail.com, hotmail.com or yahoo.com address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN, PASSWORD_MAX
        ));
    }
    if password != confirmation {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

/// Run every registration check, returning the first failure.
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), String> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password, confirmation)
}

/// Length bounds a login attempt must satisfy before any lookup.
pub fn login_within_bounds(username: &str, password: &str) -> bool {
    (USERNAME_MIN..=USERNAME_MAX).contains(&username.chars().count())
        && (PASSWORD_MIN..=PASSWORD_MAX).contains(&password.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_allow_letters_digits_and_dots() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice.01").is_ok());
        assert!(validate_username("A.B").is_ok());
    }

    #[test]
    fn usernames_reject_spaces_symbols_and_bad_lengths() {
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username("alice@home").is_err());
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn email_domains_are_restricted() {
        assert!(validate_email("alice@gmail.com").is_ok());
        assert!(validate_email("a.lice@hotmail.com").is_ok());
        assert!(validate_email("bob99@yahoo.com").is_ok());
        assert!(validate_email("user@company.com").is_err());
        assert!(validate_email(".alice@gmail.com").is_err());
        assert!(validate_email("alice..b@gmail.com").is_err());
        assert!(validate_email("alice@gmail.com.evil").is_err());
    }

    #[test]
    fn passwords_need_length_and_matching_confirmation() {
        assert!(validate_password("hunter22", "hunter22").is_ok());
        assert!(validate_password("short", "short").is_err());
        assert!(validate_password(&"p".repeat(51), &"p".repeat(51)).is_err());
        assert_eq!(
            validate_password("hunter22", "hunter23").unwrap_err(),
            "Passwords do not match"
        );
    }

    #[test]
    fn registration_reports_first_failure() {
        let err = validate_registration("bad name", "user@company.com", "x", "y").unwrap_err();
        assert!(err.starts_with("Username"));
        let err = validate_registration("alice", "user@company.com", "x", "y").unwrap_err();
        assert!(err.starts_with("Email"));
        assert!(validate_registration("alice", "alice@gmail.com", "hunter22", "hunter22").is_ok());
    }

    #[test]
    fn login_bounds() {
        assert!(login_within_bounds("alice", "hunter22"));
        assert!(!login_within_bounds("al", "hunter22"));
        assert!(!login_within_bounds("alice", "short"));
    }
}
