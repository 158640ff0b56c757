use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile"));

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Please enter the units consumed as a positive number")]
    InvalidUnits,
}

/// Pure validation of credentials, run before any request is made.
///
/// Rules:
/// - the trimmed email must look like `local@domain.tld`;
/// - the trimmed password must be at least [`MIN_PASSWORD_LEN`] characters.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.trim().chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Parse a meter reading entered by the user. Must be finite and positive.
pub fn parse_units(input: &str) -> Result<f64, ValidationError> {
    let units: f64 = input.trim().parse().map_err(|_| ValidationError::InvalidUnits)?;
    if !units.is_finite() || units <= 0.0 {
        return Err(ValidationError::InvalidUnits);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validation_accepts_valid_input() {
        assert!(validate_credentials(" ada@example.com ", "secret1").is_ok());
    }

    #[test]
    fn credentials_validation_rejects_bad_email() {
        for email in ["", "ada", "ada@example", "a da@example.com", "@example.com"] {
            assert_eq!(
                validate_credentials(email, "secret1"),
                Err(ValidationError::InvalidEmail),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn credentials_validation_rejects_short_password() {
        assert_eq!(
            validate_credentials("ada@example.com", "  12345  "),
            Err(ValidationError::PasswordTooShort)
        );
    }

    #[test]
    fn units_must_be_positive_numbers() {
        assert_eq!(parse_units(" 120.5 "), Ok(120.5));
        assert_eq!(parse_units("0"), Err(ValidationError::InvalidUnits));
        assert_eq!(parse_units("-3"), Err(ValidationError::InvalidUnits));
        assert_eq!(parse_units("abc"), Err(ValidationError::InvalidUnits));
        assert_eq!(parse_units("inf"), Err(ValidationError::InvalidUnits));
    }
}
