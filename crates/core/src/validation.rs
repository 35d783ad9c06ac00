//! Input validation utilities.
//!
//! Small, pure checks shared by configuration and by the submission mapper. Each returns a
//! plain answer; callers decide which message to surface.

use crate::{IntakeError, IntakeResult};
use chrono::NaiveDate;

/// Validates that a signature base URL is safe to prefix onto stored relative paths.
///
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Requires an `http://` or `https://` scheme and a host
/// - Rejects whitespace and non-ASCII characters
///
/// # Errors
///
/// Returns `IntakeError::InvalidInput` describing the first failed rule.
pub fn validate_base_url(url: &str) -> IntakeResult<()> {
    const MAX_URL_LEN: usize = 2048;

    if url.trim().is_empty() {
        return Err(IntakeError::InvalidInput(
            "signature base URL cannot be empty".into(),
        ));
    }

    if url.len() > MAX_URL_LEN {
        return Err(IntakeError::InvalidInput(format!(
            "signature base URL exceeds maximum length of {} characters",
            MAX_URL_LEN
        )));
    }

    if !url.is_ascii() || url.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
        return Err(IntakeError::InvalidInput(
            "signature base URL must be ASCII without whitespace".into(),
        ));
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            IntakeError::InvalidInput("signature base URL must start with http:// or https://".into())
        })?;

    if rest.split('/').next().unwrap_or("").is_empty() {
        return Err(IntakeError::InvalidInput(
            "signature base URL must include a host".into(),
        ));
    }

    Ok(())
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses a finite decimal number.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Loose email shape check: one `@`, non-empty local part, a dotted domain, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Checkbox-style truthiness for raw transport values.
pub fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_rules() {
        assert!(validate_base_url("https://clinic.example/uploads").is_ok());
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("https://").is_err());
        assert!(validate_base_url("clinic.example").is_err());
        assert!(validate_base_url("https://clinic example").is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(
            parse_date("1990-04-12"),
            NaiveDate::from_ymd_opt(1990, 4, 12)
        );
        assert!(parse_date("12/04/1990").is_none());
        assert!(parse_date("1990-02-30").is_none());
    }

    #[test]
    fn numbers_must_be_finite() {
        assert_eq!(parse_number(" 98.6 "), Some(98.6));
        assert!(parse_number("NaN").is_none());
        assert!(parse_number("abc").is_none());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("jane@clinic.example"));
        assert!(!is_valid_email("jane@clinic"));
        assert!(!is_valid_email("jane@@clinic.example"));
        assert!(!is_valid_email("@clinic.example"));
        assert!(!is_valid_email("jane doe@clinic.example"));
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy("1"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("False"));
    }
}
