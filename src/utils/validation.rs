use regex::Regex;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Shape check, not RFC 5322: something@something.tld with a letters-only
/// TLD of at least two characters.
pub fn validate_email(email: &str) -> Result<(), String> {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[A-Za-z]{2,}$").unwrap());

    if re.is_match(email) {
        Ok(())
    } else {
        Err("Invalid email format".to_string())
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    Ok(())
}

/// Lexical `YYYY-MM-DD` gate for the delivery date filter. Deliberately not
/// a calendar check: `2024-13-40` passes here and is compared literally
/// against the column, matching nothing.
pub fn is_date_literal(value: &str) -> bool {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
    re.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana.silva+tasks@mail.example.co").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana@example.c").is_err());
        assert!(validate_email("ana@example.123").is_err());
    }

    #[test]
    fn password_length_boundary() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn date_literal_is_lexical_only() {
        assert!(is_date_literal("2026-08-25"));
        assert!(is_date_literal("2024-13-40"));
        assert!(!is_date_literal("2026-8-25"));
        assert!(!is_date_literal("today"));
        assert!(!is_date_literal("2026-08-25T00:00:00Z"));
        assert!(!is_date_literal(""));
    }
}
