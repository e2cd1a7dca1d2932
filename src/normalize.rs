//! Canonical forms for phone numbers and email addresses.
//!
//! Everything here is total: malformed input yields a best-effort canonical
//! string or `false`, never a panic or an error.
//!
//! Phone handling is a heuristic tuned for North American numbers, not full
//! international validation. A bare 10-digit number is assumed to belong to
//! [`DEFAULT_COUNTRY_CODE`]; anything longer is assumed to already carry its
//! country code.

/// Country calling code assumed for bare 10-digit numbers
pub const DEFAULT_COUNTRY_CODE: &str = "1";

pub const MIN_PHONE_DIGITS: usize = 10;
pub const MAX_PHONE_DIGITS: usize = 15;

fn digits_of(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a phone number to an E.164-like `+<digits>` string
pub fn normalize_phone(raw: &str) -> String {
    let digits = digits_of(raw);

    if digits.len() == 10 {
        return format!("+{}{}", DEFAULT_COUNTRY_CODE, digits);
    }

    // 11+ digits already carry a country code (including the default one);
    // shorter inputs are kept as-is behind the plus sign.
    format!("+{}", digits)
}

/// Normalize an email address: trimmed and lowercased, nothing more
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A phone is valid when it has between 10 and 15 digits
pub fn is_valid_phone(raw: &str) -> bool {
    let count = raw.chars().filter(|c| c.is_ascii_digit()).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&count)
}

/// Single `@`, non-empty local part and domain, dotted domain
pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };

    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Returns the input only when it carries a non-blank value
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_digits_get_default_country_code() {
        for raw in ["5551234567", "(555) 123-4567", "555.123.4567", " 555 123 4567 "] {
            assert_eq!(normalize_phone(raw), "+15551234567", "input {:?}", raw);
        }
    }

    #[test]
    fn test_ten_digit_strings_keep_their_digits() {
        for n in [0u64, 1, 999_999_999, 2_125_550_000, 9_999_999_999] {
            let raw = format!("{:010}", n);
            let normalized = normalize_phone(&raw);
            assert!(normalized.starts_with('+'));
            assert_eq!(&normalized[1..], format!("{}{}", DEFAULT_COUNTRY_CODE, raw));
        }
    }

    #[test]
    fn test_eleven_digits_with_leading_country_digit() {
        assert_eq!(normalize_phone("1-555-123-4567"), "+15551234567");
        assert_eq!(normalize_phone("+1 (555) 123-4567"), "+15551234567");
    }

    #[test]
    fn test_longer_numbers_are_prefixed_directly() {
        assert_eq!(normalize_phone("+44 20 7946 0958"), "+442079460958");
        assert_eq!(normalize_phone("0049 30 123456789"), "+004930123456789");
    }

    #[test]
    fn test_short_and_empty_inputs_are_best_effort() {
        assert_eq!(normalize_phone("12345"), "+12345");
        assert_eq!(normalize_phone("call me"), "+");
        assert_eq!(normalize_phone(""), "+");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" User@Example.COM "), "user@example.com");
        assert_eq!(normalize_email("first+tag@mail.com"), "first+tag@mail.com");
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("555-123-4567"));
        assert!(is_valid_phone("+44 20 7946 0958"));
        assert!(is_valid_phone("123456789012345"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("  Alice@Example.com "));
        assert!(!is_valid_email("alice.example.com"));
        assert!(!is_valid_email("alice@@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("al ice@example.com"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
