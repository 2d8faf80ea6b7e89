use std::sync::OnceLock;

use regex::Regex;

use super::super::domain::FormatKind;

/// Opaque format predicates owned by the validation utilities, not the engine.
///
/// The engine only decides whether a question needs a check; implementations decide
/// what a valid phone number or national ID looks like for the deployment.
pub trait FormatValidator: Send + Sync {
    fn is_valid(&self, kind: FormatKind, value: &str) -> bool;
}

/// Default predicates shipped with the service binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormats;

impl FormatValidator for StandardFormats {
    fn is_valid(&self, kind: FormatKind, value: &str) -> bool {
        let value = value.trim();
        match kind {
            FormatKind::Email => email_pattern().is_match(value),
            FormatKind::Phone => {
                let compact: String = value
                    .chars()
                    .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
                    .collect();
                phone_pattern().is_match(&compact)
            }
            FormatKind::Url => url_pattern().is_match(value),
            FormatKind::PostalCode => {
                value.len() == 5 && value.bytes().all(|b| b.is_ascii_digit())
            }
            FormatKind::NationalId => national_id_is_valid(value),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("phone pattern compiles"))
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").expect("url pattern compiles")
    })
}

/// 13 digits where the last is a weighted mod-11 check digit over the first 12.
fn national_id_is_valid(value: &str) -> bool {
    let digits: Vec<u32> = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    if digits.len() != 13 {
        return false;
    }

    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(index, digit)| digit * (13 - index as u32))
        .sum();
    let check = (11 - sum % 11) % 10;

    check == digits[12]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_requires_domain_with_dot() {
        let formats = StandardFormats;
        assert!(formats.is_valid(FormatKind::Email, "owner@sunfarm.co.th"));
        assert!(!formats.is_valid(FormatKind::Email, "owner@localhost"));
        assert!(!formats.is_valid(FormatKind::Email, "owner at sunfarm.co"));
    }

    #[test]
    fn phone_ignores_separators() {
        let formats = StandardFormats;
        assert!(formats.is_valid(FormatKind::Phone, "+66 (81) 234-5678"));
        assert!(formats.is_valid(FormatKind::Phone, "081-234-5678"));
        assert!(!formats.is_valid(FormatKind::Phone, "12345"));
    }

    #[test]
    fn url_needs_http_scheme() {
        let formats = StandardFormats;
        assert!(formats.is_valid(FormatKind::Url, "https://maps.example.com/site/42"));
        assert!(!formats.is_valid(FormatKind::Url, "ftp://example.com"));
    }

    #[test]
    fn postal_code_is_five_digits() {
        let formats = StandardFormats;
        assert!(formats.is_valid(FormatKind::PostalCode, "10110"));
        assert!(!formats.is_valid(FormatKind::PostalCode, "1011"));
        assert!(!formats.is_valid(FormatKind::PostalCode, "10a10"));
    }

    #[test]
    fn national_id_checks_digit() {
        let formats = StandardFormats;
        assert!(formats.is_valid(FormatKind::NationalId, "1101700230708"));
        assert!(formats.is_valid(FormatKind::NationalId, "1-1017-00230-70-8"));
        assert!(!formats.is_valid(FormatKind::NationalId, "1101700230705"));
        assert!(!formats.is_valid(FormatKind::NationalId, "110170023070"));
    }
}
