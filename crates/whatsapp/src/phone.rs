//! Recipient normalization for deep-link dialing.

use crate::outcome::RejectReason;

/// Reduce a raw recipient to the digit-only dial string the deep link
/// takes. Numbers given without a leading `+` get the configured country
/// code prepended; the `+` itself never appears in the dial string.
///
/// Rejects inputs where no digits survive or the dial string ends up
/// shorter than `min_digits` (country code included).
pub fn normalize(
    raw: &str,
    country_code: &str,
    min_digits: usize,
) -> Result<String, RejectReason> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(RejectReason::InvalidNumber);
    }

    let dial = if trimmed.starts_with('+') {
        digits
    } else {
        let code: String = country_code.chars().filter(char::is_ascii_digit).collect();
        format!("{code}{digits}")
    };

    if dial.len() < min_digits {
        return Err(RejectReason::InvalidNumber);
    }
    Ok(dial)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("+91 98765-43210", "919876543210")]
    #[case("98765 43210", "919876543210")]
    #[case("(98765) 432-10", "919876543210")]
    #[case("  9876543210  ", "919876543210")]
    #[case("+4915112345678", "4915112345678")]
    fn normalizes_to_dial_digits(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw, "+91", 8).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("call me maybe")]
    #[case("12")]
    #[case("+1 23")]
    fn rejects_implausible_input(#[case] raw: &str) {
        assert_eq!(
            normalize(raw, "+91", 8).unwrap_err(),
            RejectReason::InvalidNumber
        );
    }

    #[test]
    fn country_code_without_plus_still_contributes_digits() {
        assert_eq!(normalize("2345678", "49", 8).unwrap(), "492345678");
    }

    #[test]
    fn plus_prefixed_number_skips_country_code() {
        assert_eq!(normalize("+12025550143", "+91", 8).unwrap(), "12025550143");
    }
}
