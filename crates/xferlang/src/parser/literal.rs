//! Conversion of literal token text into element payloads.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::chars::CharacterRegistry;
use crate::error::{Error, ErrorCode, Result};

/// Digits `f64` keeps exactly; longer mantissas lose precision.
const DOUBLE_SIGNIFICANT_DIGITS: usize = 17;

/// Signed integer with optional `$` (hex) or `%` (binary) prefix after the sign.
fn radix_integer(text: &str) -> Option<i128> {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = body.strip_prefix('$') {
        i128::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = body.strip_prefix('%') {
        i128::from_str_radix(bin, 2).ok()?
    } else {
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        body.parse::<i128>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn has_radix_prefix(text: &str) -> bool {
    let body = text.trim_start_matches(['-', '+']);
    body.starts_with('$') || body.starts_with('%')
}

pub(crate) fn integer(text: &str) -> Result<i32> {
    radix_integer(text).and_then(|v| i32::try_from(v).ok()).ok_or_else(|| Error::literal("integer", text))
}

pub(crate) fn long(text: &str) -> Result<i64> {
    radix_integer(text).and_then(|v| i64::try_from(v).ok()).ok_or_else(|| Error::literal("long", text))
}

pub(crate) fn decimal(text: &str) -> Result<Decimal> {
    if has_radix_prefix(text) {
        return long(text).map(Decimal::from).map_err(|_| Error::literal("decimal", text));
    }
    let mut value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| Error::literal("decimal", text))?;
    if value.is_zero() && text.trim_start().starts_with('-') {
        value.set_sign_negative(true);
    }
    Ok(value)
}

/// The value plus whether the literal carried more digits than a double holds.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn double(text: &str) -> Result<(f64, bool)> {
    if has_radix_prefix(text) {
        return long(text).map(|v| (v as f64, false)).map_err(|_| Error::literal("double", text));
    }
    let value = f64::from_str(text).map_err(|_| Error::literal("double", text))?;
    Ok((value, significant_digits(text) > DOUBLE_SIGNIFICANT_DIGITS))
}

fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

pub(crate) fn boolean(text: &str) -> Result<bool> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::literal("boolean", text))
    }
}

/// `$hex`, `%binary`, decimal digits, or a registered character name.
pub(crate) fn character(text: &str, names: &CharacterRegistry) -> Result<char> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::from_code(ErrorCode::InvalidEscape, "Empty character element"));
    }
    let code = if let Some(hex) = text.strip_prefix('$') {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix('%') {
        u32::from_str_radix(bin, 2).ok()
    } else if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse::<u32>().ok()
    } else {
        return names.resolve(text).ok_or_else(|| {
            Error::from_code(ErrorCode::InvalidEscape, format!("Unknown character name '{text}'"))
        });
    };
    code.and_then(char::from_u32).ok_or_else(|| {
        Error::from_code(ErrorCode::InvalidEscape, format!("'{text}' is not a valid Unicode scalar value"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", 42)]
    #[case("-42", -42)]
    #[case("$2A", 42)]
    #[case("%101010", 42)]
    #[case("-$10", -16)]
    fn integer_forms(#[case] text: &str, #[case] expected: i32) {
        assert_eq!(integer(text).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("4x")]
    #[case("3000000000")]
    #[case("$")]
    fn invalid_integers(#[case] text: &str) {
        assert_eq!(integer(text).unwrap_err().code, ErrorCode::InvalidLiteral);
    }

    #[test]
    fn long_accepts_i64_range() {
        assert_eq!(long("3000000000").unwrap(), 3_000_000_000);
        assert!(long("99999999999999999999").is_err());
    }

    #[test]
    fn decimal_keeps_scale() {
        assert_eq!(decimal("1.50").unwrap().to_string(), "1.50");
        assert_eq!(decimal("1e3").unwrap(), Decimal::from(1000));
        assert_eq!(decimal("$FF").unwrap(), Decimal::from(255));
    }

    #[test]
    fn decimal_keeps_negative_zero() {
        let zero = decimal("-0.000").unwrap();
        assert!(zero.is_zero());
        assert!(zero.is_sign_negative());
        assert!(decimal("0.0").unwrap().is_sign_positive());
    }

    #[test]
    fn double_flags_precision_loss() {
        assert_eq!(double("2.5").unwrap(), (2.5, false));
        assert!(double("3.14159265358979323846").unwrap().1);
        assert!(double("abc").is_err());
    }

    #[rstest]
    #[case("$41", 'A')]
    #[case("65", 'A')]
    #[case("%1000001", 'A')]
    #[case("tab", '\t')]
    #[case("$1F600", '\u{1F600}')]
    fn character_forms(#[case] text: &str, #[case] expected: char) {
        assert_eq!(character(text, &CharacterRegistry::new()).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("$D800")]
    #[case("nosuchname")]
    fn invalid_characters(#[case] text: &str) {
        assert_eq!(character(text, &CharacterRegistry::new()).unwrap_err().code, ErrorCode::InvalidEscape);
    }
}
