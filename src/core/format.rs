//! Pure field formatters for the DANFE display conventions.
//!
//! None of these functions fail: invalid input always falls back to a safe
//! default string.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Format a monetary value in the Brazilian convention.
///
/// `"1234.5"` becomes `"1.234,50"` — always exactly two decimal places,
/// dot thousands separator, comma decimal separator. Empty or unparseable
/// input yields `"0,00"`.
pub fn format_currency(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "0,00".to_string();
    }
    match Decimal::from_str(trimmed) {
        Ok(d) => brazilian_decimal(d),
        Err(_) => "0,00".to_string(),
    }
}

/// Format a quantity: integral values render without a decimal point,
/// fractional values render like [`format_currency`].
///
/// Unparseable non-empty input is returned unchanged, unlike
/// [`format_currency`]'s fixed fallback.
pub fn format_quantity(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "0,00".to_string();
    }
    match Decimal::from_str(trimmed) {
        Ok(d) if d.fract().is_zero() => d.normalize().to_string(),
        Ok(d) => brazilian_decimal(d),
        Err(_) => raw.to_string(),
    }
}

/// Mask a CNPJ or CPF.
///
/// 14 digits → `NN.NNN.NNN/NNNN-NN`, 11 digits → `NNN.NNN.NNN-NN`; any
/// other length is returned digit-only, unmasked.
pub fn format_document(raw: &str) -> String {
    let d = digits(raw);
    match d.len() {
        14 => format!(
            "{}.{}.{}/{}-{}",
            &d[..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..]
        ),
        11 => format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..]),
        _ => d,
    }
}

/// Mask a CEP: exactly 8 digits → `NNNNN-NNN`, otherwise digit-only.
pub fn format_postal_code(raw: &str) -> String {
    let d = digits(raw);
    if d.len() == 8 {
        format!("{}-{}", &d[..5], &d[5..])
    } else {
        d
    }
}

/// Mask a phone number: 10 digits → `(NN) NNNN-NNNN`, 11 digits →
/// `(NN) NNNNN-NNNN`, otherwise digit-only.
pub fn format_phone(raw: &str) -> String {
    let d = digits(raw);
    match d.len() {
        10 => format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..]),
        11 => format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..]),
        _ => d,
    }
}

/// Group an access key for display: a space every 4 characters.
pub fn format_access_key(key: &str) -> String {
    key.as_bytes()
        .chunks(4)
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Render a decimal with exactly two decimal places, dot thousands
/// separator and comma decimal separator.
fn brazilian_decimal(d: Decimal) -> String {
    let s = format!("{:.2}", d.round_dp(2));
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let (sign, int_digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut grouped = String::with_capacity(int_digits.len() + int_digits.len() / 3);
    for (i, c) in int_digits.chars().enumerate() {
        if i > 0 && (int_digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped},{frac_part}")
}
