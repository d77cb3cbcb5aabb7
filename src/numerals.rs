//! Thai number reading.
//!
//! Integers are read with the usual Thai place words (สิบ ร้อย พัน หมื่น แสน)
//! grouped by ล้าน; decimals read the fractional digits one by one after จุด.
//! Every reader returns a [`Result`] so callers decide whether to fall back to
//! the raw numeral.

use thiserror::Error;

const DIGITS: [&str; 10] = [
    "ศูนย์", "หนึ่ง", "สอง", "สาม", "สี่", "ห้า", "หก", "เจ็ด", "แปด", "เก้า",
];
const PLACES: [&str; 6] = ["", "สิบ", "ร้อย", "พัน", "หมื่น", "แสน"];
const MILLION: &str = "ล้าน";
const POINT: &str = "จุด";

/// Why a numeral could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumeralError {
    #[error("empty numeral")]
    Empty,
    #[error("not a numeral: {0:?}")]
    Invalid(String),
    #[error("numeral out of range: {0}")]
    OutOfRange(String),
}

/// Map an ASCII or Thai digit (๐–๙) to its value.
pub fn digit_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        '\u{0E50}'..='\u{0E59}' => Some(c as u32 - 0x0E50),
        _ => None,
    }
}

/// `true` for a non-empty string made only of ASCII or Thai digits.
pub fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| digit_value(c).is_some())
}

/// Replace Thai digits with their ASCII equivalents, leaving other chars alone.
pub fn to_ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0E50}'..='\u{0E59}' => char::from(b'0' + (c as u32 - 0x0E50) as u8),
            _ => c,
        })
        .collect()
}

/// Parse a digit string (ASCII or Thai) into a `u64`.
pub fn parse_digits(s: &str) -> Result<u64, NumeralError> {
    if s.is_empty() {
        return Err(NumeralError::Empty);
    }
    let mut value: u64 = 0;
    for c in s.chars() {
        let d = digit_value(c).ok_or_else(|| NumeralError::Invalid(s.to_string()))?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(d)))
            .ok_or_else(|| NumeralError::OutOfRange(s.to_string()))?;
    }
    Ok(value)
}

/// Read `n < 1_000_000`. `has_higher` marks that a larger group precedes it,
/// which turns a trailing one into เอ็ด.
fn below_million(n: u64, has_higher: bool) -> String {
    let mut out = String::new();
    let mut divisor = 100_000;
    for place in (0..PLACES.len()).rev() {
        let digit = ((n / divisor) % 10) as usize;
        divisor /= 10;
        if digit == 0 {
            continue;
        }
        match place {
            1 => match digit {
                1 => out.push_str("สิบ"),
                2 => out.push_str("ยี่สิบ"),
                _ => {
                    out.push_str(DIGITS[digit]);
                    out.push_str("สิบ");
                }
            },
            0 if digit == 1 && (n >= 10 || has_higher) => out.push_str("เอ็ด"),
            0 => out.push_str(DIGITS[digit]),
            _ => {
                out.push_str(DIGITS[digit]);
                out.push_str(PLACES[place]);
            }
        }
    }
    out
}

fn positive_to_words(n: u64, has_higher: bool) -> String {
    if n < 1_000_000 {
        return below_million(n, has_higher);
    }
    let high = n / 1_000_000;
    let low = n % 1_000_000;
    let mut out = positive_to_words(high, has_higher);
    out.push_str(MILLION);
    if low > 0 {
        out.push_str(&below_million(low, true));
    }
    out
}

/// Read a non-negative integer in Thai words.
pub fn integer_to_words(n: u64) -> String {
    if n == 0 {
        return DIGITS[0].to_string();
    }
    positive_to_words(n, false)
}

/// Read an integer numeral string (ASCII or Thai digits).
pub fn read_integer(s: &str) -> Result<String, NumeralError> {
    parse_digits(s).map(integer_to_words)
}

/// Read a numeral with an optional fractional part, e.g. `"12.05"` →
/// สิบสองจุดศูนย์ห้า. Signs are not numerals.
pub fn read_decimal(s: &str) -> Result<String, NumeralError> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };

    let mut out = read_integer(int_part)?;

    if let Some(frac) = frac_part {
        if !is_all_digits(frac) {
            return Err(NumeralError::Invalid(s.to_string()));
        }
        out.push_str(POINT);
        for c in frac.chars() {
            // is_all_digits guarantees a value
            let d = digit_value(c).unwrap_or(0) as usize;
            out.push_str(DIGITS[d]);
        }
    }
    Ok(out)
}
