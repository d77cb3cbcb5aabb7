//! Token-level normalisation of numbers, times and lexicon words for speech.
//!
//! Produces both the spoken string fed to the model and the resolved token
//! list shown in the preview UI.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{
    lexicon::Lexicon,
    numerals::{is_all_digits, read_decimal, read_integer, NumeralError},
    preprocess::replace_dates,
    tokenize::Tokenizer,
};

/// `H:MM` / `H.MM`; hours up to 29 are accepted by the pattern.
static RE_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-2]?[0-9])[:.]([0-5][0-9])$").unwrap());
static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").unwrap());

/// Unit abbreviations already implied by a time reading.
const DROPPED_UNITS: [&str; 2] = ["น.", "น"];

/// Result of [`normalize_text`].
///
/// Serialises as `{"normalized": text, "tokens": [...]}`, the preview payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Normalized {
    /// Surviving tokens joined by a single space.
    #[serde(rename = "normalized")]
    pub text: String,
    /// Resolved tokens, in order.
    pub tokens: Vec<String>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Spoken form of a time token: `{hour}นาฬิกา[{minute}นาที]`.
pub fn read_time(token: &str) -> Option<Result<String, NumeralError>> {
    let caps = RE_TIME.captures(token)?;
    Some(time_reading(&caps[1], &caps[2]))
}

fn time_reading(hour: &str, minute: &str) -> Result<String, NumeralError> {
    let mut out = format!("{}นาฬิกา", read_integer(hour)?);
    let minute = minute.trim_start_matches('0');
    if !minute.is_empty() {
        out.push_str(&read_integer(minute)?);
        out.push_str("นาที");
    }
    Ok(out)
}

/// Resolve one token. Returns `None` when no rule applies.
fn resolve_token(token: &str, lexicon: &Lexicon) -> Option<Result<String, NumeralError>> {
    if let Some(spoken) = lexicon.get(token) {
        return Some(Ok(spoken.to_string()));
    }
    if is_all_digits(token) {
        return Some(read_integer(token));
    }
    if let Some(reading) = read_time(token) {
        return Some(reading);
    }
    if RE_DECIMAL.is_match(token) {
        return Some(read_decimal(token));
    }
    None
}

/// Normalise `text` for speech.
///
/// Dates are expanded first, then every token is resolved in priority order:
/// lexicon entry, integer, time, decimal. A numeral that cannot be read keeps
/// its raw form. Whitespace tokens and the unit markers `น.` / `น` are dropped.
pub fn normalize_text(text: &str, tokenizer: &Tokenizer, lexicon: &Lexicon) -> Normalized {
    let expanded = replace_dates(text);

    let mut tokens = Vec::new();
    for token in tokenizer.tokenize(&expanded) {
        let value = match resolve_token(&token, lexicon) {
            Some(Ok(spoken)) => spoken,
            Some(Err(_)) | None => token,
        };
        let value = value.trim();
        if value.is_empty() || DROPPED_UNITS.contains(&value) {
            continue;
        }
        tokens.push(value.to_string());
    }

    Normalized { text: tokens.join(" "), tokens }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dictionary::Dictionary, lexicon::Vocabulary};

    fn setup(lexicon: Lexicon) -> (Tokenizer, Lexicon) {
        let vocab = Vocabulary::bundled().with_lexicon(&lexicon);
        (Tokenizer::new(Dictionary::from_vocabulary(&vocab).unwrap()), lexicon)
    }

    #[test]
    fn test_empty() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("   ", &t, &lex);
        assert!(out.is_empty());
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_integer() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("5", &t, &lex);
        assert_eq!(out.tokens, vec!["ห้า"]);
        assert_eq!(out.text, "ห้า");
    }

    #[test]
    fn test_time_with_minutes() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("5:30", &t, &lex);
        assert_eq!(out.tokens, vec!["ห้านาฬิกาสามสิบนาที"]);
    }

    #[test]
    fn test_time_on_the_hour() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("5:00", &t, &lex);
        assert_eq!(out.tokens, vec!["ห้านาฬิกา"]);
    }

    #[test]
    fn test_time_with_dot_and_unit_dropped() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("18.45 น.", &t, &lex);
        assert_eq!(out.tokens, vec!["สิบแปดนาฬิกาสี่สิบห้านาที"]);
    }

    #[test]
    fn test_time_minute_with_leading_zero() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("7:05", &t, &lex);
        assert_eq!(out.tokens, vec!["เจ็ดนาฬิกาห้านาที"]);
    }

    #[test]
    fn test_decimal() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("12.5", &t, &lex);
        assert_eq!(out.tokens, vec!["สิบสองจุดห้า"]);
    }

    #[test]
    fn test_lexicon_wins_over_numerals() {
        let mut lex = Lexicon::new();
        lex.insert("BTS", "บีทีเอส");
        lex.insert("7", "เซเว่น");
        let (t, lex) = setup(lex);
        let out = normalize_text("BTS 7", &t, &lex);
        assert_eq!(out.tokens, vec!["บีทีเอส", "เซเว่น"]);
        assert_eq!(out.text, "บีทีเอส เซเว่น");
    }

    #[test]
    fn test_overflow_keeps_raw() {
        let (t, lex) = setup(Lexicon::new());
        let huge = "9".repeat(40);
        let out = normalize_text(&huge, &t, &lex);
        assert_eq!(out.tokens, vec![huge]);
    }

    #[test]
    fn test_date_preview() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("18/12/2567", &t, &lex);
        assert_eq!(out.tokens, vec!["สิบแปด", "ธันวาคม", "สองพันห้าร้อยหกสิบเจ็ด"]);
    }

    #[test]
    fn test_grouped_number_unchanged() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("1,000", &t, &lex);
        assert_eq!(out.tokens, vec!["1,000"]);
    }

    #[test]
    fn test_serialized_shape() {
        let (t, lex) = setup(Lexicon::new());
        let value = serde_json::to_value(normalize_text("5", &t, &lex)).unwrap();
        assert_eq!(value, serde_json::json!({ "normalized": "ห้า", "tokens": ["ห้า"] }), "got: {}", value);
    }

    #[test]
    fn test_deterministic() {
        let (t, lex) = setup(Lexicon::new());
        let text = "รถไฟฟ้า สถานี 5 เวลา 10.30 น. วันที่ 1/1/2568";
        assert_eq!(normalize_text(text, &t, &lex), normalize_text(text, &t, &lex));
    }

    #[test]
    fn test_thai_digits() {
        let (t, lex) = setup(Lexicon::new());
        let out = normalize_text("๒๕", &t, &lex);
        assert_eq!(out.tokens, vec!["ยี่สิบห้า"]);
    }
}
