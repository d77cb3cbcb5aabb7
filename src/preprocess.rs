//! Pattern rewriting ahead of segmentation.
//!
//! Dates are expanded to their spoken Thai form, and whitespace that binds a
//! number to neighbouring Thai text is protected so the planner's whitespace
//! split cannot tear the pair apart.
//!
//! The output is a sequence of [`Span`]s rather than a string with sentinel
//! characters: a [`Span::Protected`] group can only ever be rendered with
//! plain spaces, so nothing internal can leak into model input.

use fancy_regex::Regex as FancyRegex;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::numerals::{parse_digits, to_ascii_digits};

// ─────────────────────────────────────────────────────────────────────────────
// Span IR
// ─────────────────────────────────────────────────────────────────────────────

/// One piece of rewritten text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// Ordinary text; whitespace inside it may be split on.
    Plain(String),
    /// Words that must stay in the same segment, rendered joined by spaces.
    Protected(Vec<String>),
    /// Hard segment boundary.
    Break,
}

impl Span {
    fn plain(text: &str) -> Self {
        Span::Plain(text.to_string())
    }
}

/// Render spans back to text: protected words joined by a space, breaks as `\n`.
pub fn render(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Plain(text) => out.push_str(text),
            Span::Protected(words) => out.push_str(&words.join(" ")),
            Span::Break => out.push('\n'),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Dates
// ─────────────────────────────────────────────────────────────────────────────

static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").unwrap());

/// Month name for a padded or unpadded month numeral (`"1"`, `"01"` …).
pub fn thai_month(month: &str) -> Option<&'static str> {
    let name = match month {
        "1" | "01" => "มกราคม",
        "2" | "02" => "กุมภาพันธ์",
        "3" | "03" => "มีนาคม",
        "4" | "04" => "เมษายน",
        "5" | "05" => "พฤษภาคม",
        "6" | "06" => "มิถุนายน",
        "7" | "07" => "กรกฎาคม",
        "8" | "08" => "สิงหาคม",
        "9" | "09" => "กันยายน",
        "10" => "ตุลาคม",
        "11" => "พฤศจิกายน",
        "12" => "ธันวาคม",
        _ => return None,
    };
    Some(name)
}

fn date_words(caps: &Captures) -> Vec<String> {
    let day = parse_digits(&caps[1])
        .map(|d| d.to_string())
        .unwrap_or_else(|_| caps[1].to_string());
    let month_raw = &caps[2];
    let month = thai_month(&to_ascii_digits(month_raw))
        .map(str::to_string)
        .unwrap_or_else(|| month_raw.to_string());
    vec![day, month, caps[3].to_string()]
}

/// Rewrite every `D/M/YYYY` or `D-M-YYYY` date into a protected
/// `[day, month-name, year]` group followed by a hard break.
pub fn rewrite_dates(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in RE_DATE.captures_iter(text) {
        // group 0 always participates
        let Some(m) = caps.get(0) else { continue };
        if m.start() > last {
            spans.push(Span::plain(&text[last..m.start()]));
        }
        spans.push(Span::Protected(date_words(&caps)));
        spans.push(Span::Break);
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::plain(&text[last..]));
    }
    spans
}

/// String form of [`rewrite_dates`], e.g. `"18/12/2567"` → `"18 ธันวาคม 2567\n"`.
pub fn replace_dates(text: &str) -> String {
    render(&rewrite_dates(text))
}

// ─────────────────────────────────────────────────────────────────────────────
// Numeral / Thai adjacency
// ─────────────────────────────────────────────────────────────────────────────

/// Whitespace between Thai script and a digit, in either order.
static RE_THAI_DIGIT_GAP: Lazy<FancyRegex> = Lazy::new(|| {
    FancyRegex::new(r"(?<=[ก-๙])\s+(?=\d)|(?<=\d)\s+(?=[ก-๙])").unwrap()
});

/// Byte ranges of protected whitespace runs in `text`.
fn protected_gaps(text: &str) -> Vec<(usize, usize)> {
    RE_THAI_DIGIT_GAP
        .find_iter(text)
        .filter_map(|m| m.ok())
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Turn Thai/digit pairs separated only by whitespace into protected groups,
/// e.g. `"ช่อง 3 HD"` → `[Protected(["ช่อง", "3"]), Plain(" HD")]`.
///
/// Protected and break spans pass through untouched; their edges never bind to
/// neighbouring plain text.
pub fn protect_adjacency(spans: Vec<Span>) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Plain(text) => protect_plain(&text, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn protect_plain(text: &str, out: &mut Vec<Span>) {
    let gaps = protected_gaps(text);
    if gaps.is_empty() {
        out.push(Span::Plain(text.to_string()));
        return;
    }

    // Walk the protected gaps; each chain of words joined by gaps becomes one group.
    let mut cursor = 0;
    let mut i = 0;
    while i < gaps.len() {
        let (gap_start, _) = gaps[i];
        let left_start = text[..gap_start]
            .rfind(char::is_whitespace)
            .map(|p| p + text[p..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0)
            .max(cursor);
        if left_start > cursor {
            out.push(Span::plain(&text[cursor..left_start]));
        }

        let mut words = vec![text[left_start..gap_start].to_string()];
        let mut end;
        loop {
            let (_, gap_end) = gaps[i];
            end = text[gap_end..]
                .find(char::is_whitespace)
                .map(|p| gap_end + p)
                .unwrap_or(text.len());
            words.push(text[gap_end..end].to_string());
            i += 1;
            if i < gaps.len() && gaps[i].0 == end {
                continue;
            }
            break;
        }
        out.push(Span::Protected(words));
        cursor = end;
    }
    if cursor < text.len() {
        out.push(Span::plain(&text[cursor..]));
    }
}
