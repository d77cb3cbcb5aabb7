//! Custom lexicon and base vocabulary loading.
//!
//! The lexicon maps a surface word to the text that should be spoken in its
//! place (station names, abbreviations, brand names …).  It is read from either
//! a JSON object file or a two-column delimited file.  The base vocabulary is a
//! plain word list; together they form the segmentation dictionary.

use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};

use csv_core::{ReadFieldResult, Reader, ReaderBuilder};
use tracing::debug;

use crate::error::{Error, Result};

/// Word list compiled into the crate, used when no vocabulary file is configured.
const BUNDLED_WORDS: &str = include_str!("../data/thai_words.txt");

// ─────────────────────────────────────────────────────────────────────────────
// Lexicon
// ─────────────────────────────────────────────────────────────────────────────

/// Surface word → spoken replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    entries: HashMap<String, String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn insert(&mut self, word: impl Into<String>, spoken: impl Into<String>) {
        self.entries.insert(word.into(), spoken.into());
    }
}

impl FromIterator<(String, String)> for Lexicon {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Load a lexicon file.
///
/// * missing file → empty lexicon
/// * `*.json` → object of string → string
/// * anything else → delimited rows `surface,replacement[,…]` (`*.tsv` uses tabs)
///
/// A file that exists but cannot be parsed is an error.
pub fn load_lexicon(path: &Path) -> Result<Lexicon> {
    if !path.exists() {
        debug!(path = %path.display(), "lexicon file not found, using empty lexicon");
        return Ok(Lexicon::new());
    }

    let bytes = fs::read(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => parse_json_lexicon(&bytes).map_err(|message| lexicon_error(path, message)),
        "tsv" => parse_delimited_lexicon(&bytes, b'\t').map_err(|message| lexicon_error(path, message)),
        _ => parse_delimited_lexicon(&bytes, b',').map_err(|message| lexicon_error(path, message)),
    }
}

fn lexicon_error(path: &Path, message: String) -> Error {
    Error::Lexicon { path: path.to_path_buf(), message }
}

fn parse_json_lexicon(bytes: &[u8]) -> std::result::Result<Lexicon, String> {
    let entries: HashMap<String, String> =
        serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    Ok(entries
        .into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect())
}

fn parse_delimited_lexicon(bytes: &[u8], delimiter: u8) -> std::result::Result<Lexicon, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

    let mut lexicon = Lexicon::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_row(line, delimiter)
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
        if fields.len() < 2 {
            continue;
        }
        let surface = fields[0].trim();
        if surface.is_empty() {
            continue;
        }
        lexicon.insert(surface, fields[1].trim());
    }
    Ok(lexicon)
}

/// Split one delimited row into fields, honouring double-quoted cells.
fn parse_row(row: &str, delimiter: u8) -> std::result::Result<Vec<String>, String> {
    let mut rdr: Reader = ReaderBuilder::new().delimiter(delimiter).build();
    let mut fields = Vec::new();
    let mut bytes = row.as_bytes();
    let mut field = Vec::new();
    let mut output = [0u8; 1024];
    loop {
        let (result, nin, nout) = rdr.read_field(bytes, &mut output);
        field.extend_from_slice(&output[..nout]);
        bytes = &bytes[nin..];
        match result {
            ReadFieldResult::OutputFull => continue,
            ReadFieldResult::InputEmpty if !bytes.is_empty() => continue,
            ReadFieldResult::Field { record_end } => {
                fields.push(take_field(&mut field)?);
                if record_end {
                    break;
                }
            }
            ReadFieldResult::InputEmpty => {
                // Flush the final field: csv-core needs an empty read to finish it.
                let (result, _, nout) = rdr.read_field(&[], &mut output);
                field.extend_from_slice(&output[..nout]);
                if let ReadFieldResult::Field { .. } = result {
                    fields.push(take_field(&mut field)?);
                }
                break;
            }
            ReadFieldResult::End => break,
        }
    }
    Ok(fields)
}

fn take_field(field: &mut Vec<u8>) -> std::result::Result<String, String> {
    let bytes = std::mem::take(field);
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Base vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// Set of known words fed to the segmentation dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: BTreeSet<String>,
}

impl Vocabulary {
    /// The word list shipped with the crate.
    pub fn bundled() -> Self {
        Self::from_word_list(BUNDLED_WORDS)
    }

    /// Parse a one-word-per-line list; blank lines and `#` comments are skipped.
    pub fn from_word_list(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|w| !w.is_empty() && !w.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Union with the lexicon keys, so custom words segment as whole units.
    pub fn with_lexicon(mut self, lexicon: &Lexicon) -> Self {
        self.words.extend(lexicon.keys().map(str::to_string));
        self
    }
}

impl FromIterator<String> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self { words: iter.into_iter().collect() }
    }
}

/// Load a vocabulary word list. Unlike the lexicon, a configured vocabulary
/// file must exist.
pub fn load_vocabulary(path: &Path) -> Result<Vocabulary> {
    let text = fs::read_to_string(path).map_err(|e| Error::Vocabulary {
        path: PathBuf::from(path),
        message: e.to_string(),
    })?;
    Ok(Vocabulary::from_word_list(&text))
}
