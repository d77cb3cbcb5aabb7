//! Text front end owning the active lexicon and segmentation dictionary.
//!
//! A [`FrontEnd`] is built once from a [`FrontEndConfig`] and shared by every
//! request. [`FrontEnd::reload`] builds a fresh dictionary completely before
//! swapping it in, so readers always see either the old or the new state and
//! a failed reload leaves the old one active.
//!
//! The free functions at the bottom of this module use a process-wide default
//! instance, initialised from the environment on first use. A failed first
//! load is not cached: the `try_*` functions report it and the next call
//! tries again.

use std::{path::PathBuf, sync::Arc};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{error, info};

use crate::{
    dictionary::Dictionary,
    error::Result,
    lexicon::{load_lexicon, load_vocabulary, Lexicon, Vocabulary},
    normalize::{self, Normalized},
    segment,
    tokenize::Tokenizer,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Where the lexicon and base vocabulary come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontEndConfig {
    /// JSON or delimited lexicon file. `None` or a missing file means no custom words.
    pub lexicon_path: Option<PathBuf>,
    /// One-word-per-line vocabulary. `None` uses the bundled word list.
    pub vocabulary_path: Option<PathBuf>,
}

impl FrontEndConfig {
    /// Read `LEXICON_PATH` and `VOCABULARY_PATH`. Without `LEXICON_PATH` the
    /// lexicon defaults to `$DATA_DIR/stations_600.json` (`DATA_DIR` defaults
    /// to `./data`).
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let lexicon_path = std::env::var_os("LEXICON_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("stations_600.json"));
        let vocabulary_path = std::env::var_os("VOCABULARY_PATH").map(PathBuf::from);
        Self { lexicon_path: Some(lexicon_path), vocabulary_path }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dictionary state
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable snapshot: lexicon plus the tokenizer built from it.
#[derive(Debug)]
pub struct FrontEndState {
    lexicon: Lexicon,
    tokenizer: Tokenizer,
}

impl FrontEndState {
    /// Merge `vocabulary` with the lexicon keys and build the dictionary.
    pub fn build(lexicon: Lexicon, vocabulary: Vocabulary) -> Result<Self> {
        let vocabulary = vocabulary.with_lexicon(&lexicon);
        let tokenizer = Tokenizer::new(Dictionary::from_vocabulary(&vocabulary)?);
        Ok(Self { lexicon, tokenizer })
    }

    /// Load both files named by `config`.
    pub fn load(config: &FrontEndConfig) -> Result<Self> {
        let lexicon = match &config.lexicon_path {
            Some(path) => load_lexicon(path)?,
            None => Lexicon::new(),
        };
        let vocabulary = match &config.vocabulary_path {
            Some(path) => load_vocabulary(path)?,
            None => Vocabulary::bundled(),
        };
        Self::build(lexicon, vocabulary)
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FrontEnd
// ─────────────────────────────────────────────────────────────────────────────

/// Shared text front end.
#[derive(Debug)]
pub struct FrontEnd {
    config: FrontEndConfig,
    state: RwLock<Arc<FrontEndState>>,
}

impl FrontEnd {
    /// Load the lexicon and vocabulary named by `config`.
    ///
    /// A malformed lexicon is an error; a missing one is not.
    pub fn load(config: FrontEndConfig) -> Result<Self> {
        let state = FrontEndState::load(&config)?;
        info!(
            entries = state.lexicon.len(),
            words = state.tokenizer.dictionary().len(),
            "Loaded dictionary"
        );
        Ok(Self { config, state: RwLock::new(Arc::new(state)) })
    }

    /// Wrap an already built state.
    pub fn from_state(config: FrontEndConfig, state: FrontEndState) -> Self {
        Self { config, state: RwLock::new(Arc::new(state)) }
    }

    /// Bundled vocabulary only, no custom lexicon.
    pub fn bundled() -> Result<Self> {
        let state = FrontEndState::build(Lexicon::new(), Vocabulary::bundled())?;
        Ok(Self::from_state(FrontEndConfig::default(), state))
    }

    pub fn config(&self) -> &FrontEndConfig {
        &self.config
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn state(&self) -> Arc<FrontEndState> {
        self.state.read().clone()
    }

    /// Number of custom lexicon entries currently active.
    pub fn lexicon_len(&self) -> usize {
        self.state().lexicon.len()
    }

    /// Re-read the configured files and swap the new dictionary in.
    ///
    /// On error the active dictionary is left untouched. Returns the number of
    /// lexicon entries loaded.
    pub fn reload(&self) -> Result<usize> {
        let state = FrontEndState::load(&self.config)?;
        let entries = state.lexicon.len();
        *self.state.write() = Arc::new(state);
        info!(entries, "Reloaded dictionary");
        Ok(entries)
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.state().tokenizer.tokenize(text)
    }

    pub fn normalize(&self, text: &str) -> Normalized {
        let state = self.state();
        normalize::normalize_text(text, &state.tokenizer, &state.lexicon)
    }

    pub fn intelligent_split(&self, text: &str) -> Vec<String> {
        segment::intelligent_split(text, &self.state().tokenizer)
    }

    pub fn split_long_sentence(&self, text: &str, max_length: usize) -> Vec<String> {
        segment::split_long_sentence(text, max_length, &self.state().tokenizer)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide default
// ─────────────────────────────────────────────────────────────────────────────

static DEFAULT: OnceCell<FrontEnd> = OnceCell::new();
static BUNDLED: OnceCell<FrontEnd> = OnceCell::new();

/// Initialise `cell` from `config` unless it already holds a front end.
/// Nothing is stored when loading fails.
fn load_once(cell: &OnceCell<FrontEnd>, config: impl FnOnce() -> FrontEndConfig) -> Result<&FrontEnd> {
    cell.get_or_try_init(|| FrontEnd::load(config()))
}

/// The process-wide front end, initialised from the environment on first use.
pub fn try_default_front_end() -> Result<&'static FrontEnd> {
    load_once(&DEFAULT, FrontEndConfig::from_env)
}

/// Default front end, or the bundled vocabulary for this call when the
/// configured files cannot be loaded.
fn default_or_bundled() -> Option<&'static FrontEnd> {
    match try_default_front_end() {
        Ok(front_end) => Some(front_end),
        Err(e) => {
            error!("Cannot load dictionary ({}); using bundled vocabulary", e);
            BUNDLED
                .get_or_try_init(FrontEnd::bundled)
                .map_err(|e| error!("Cannot build bundled dictionary: {}", e))
                .ok()
        }
    }
}

/// (Re)load the process-wide dictionary from the environment configuration.
///
/// Returns the number of lexicon entries loaded.
pub fn setup_tokenizer() -> Result<usize> {
    match DEFAULT.get() {
        Some(front_end) => front_end.reload(),
        None => try_default_front_end().map(FrontEnd::lexicon_len),
    }
}

pub fn try_normalize_text(text: &str) -> Result<Normalized> {
    try_default_front_end().map(|fe| fe.normalize(text))
}

pub fn try_intelligent_split(text: &str) -> Result<Vec<String>> {
    try_default_front_end().map(|fe| fe.intelligent_split(text))
}

pub fn try_split_long_sentence(text: &str, max_length: usize) -> Result<Vec<String>> {
    try_default_front_end().map(|fe| fe.split_long_sentence(text, max_length))
}

/// Normalise with the process-wide dictionary.
///
/// A load error is logged and the bundled vocabulary is used; the next call
/// retries the configured files.
pub fn normalize_text(text: &str) -> Normalized {
    default_or_bundled().map(|fe| fe.normalize(text)).unwrap_or_default()
}

/// Segment with the process-wide dictionary. Falls back like [`normalize_text`].
pub fn intelligent_split(text: &str) -> Vec<String> {
    default_or_bundled()
        .map(|fe| fe.intelligent_split(text))
        .unwrap_or_default()
}

/// Repack with the process-wide dictionary. Falls back like [`normalize_text`].
pub fn split_long_sentence(text: &str, max_length: usize) -> Vec<String> {
    default_or_bundled()
        .map(|fe| fe.split_long_sentence(text, max_length))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn write_lexicon(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn config(path: PathBuf) -> FrontEndConfig {
        FrontEndConfig { lexicon_path: Some(path), vocabulary_path: None }
    }

    #[test]
    fn test_bundled_front_end() {
        let fe = FrontEnd::bundled().unwrap();
        assert_eq!(fe.lexicon_len(), 0);
        assert_eq!(fe.normalize("5").tokens, vec!["ห้า"]);
        assert_eq!(fe.intelligent_split("สวัสดี ครับ"), vec!["สวัสดี", "ครับ"]);
    }

    #[test]
    fn test_load_with_lexicon() {
        let dir = tempdir().unwrap();
        let path = write_lexicon(dir.path(), "load.json", r#"{"ARL": "แอร์พอร์ตลิงก์"}"#);
        let fe = FrontEnd::load(config(path)).unwrap();
        assert_eq!(fe.lexicon_len(), 1);
        assert_eq!(fe.normalize("ARL").tokens, vec!["แอร์พอร์ตลิงก์"]);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let dir = tempdir().unwrap();
        let path = write_lexicon(dir.path(), "reload.json", r#"{"ก1": "กอหนึ่ง"}"#);
        let fe = FrontEnd::load(config(path.clone())).unwrap();
        assert_eq!(fe.lexicon_len(), 1);

        fs::write(&path, r#"{"ก1": "กอหนึ่ง", "ข2": "ขอสอง"}"#).unwrap();
        assert_eq!(fe.reload().unwrap(), 2);
        assert_eq!(fe.normalize("ข2").tokens, vec!["ขอสอง"]);
    }

    #[test]
    fn test_failed_reload_keeps_old_state() {
        let dir = tempdir().unwrap();
        let path = write_lexicon(dir.path(), "reload.json", r#"{"MRT": "เอ็มอาร์ที"}"#);
        let fe = FrontEnd::load(config(path.clone())).unwrap();
        let before = fe.state();

        fs::write(&path, "{ not json").unwrap();
        assert!(fe.reload().is_err());
        assert!(Arc::ptr_eq(&before, &fe.state()));
        assert_eq!(fe.normalize("MRT").tokens, vec!["เอ็มอาร์ที"]);
    }

    #[test]
    fn test_malformed_lexicon_fails_load() {
        let dir = tempdir().unwrap();
        let path = write_lexicon(dir.path(), "broken.json", "[1, 2");
        let result = FrontEnd::load(config(path));
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = tempdir().unwrap();
        let path = write_lexicon(dir.path(), "swap.json", "{}");
        let fe = FrontEnd::load(config(path.clone())).unwrap();
        let old = fe.state();

        fs::write(&path, r#"{"X": "เอ็กซ์"}"#).unwrap();
        fe.reload().unwrap();
        assert_eq!(old.lexicon().len(), 0);
        assert_eq!(fe.normalize("X").tokens, vec!["เอ็กซ์"]);
    }

    #[test]
    fn test_failed_first_load_is_not_cached() {
        let dir = tempdir().unwrap();
        let path = write_lexicon(dir.path(), "stations.json", r#"{"BTS": "บีทีเอส""#);
        let cell = OnceCell::new();

        let err = load_once(&cell, || config(path.clone()));
        assert!(err.is_err());
        assert!(cell.get().is_none());
        let err = load_once(&cell, || config(path.clone()));
        assert!(err.is_err());

        fs::write(&path, r#"{"BTS": "บีทีเอส"}"#).unwrap();
        let fe = load_once(&cell, || config(path.clone())).unwrap();
        let tokens = fe.normalize("BTS").tokens;
        assert_eq!(tokens, vec!["บีทีเอส"], "got: {:?}", tokens);
        assert!(cell.get().is_some());
    }

    #[test]
    fn test_loaded_cell_ignores_later_config() {
        let dir = tempdir().unwrap();
        let good = write_lexicon(dir.path(), "good.json", r#"{"ARL": "แอร์พอร์ตลิงก์"}"#);
        let bad = write_lexicon(dir.path(), "bad.json", "[");
        let cell = OnceCell::new();

        load_once(&cell, || config(good)).unwrap();
        let fe = load_once(&cell, || config(bad)).unwrap();
        assert_eq!(fe.lexicon_len(), 1);
    }

    #[test]
    fn test_default_front_end_is_usable() {
        // initialised lazily; no lexicon file is present in the test environment
        let out = normalize_text("5:00");
        assert_eq!(out.tokens, vec!["ห้านาฬิกา"]);
        assert!(intelligent_split("").is_empty());
        assert!(normalize_text("   ").is_empty());
        assert_eq!(try_normalize_text("5").unwrap().tokens, vec!["ห้า"]);
        assert!(try_intelligent_split("").unwrap().is_empty());
    }
}
