//! # thaitts
//!
//! Thai text front end for speech synthesis: date and numeral normalisation,
//! dictionary-based word segmentation and length-bounded segment planning,
//! plus the audio stitching that turns per-segment engine output into one
//! waveform.
//!
//! ## Quick start
//!
//! ```no_run
//! // The process-wide front end reads LEXICON_PATH / VOCABULARY_PATH on first use.
//! // A malformed lexicon is logged and the bundled vocabulary used for the call;
//! // `thaitts::try_normalize_text` returns the load error instead.
//! let normalized = thaitts::normalize_text("รถไฟฟ้าออกเวลา 5:30 น.");
//! assert_eq!(normalized.tokens.last().unwrap(), "ห้านาฬิกาสามสิบนาที");
//!
//! for segment in thaitts::intelligent_split("ประชุมวันที่ 18/12/2567 ที่ห้องใหญ่") {
//!     println!("{}", segment);
//! }
//! ```
//!
//! An explicit [`FrontEnd`] can be built and shared instead of the default:
//!
//! ```no_run
//! use thaitts::{FrontEnd, FrontEndConfig};
//!
//! let front_end = FrontEnd::load(FrontEndConfig {
//!     lexicon_path: Some("data/stations_600.json".into()),
//!     vocabulary_path: None,
//! })?;
//! let tokens = front_end.tokenize("สถานีหมอชิต");
//! front_end.reload()?; // picks up lexicon edits; the old state stays on error
//! # Ok::<(), thaitts::Error>(())
//! ```
//!
//! ## Pipeline
//! 1. **Date rewriting**: `D/M/YYYY` → day, Thai month name, year.
//! 2. **Adjacency protection**: a number and its neighbouring Thai word stay together.
//! 3. **Segment planning**: split on lines and whitespace; chunks over 120 chars
//!    are repacked into ≤ 150-char pieces by dictionary tokens.
//! 4. **Normalisation**: lexicon words, integers, times and decimals → spoken Thai.
//! 5. **Synthesis**: each segment goes to a [`synth::SpeechEngine`]; clips are
//!    trimmed, faded and joined with short pauses.
//!
//! The `server` feature adds the axum HTTP API and the `thaitts-server` binary.

pub mod audio;
pub mod dictionary;
pub mod error;
pub mod frontend;
pub mod lexicon;
pub mod normalize;
pub mod numerals;
pub mod preprocess;
pub mod segment;
pub mod synth;
pub mod tokenize;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod results;
#[cfg(feature = "server")]
pub mod server;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use error::{Error, Result};
pub use frontend::{
    intelligent_split, normalize_text, setup_tokenizer, split_long_sentence, try_intelligent_split,
    try_normalize_text, try_split_long_sentence, FrontEnd, FrontEndConfig,
};
pub use normalize::Normalized;
pub use preprocess::replace_dates;

/// Audio sample rate of every waveform in the crate.
pub use audio::SAMPLE_RATE;
