//! Segmentation dictionary: a double-array trie over the known vocabulary.
//!
//! The tokenizer asks one question of it: which dictionary words start at a
//! given position? [`Dictionary::common_prefix_lengths`] answers with the
//! length (in chars) of every word that is a prefix of the input slice.

use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    lexicon::Vocabulary,
};

/// Trie over the union of base vocabulary and lexicon keys.
///
/// Built once; a reload builds a new one. An empty vocabulary gives a
/// dictionary that matches nothing.
#[derive(Clone, Default)]
pub struct Dictionary {
    da: Option<Arc<crawdad::Trie>>,
    len: usize,
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary").field("len", &self.len).finish()
    }
}

impl Dictionary {
    /// Build a dictionary from every non-empty word of `vocabulary`.
    pub fn from_vocabulary(vocabulary: &Vocabulary) -> Result<Self> {
        // Vocabulary iterates in sorted order without duplicates.
        let records: Vec<(&str, u32)> = vocabulary
            .iter()
            .filter(|word| !word.is_empty())
            .zip(0u32..)
            .collect();
        if records.is_empty() {
            return Ok(Self::default());
        }
        let len = records.len();
        let da = crawdad::Trie::from_records(records.iter().copied())
            .map_err(|e| Error::Dictionary(e.to_string()))?;
        Ok(Self { da: Some(Arc::new(da)), len })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.da
            .as_ref()
            .map_or(false, |da| da.exact_match(word.chars()).is_some())
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lengths (in chars, ascending) of all words that prefix `input`.
    pub fn common_prefix_lengths<'a>(&'a self, input: &'a [char]) -> impl Iterator<Item = usize> + 'a {
        self.da
            .iter()
            .flat_map(move |da| da.common_prefix_search(input.iter().cloned()))
            .map(|(_, end_char)| end_char)
    }
}
