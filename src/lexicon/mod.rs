//! In-memory projection of known roots and the suffix inventory.
//!
//! Each session owns its own copy, rebuilt from the analysis cache at
//! startup; the cache stays the source of truth, so cross-process
//! staleness of this projection is tolerated. All mutation goes through
//! [`Lexicon::add_root`] and [`Lexicon::add_suffix`], which write through
//! to the cache before updating the in-memory view.

use hashbrown::HashMap;
use itertools::Itertools;
use smol_str::SmolStr;

use crate::cache::{AnalysisCache, StorageError};
use crate::types::{PartOfSpeech, Provenance};

/// A suffix morph and the category it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suffix {
    /// the suffix morph
    pub text: SmolStr,
    /// its grammatical category
    pub category: SmolStr,
}

/// Read-through projection of roots and suffixes for one session.
#[derive(Debug, Default)]
pub struct Lexicon {
    roots: HashMap<SmolStr, PartOfSpeech>,
    // Sorted once: length descending, then text, then category. This is
    // the deterministic tie-break for equal-length candidates.
    suffixes: Vec<Suffix>,
}

impl Lexicon {
    /// Rebuilds the projection from the durable cache.
    pub fn from_cache(cache: &AnalysisCache) -> Result<Lexicon, StorageError> {
        let roots = cache.known_roots()?;
        let suffixes = cache
            .known_suffixes()?
            .into_iter()
            .map(|(text, category)| Suffix { text, category })
            .sorted_by(|a, b| {
                b.text
                    .chars()
                    .count()
                    .cmp(&a.text.chars().count())
                    .then_with(|| a.text.cmp(&b.text))
                    .then_with(|| a.category.cmp(&b.category))
            })
            .collect();

        log::debug!("lexicon loaded: {} roots", roots.len());

        Ok(Lexicon { roots, suffixes })
    }

    /// Whether `text` is a known root.
    #[inline(always)]
    pub fn is_known_root(&self, text: &str) -> bool {
        self.roots.contains_key(text)
    }

    /// The category of a known root, if any.
    #[inline(always)]
    pub fn category_of(&self, text: &str) -> Option<PartOfSpeech> {
        self.roots.get(text).copied()
    }

    /// Number of known roots.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether no roots are known yet.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every suffix in the inventory that `word` ends with, longest
    /// first, leaving at least one character of stem. Equal-length
    /// candidates come in lexicographic order by text, then category.
    pub fn candidate_suffixes_for(&self, word: &str) -> Vec<&Suffix> {
        let word_len = word.chars().count();
        self.suffixes
            .iter()
            .filter(|suffix| {
                word.ends_with(suffix.text.as_str()) && word_len > suffix.text.chars().count()
            })
            .collect()
    }

    /// Registers a root, writing through to the cache first. Returns the
    /// root's cache row id.
    pub fn add_root(
        &mut self,
        cache: &AnalysisCache,
        text: &str,
        category: PartOfSpeech,
        provenance: Provenance,
    ) -> Result<i64, StorageError> {
        let id = cache.upsert_root(text, category, provenance)?;
        // Keep the first category we learned for a root; occurrence
        // bookkeeping lives in the cache.
        self.roots.entry(SmolStr::new(text)).or_insert(category);
        Ok(id)
    }

    /// Registers a suffix, writing through to the cache first. The
    /// inventory keeps its sort order.
    pub fn add_suffix(
        &mut self,
        cache: &AnalysisCache,
        text: &str,
        category: &str,
    ) -> Result<(), StorageError> {
        cache.upsert_suffix(text, category)?;

        let suffix = Suffix {
            text: SmolStr::new(text),
            category: SmolStr::new(category),
        };
        if self.suffixes.contains(&suffix) {
            return Ok(());
        }

        let len = suffix.text.chars().count();
        let at = self
            .suffixes
            .partition_point(|s| {
                let other = s.text.chars().count();
                other > len
                    || (other == len
                        && (s.text.as_str(), s.category.as_str())
                            < (suffix.text.as_str(), suffix.category.as_str()))
            });
        self.suffixes.insert(at, suffix);
        Ok(())
    }
}
