//! Resolved analysis of a surface word.
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::phonology;
use crate::types::Provenance;

/// One stripped suffix and its grammatical category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixPiece {
    /// the suffix morph as it appears on the surface
    pub text: SmolStr,
    /// the category the suffix was matched under
    pub category: SmolStr,
}

impl SuffixPiece {
    /// creates a suffix piece
    pub fn new(text: impl Into<SmolStr>, category: impl Into<SmolStr>) -> SuffixPiece {
        SuffixPiece {
            text: text.into(),
            category: category.into(),
        }
    }
}

/// A resolved segmentation: root, ordered suffix chain and the strategy
/// that produced it. Immutable once produced; this is also the payload
/// persisted in the analysis cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// the morphologically irreducible base form
    pub root: SmolStr,
    /// suffixes in surface order, innermost first
    pub suffixes: Vec<SuffixPiece>,
    /// the strategy that produced this analysis
    pub provenance: Provenance,
    /// whether the root matched through the softening alternation: the
    /// lexicon form is stored (kitap) while the surface carries the
    /// voiced alternant (kitabı)
    #[serde(default)]
    pub softened: bool,
}

impl AnalysisResult {
    /// creates an analysis result
    pub fn new(
        root: impl Into<SmolStr>,
        suffixes: Vec<SuffixPiece>,
        provenance: Provenance,
    ) -> AnalysisResult {
        AnalysisResult {
            root: root.into(),
            suffixes,
            provenance,
            softened: false,
        }
    }

    /// a bare result whose root is the word itself
    pub fn bare(word: impl Into<SmolStr>, provenance: Provenance) -> AnalysisResult {
        AnalysisResult::new(word, vec![], provenance)
    }

    /// gets the root
    pub fn root(&self) -> &str {
        &self.root
    }

    /// gets the suffix chain, innermost first
    pub fn suffixes(&self) -> &[SuffixPiece] {
        &self.suffixes
    }

    /// gets the provenance
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Reconstructs the surface word this analysis was derived from.
    ///
    /// For softened analyses the root is stored in its lexicon form
    /// (kitap) while the surface carries the voiced alternant (kitabı),
    /// so the alternation is re-applied before concatenation when the
    /// first suffix is vowel-initial.
    pub fn surface(&self) -> String {
        let needs_alternation = self.softened
            && self
                .suffixes
                .first()
                .map(|s| phonology::starts_with_vowel(&s.text))
                .unwrap_or(false);

        let root = if needs_alternation {
            phonology::soften(&self.root).unwrap_or_else(|| self.root.to_string())
        } else {
            self.root.to_string()
        };

        let mut out = root;
        for piece in &self.suffixes {
            out.push_str(&piece.text);
        }
        out
    }

    /// Round-trip invariant: root plus suffix chain reproduces `word`.
    pub fn reproduces(&self, word: &str) -> bool {
        self.surface() == word
    }
}
