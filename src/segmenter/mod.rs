//! Recursive suffix-stripping segmenter.
//!
//! Greedy longest-suffix-first matching covers the common case without
//! backtracking; a bounded recursive pass handles suffix stacks
//! (evlerimizde → ev + ler + imiz + de), since a single pass strips only
//! one suffix. Depth is capped before descending, so the recursion can
//! never run away.

use smol_str::SmolStr;

use crate::lexicon::Lexicon;
use crate::phonology;
use crate::types::Provenance;

use self::analysis::{AnalysisResult, SuffixPiece};

pub mod analysis;

/// Tunables for the segmentation algorithm.
#[derive(Clone, Copy, Debug)]
pub struct SegmenterConfig {
    /// Recursion ceiling for the multi-suffix pass.
    pub max_depth: u8,
    /// Validate candidate roots against major vowel harmony.
    pub vowel_harmony: bool,
    /// Try the consonant-softening alternation on candidate roots.
    pub consonant_softening: bool,
}

impl SegmenterConfig {
    /// The reference configuration: depth 5, both validators on.
    pub const fn default() -> SegmenterConfig {
        SegmenterConfig {
            max_depth: 5,
            vowel_harmony: true,
            consonant_softening: true,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> SegmenterConfig {
        SegmenterConfig::default()
    }
}

/// Rule-based splitter over the suffix inventory of a [`Lexicon`].
#[derive(Clone, Copy, Debug)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    /// creates a segmenter with the given tunables
    pub fn new(config: SegmenterConfig) -> Segmenter {
        Segmenter { config }
    }

    /// Best-effort segmentation of `word`. Returns `None` when no valid
    /// split exists; the resolution policy decides what happens then.
    /// Hitting the depth ceiling is not a failure: the remainder comes
    /// back as its own root with [`Provenance::DepthExceeded`].
    pub fn segment(&self, lexicon: &Lexicon, word: &str) -> Option<AnalysisResult> {
        self.segment_at(lexicon, word, 0)
    }

    fn segment_at(&self, lexicon: &Lexicon, word: &str, depth: u8) -> Option<AnalysisResult> {
        if depth >= self.config.max_depth {
            log::debug!("depth ceiling ({}) reached at '{}'", self.config.max_depth, word);
            return Some(AnalysisResult::bare(word, Provenance::DepthExceeded));
        }

        if lexicon.is_known_root(word) {
            return Some(AnalysisResult::bare(word, Provenance::Lexicon));
        }

        let candidates = lexicon.candidate_suffixes_for(word);

        // Known-root pass: the literal stripped form first, then the
        // softening alternation, per suffix. Matches against established
        // knowledge win over any fresh inference.
        for suffix in &candidates {
            let stripped = strip_suffix(word, &suffix.text);

            if lexicon.is_known_root(stripped) {
                return Some(AnalysisResult::new(
                    stripped,
                    vec![SuffixPiece::new(
                        suffix.text.clone(),
                        suffix.category.clone(),
                    )],
                    Provenance::Inference,
                ));
            }

            if self.config.consonant_softening && phonology::starts_with_vowel(&suffix.text) {
                if let Some(hardened) = phonology::harden(stripped) {
                    if lexicon.is_known_root(&hardened) {
                        return Some(AnalysisResult {
                            softened: true,
                            ..AnalysisResult::new(
                                hardened,
                                vec![SuffixPiece::new(
                                    suffix.text.clone(),
                                    suffix.category.clone(),
                                )],
                                Provenance::InferenceSoftened,
                            )
                        });
                    }
                }
            }
        }

        // Recursive pass over the same candidates, for stacked suffixes.
        // Running this before accepting an unknown stem is what keeps a
        // greedy split like "evlerimiz + de" from shadowing the full
        // chain "ev + ler + imiz + de".
        for suffix in &candidates {
            let stripped = strip_suffix(word, &suffix.text);
            let inner = match self.segment_at(lexicon, stripped, depth + 1) {
                Some(inner) => inner,
                None => continue,
            };

            // Only counts if the inner call actually reduced the stem.
            if inner.root() == stripped {
                continue;
            }

            let mut suffixes = inner.suffixes;
            suffixes.push(SuffixPiece::new(
                suffix.text.clone(),
                suffix.category.clone(),
            ));
            // The softening marker travels with the root, so the wrap
            // keeps it for surface reconstruction.
            return Some(AnalysisResult {
                root: inner.root,
                suffixes,
                provenance: Provenance::RecursiveInference,
                softened: inner.softened,
            });
        }

        // Inference pass: accept a stem nothing is known about yet if it
        // holds up phonologically. This is where new roots get learned.
        for suffix in &candidates {
            let stripped = strip_suffix(word, &suffix.text);

            if self.is_valid_root(lexicon, stripped) {
                return Some(AnalysisResult::new(
                    stripped,
                    vec![SuffixPiece::new(
                        suffix.text.clone(),
                        suffix.category.clone(),
                    )],
                    Provenance::Inference,
                ));
            }
        }

        None
    }

    /// A candidate root passes if it is already known, or if it keeps at
    /// least two characters, contains a vowel, and satisfies major vowel
    /// harmony. Known roots bypass the phonology checks entirely, which
    /// is what lets loanwords like "kitap" through.
    fn is_valid_root(&self, lexicon: &Lexicon, candidate: &str) -> bool {
        if lexicon.is_known_root(candidate) {
            return true;
        }

        if candidate.chars().count() < 2 {
            return false;
        }

        if !candidate.chars().any(phonology::is_vowel) {
            return false;
        }

        if self.config.vowel_harmony && !phonology::harmonizes_major(candidate) {
            return false;
        }

        true
    }
}

fn strip_suffix<'a>(word: &'a str, suffix: &SmolStr) -> &'a str {
    // Candidates always come from candidate_suffixes_for, so the suffix
    // is guaranteed to be a strict suffix of the word.
    word.strip_suffix(suffix.as_str()).unwrap_or(word)
}
