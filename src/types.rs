//! Shared enums used across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse part-of-speech tag attached to a root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    /// Noun root.
    Noun,
    /// Verb root.
    Verb,
    /// Adjective root.
    Adjective,
    /// Adverb root.
    Adverb,
    /// Pronoun root.
    Pronoun,
    /// Category not known or not supplied.
    Unknown,
}

impl PartOfSpeech {
    /// Stable label used in the durable cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Verb => "verb",
            PartOfSpeech::Adjective => "adjective",
            PartOfSpeech::Adverb => "adverb",
            PartOfSpeech::Pronoun => "pronoun",
            PartOfSpeech::Unknown => "unknown",
        }
    }

    /// Parses a label from a lexicon file or the cache. Unrecognized
    /// labels map to [`PartOfSpeech::Unknown`] rather than failing, since
    /// lexicon files in the wild carry all manner of tag sets.
    pub fn from_label(label: &str) -> PartOfSpeech {
        match label {
            "noun" => PartOfSpeech::Noun,
            "verb" => PartOfSpeech::Verb,
            "adjective" => PartOfSpeech::Adjective,
            "adverb" => PartOfSpeech::Adverb,
            "pronoun" => PartOfSpeech::Pronoun,
            _ => PartOfSpeech::Unknown,
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The strategy that produced an analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The word itself is a known root.
    Lexicon,
    /// Single- or multi-suffix rule inference against a literal root.
    Inference,
    /// Rule inference where the root matched through the softening
    /// alternation (kitabı → kitap + ı).
    InferenceSoftened,
    /// Multi-suffix inference through the recursive pass.
    RecursiveInference,
    /// Supplied by the external backend port.
    ExternalBackend,
    /// Supplied interactively through a correction prompt.
    UserInput,
    /// Registered through an explicit correction or API call.
    Manual,
    /// Nothing resolved; the word stands as its own root.
    Default,
    /// Recursion hit the depth ceiling; the remainder stands as a root.
    DepthExceeded,
    /// Input was rejected before segmentation (empty or too short).
    Invalid,
}

impl Provenance {
    /// Stable label used in the durable cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Lexicon => "lexicon",
            Provenance::Inference => "inference",
            Provenance::InferenceSoftened => "inference_softened",
            Provenance::RecursiveInference => "recursive_inference",
            Provenance::ExternalBackend => "external_backend",
            Provenance::UserInput => "user_input",
            Provenance::Manual => "manual",
            Provenance::Default => "default",
            Provenance::DepthExceeded => "depth_exceeded",
            Provenance::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
