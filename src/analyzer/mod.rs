//! Resolution policy and the programmatic surface of the engine.
//!
//! Per word, in strict precedence order: analysis cache → external
//! backend (if configured) → direct lexicon match → rule segmenter →
//! unresolved fallback. Every resolving branch after the cache hit
//! writes its result through to the cache, and newly discovered roots
//! enter the lexicon, so knowledge accumulates across words, sessions
//! and processes.

use std::path::Path;

use hashbrown::HashMap;
use smol_str::SmolStr;

use crate::backend::Backend;
use crate::cache::{AnalysisCache, ProblemStatus, ProblemWord, StorageError};
use crate::lexicon::Lexicon;
use crate::segmenter::analysis::{AnalysisResult, SuffixPiece};
use crate::segmenter::{Segmenter, SegmenterConfig};
use crate::types::{PartOfSpeech, Provenance};

/// Category recorded for suffix tails supplied through corrections.
const USER_SUPPLIED_CATEGORY: &str = "user_supplied";

/// Errors from file-based operations on the analyzer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AnalyzerError {
    /// The analysis cache failed.
    #[error("Storage error")]
    Storage(#[from] StorageError),

    /// A lexicon or text file could not be read.
    #[error("Failed to read '{0}'")]
    Io(String, #[source] std::io::Error),
}

/// Tunables for a session.
#[derive(Clone, Copy, Debug)]
pub struct AnalyzerConfig {
    /// Recursion ceiling for the segmenter.
    pub max_depth: u8,
    /// Validate candidate roots against major vowel harmony.
    pub vowel_harmony: bool,
    /// Try the consonant-softening alternation on candidate roots.
    pub consonant_softening: bool,
    /// Consult the external backend, when one is attached, before the
    /// rule engine.
    pub backend_first: bool,
}

impl AnalyzerConfig {
    /// The reference configuration.
    pub const fn default() -> AnalyzerConfig {
        AnalyzerConfig {
            max_depth: 5,
            vowel_harmony: true,
            consonant_softening: true,
            backend_first: true,
        }
    }

    fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            max_depth: self.max_depth,
            vowel_harmony: self.vowel_harmony,
            consonant_softening: self.consonant_softening,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> AnalyzerConfig {
        AnalyzerConfig::default()
    }
}

/// An explicit correction for a word the engine could not segment.
#[derive(Clone, Debug)]
pub struct Correction {
    /// the corrected root
    pub root: SmolStr,
    /// its part of speech
    pub category: PartOfSpeech,
    /// an optional explicit suffix tail as `(text, category)`
    pub suffix: Option<(SmolStr, SmolStr)>,
}

/// Port implemented by interactive frontends: asked for a correction
/// when every automatic strategy has failed. Returning `None` leaves the
/// word as a pending problem word.
pub trait CorrectionPrompt {
    /// Solicits a correction for `word` from an external actor.
    fn correct(&self, word: &str) -> Option<Correction>;
}

/// A morphological analysis session over one durable cache.
pub struct Analyzer {
    cache: AnalysisCache,
    lexicon: Lexicon,
    segmenter: Segmenter,
    config: AnalyzerConfig,
    backend: Option<Box<dyn Backend>>,
    prompt: Option<Box<dyn CorrectionPrompt>>,
}

impl Analyzer {
    /// Opens a session against the cache file at `path`, rebuilding the
    /// in-memory lexicon from it. Failure here aborts the session.
    pub fn open<P: AsRef<Path>>(path: P, config: AnalyzerConfig) -> Result<Analyzer, StorageError> {
        Analyzer::with_cache(AnalysisCache::open(path)?, config)
    }

    /// Opens a throwaway in-memory session.
    pub fn in_memory(config: AnalyzerConfig) -> Result<Analyzer, StorageError> {
        Analyzer::with_cache(AnalysisCache::open_in_memory()?, config)
    }

    fn with_cache(cache: AnalysisCache, config: AnalyzerConfig) -> Result<Analyzer, StorageError> {
        let lexicon = Lexicon::from_cache(&cache)?;
        Ok(Analyzer {
            cache,
            lexicon,
            segmenter: Segmenter::new(config.segmenter_config()),
            config,
            backend: None,
            prompt: None,
        })
    }

    /// Attaches an external backend to consult before the rule engine.
    pub fn with_backend(mut self, backend: Box<dyn Backend>) -> Analyzer {
        self.backend = Some(backend);
        self
    }

    /// Attaches a correction prompt for the unresolved fallback.
    pub fn with_prompt(mut self, prompt: Box<dyn CorrectionPrompt>) -> Analyzer {
        self.prompt = Some(prompt);
        self
    }

    /// The session's lexicon projection.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Segments a single word.
    ///
    /// Never fails on unresolvable input: such words come back with
    /// [`Provenance::Default`] (or [`Provenance::Invalid`] for input
    /// that is rejected outright) and are tracked as problem words.
    /// Storage errors on the cache lookup and during write-through are
    /// logged and do not void the result, so batch callers keep going;
    /// only errors while persisting an explicit correction surface.
    pub fn segment(&mut self, word: &str) -> Result<AnalysisResult, StorageError> {
        let word = word.trim().to_lowercase();

        if word.chars().count() < 2 {
            return Ok(AnalysisResult::bare(word, Provenance::Invalid));
        }

        // A failed read costs the memo, not the word: fall through to
        // the remaining strategies and re-resolve.
        match self.cache.get_analysis(&word) {
            Ok(Some(hit)) => {
                log::debug!("cache hit: {}", word);
                return Ok(hit);
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("cache read failed for '{}', treated as a miss: {}", word, err);
            }
        }

        if self.config.backend_first {
            if let Some(result) = self.consult_backend(&word) {
                self.write_through(&word, &result);
                return Ok(result);
            }
        }

        if self.lexicon.is_known_root(&word) {
            let result = AnalysisResult::bare(word.as_str(), Provenance::Lexicon);
            self.write_through(&word, &result);
            return Ok(result);
        }

        if let Some(result) = self.segmenter.segment(&self.lexicon, &word) {
            // The depth safety valve is returned as-is, never memoized.
            if result.provenance() != Provenance::DepthExceeded {
                self.write_through(&word, &result);
            }
            return Ok(result);
        }

        self.unresolved_fallback(&word)
    }

    /// Segments every distinct word of `text`, deduplicated
    /// case-insensitively, mapping each to its analysis. A word whose
    /// resolution errors is logged and skipped; the batch continues.
    pub fn segment_text(&mut self, text: &str) -> HashMap<String, AnalysisResult> {
        let cleaned: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let mut out = HashMap::new();
        for word in cleaned.to_lowercase().split_whitespace() {
            if out.contains_key(word) {
                continue;
            }
            match self.segment(word) {
                Ok(analysis) => {
                    out.insert(word.to_string(), analysis);
                }
                Err(err) => log::error!("skipping '{}': {}", word, err),
            }
        }
        out
    }

    /// Reads a UTF-8 text file and segments every distinct word in it.
    pub fn segment_file<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<HashMap<String, AnalysisResult>, AnalyzerError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalyzerError::Io(path.display().to_string(), e))?;
        Ok(self.segment_text(&text))
    }

    /// Registers a root directly, writing through to the cache.
    pub fn register_root(
        &mut self,
        text: &str,
        category: PartOfSpeech,
    ) -> Result<(), StorageError> {
        let text = text.trim().to_lowercase();
        self.lexicon
            .add_root(&self.cache, &text, category, Provenance::Manual)?;
        Ok(())
    }

    /// Loads a tab-separated lexicon file (`word<TAB>category` per line;
    /// a line with no category defaults to noun). Returns the number of
    /// roots registered.
    pub fn load_lexicon<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, AnalyzerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AnalyzerError::Io(path.display().to_string(), e))?;

        let mut added = 0;
        for line in contents.lines() {
            let mut fields = line.trim().split('\t');
            let word = match fields.next() {
                Some(w) if !w.is_empty() => w,
                _ => continue,
            };
            let category = fields
                .next()
                .map(PartOfSpeech::from_label)
                .unwrap_or(PartOfSpeech::Noun);
            self.register_root(word, category)?;
            added += 1;
        }

        log::debug!("loaded {} roots from {}", added, path.display());
        Ok(added)
    }

    /// Problem words still waiting for a correction.
    pub fn pending_problem_words(&self) -> Result<Vec<ProblemWord>, StorageError> {
        self.cache.problem_words(Some(ProblemStatus::Pending))
    }

    /// Applies an explicit correction for `word`: registers the root,
    /// persists a manual analysis and marks the problem word resolved.
    pub fn apply_correction(
        &mut self,
        word: &str,
        correction: &Correction,
    ) -> Result<AnalysisResult, StorageError> {
        let word = word.trim().to_lowercase();
        let root_id = self.lexicon.add_root(
            &self.cache,
            &correction.root,
            correction.category,
            Provenance::UserInput,
        )?;

        let mut suffixes = vec![];
        match &correction.suffix {
            Some((text, category)) => {
                self.lexicon.add_suffix(&self.cache, text, category)?;
                suffixes.push(SuffixPiece::new(text.clone(), category.clone()));
            }
            None => {
                // Whatever tail is left between the corrected root and
                // the surface word becomes an uncategorized suffix.
                if let Some(tail) = word.strip_prefix(correction.root.as_str()) {
                    if !tail.is_empty() {
                        suffixes.push(SuffixPiece::new(tail, USER_SUPPLIED_CATEGORY));
                    }
                }
            }
        }

        let result = AnalysisResult::new(correction.root.clone(), suffixes, Provenance::Manual);
        self.cache.save_analysis(&word, root_id, &result)?;
        self.cache.resolve_problem_word(
            &word,
            &format!("root: {}, category: {}", correction.root, correction.category),
        )?;
        Ok(result)
    }

    /// Flushes and releases the storage handle.
    pub fn close(self) -> Result<(), StorageError> {
        self.cache.close()
    }

    /// Queries the backend; errors and "no answer" both fall through to
    /// the next strategy.
    fn consult_backend(&self, word: &str) -> Option<AnalysisResult> {
        let backend = self.backend.as_ref()?;
        match backend.analyze(word) {
            Ok(Some(result)) => Some(AnalysisResult {
                provenance: Provenance::ExternalBackend,
                ..result
            }),
            Ok(None) => None,
            Err(err) => {
                log::warn!("backend failed for '{}', falling through: {}", word, err);
                None
            }
        }
    }

    /// Records the analysis and its root durably. Failures here cost the
    /// memoization, not the result: the word's analysis is still
    /// returned and the batch keeps going.
    fn write_through(&mut self, word: &str, result: &AnalysisResult) {
        let category = self
            .lexicon
            .category_of(result.root())
            .unwrap_or(PartOfSpeech::Noun);

        let written = self
            .lexicon
            .add_root(&self.cache, result.root(), category, result.provenance())
            .and_then(|root_id| self.cache.save_analysis(word, root_id, result));

        if let Err(err) = written {
            log::error!("write-through failed for '{}': {}", word, err);
        }
    }

    /// The fallback once every automatic strategy has failed: track the
    /// problem word, give an attached prompt a chance, otherwise the
    /// word stands as its own root.
    fn unresolved_fallback(&mut self, word: &str) -> Result<AnalysisResult, StorageError> {
        if let Err(err) = self.cache.record_problem_word(word, "") {
            log::error!("failed to record problem word '{}': {}", word, err);
        }

        let correction = self.prompt.as_ref().and_then(|prompt| prompt.correct(word));
        if let Some(correction) = correction {
            return self.apply_correction(word, &correction);
        }

        log::debug!("unresolved: {}", word);
        Ok(AnalysisResult::bare(word, Provenance::Default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    fn analyzer() -> Analyzer {
        let mut analyzer = Analyzer::in_memory(AnalyzerConfig::default()).unwrap();
        for (root, pos) in [
            ("kitap", PartOfSpeech::Noun),
            ("ev", PartOfSpeech::Noun),
            ("gel", PartOfSpeech::Verb),
            ("güzel", PartOfSpeech::Adjective),
        ] {
            analyzer.register_root(root, pos).unwrap();
        }
        analyzer
    }

    struct FixedBackend(Option<AnalysisResult>);

    impl Backend for FixedBackend {
        fn analyze(&self, _word: &str) -> Result<Option<AnalysisResult>, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        fn analyze(&self, word: &str) -> Result<Option<AnalysisResult>, BackendError> {
            Err(BackendError::MalformedResponse(word.to_string()))
        }
    }

    struct FixedPrompt(Correction);

    impl CorrectionPrompt for FixedPrompt {
        fn correct(&self, _word: &str) -> Option<Correction> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn short_input_is_rejected_before_segmentation() {
        let mut analyzer = analyzer();

        for input in ["", "e", " a "] {
            let result = analyzer.segment(input).unwrap();
            assert_eq!(result.provenance(), Provenance::Invalid);
            assert!(result.suffixes().is_empty());
        }
        // rejected input is neither cached nor tracked as a problem
        assert!(analyzer.pending_problem_words().unwrap().is_empty());
    }

    #[test]
    fn known_word_segments_and_memoizes() {
        let mut analyzer = analyzer();

        let first = analyzer.segment("evde").unwrap();
        assert_eq!(first.root(), "ev");
        assert_eq!(first.suffixes()[0].text, "de");

        // byte-identical on the second call, served from the cache
        let second = analyzer.segment("evde").unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn case_folds_before_lookup() {
        let mut analyzer = analyzer();
        let result = analyzer.segment("  EVDE ").unwrap();
        assert_eq!(result.root(), "ev");
    }

    #[test]
    fn unresolved_word_falls_back_to_default_and_is_tracked() {
        let mut analyzer = analyzer();

        let result = analyzer.segment("xyz").unwrap();
        assert_eq!(result.root(), "xyz");
        assert_eq!(result.provenance(), Provenance::Default);

        // the default result is not memoized; resubmission retries and
        // bumps the attempt counter
        analyzer.segment("xyz").unwrap();
        let pending = analyzer.pending_problem_words().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempt_count, 2);
    }

    #[test]
    fn backend_wins_over_rules_and_writes_through() {
        let canned = AnalysisResult::new(
            "zemberek",
            vec![SuffixPiece::new("li", "derivation")],
            Provenance::ExternalBackend,
        );
        let mut analyzer = Analyzer::in_memory(AnalyzerConfig::default())
            .unwrap()
            .with_backend(Box::new(FixedBackend(Some(canned.clone()))));

        let result = analyzer.segment("zemberekli").unwrap();
        assert_eq!(result, canned);
        assert!(analyzer.lexicon().is_known_root("zemberek"));

        // memoized: the cache now answers before the backend
        let again = analyzer.segment("zemberekli").unwrap();
        assert_eq!(again, canned);
    }

    #[test]
    fn backend_error_falls_through_to_rules() {
        let mut analyzer = Analyzer::in_memory(AnalyzerConfig::default())
            .unwrap()
            .with_backend(Box::new(FailingBackend));
        analyzer.register_root("ev", PartOfSpeech::Noun).unwrap();

        let result = analyzer.segment("evde").unwrap();
        assert_eq!(result.root(), "ev");
        assert_eq!(result.provenance(), Provenance::Inference);
    }

    #[test]
    fn backend_is_skipped_when_not_preferred() {
        let canned = AnalysisResult::bare("evde", Provenance::ExternalBackend);
        let config = AnalyzerConfig {
            backend_first: false,
            ..AnalyzerConfig::default()
        };
        let mut analyzer = Analyzer::in_memory(config)
            .unwrap()
            .with_backend(Box::new(FixedBackend(Some(canned))));
        analyzer.register_root("ev", PartOfSpeech::Noun).unwrap();

        let result = analyzer.segment("evde").unwrap();
        assert_eq!(result.root(), "ev");
        assert_eq!(result.provenance(), Provenance::Inference);
    }

    #[test]
    fn prompt_resolves_problem_words() {
        let correction = Correction {
            root: "zzg".into(),
            category: PartOfSpeech::Noun,
            suffix: None,
        };
        let mut analyzer = Analyzer::in_memory(AnalyzerConfig::default())
            .unwrap()
            .with_prompt(Box::new(FixedPrompt(correction)));

        let result = analyzer.segment("zzgde").unwrap();
        assert_eq!(result.root(), "zzg");
        assert_eq!(result.provenance(), Provenance::Manual);
        assert_eq!(result.suffixes()[0].text, "de");
        assert_eq!(result.suffixes()[0].category, USER_SUPPLIED_CATEGORY);

        assert!(analyzer.pending_problem_words().unwrap().is_empty());
        assert!(analyzer.lexicon().is_known_root("zzg"));
    }

    #[test]
    fn corrupt_cache_entry_is_treated_as_miss() {
        let mut analyzer = analyzer();
        analyzer.segment("evde").unwrap();

        analyzer
            .cache
            .execute_raw(
                "UPDATE analyses SET analysis_payload = 'not json' WHERE surface_word = 'evde'",
            )
            .unwrap();

        // The unreadable memo falls through to the rule engine instead
        // of aborting; the word re-resolves and the batch keeps going.
        let result = analyzer.segment("evde").unwrap();
        assert_eq!(result.root(), "ev");
        assert_eq!(result.suffixes()[0].text, "de");

        // re-resolution overwrote the mangled payload
        let again = analyzer.segment("evde").unwrap();
        assert_eq!(again, result);

        let results = analyzer.segment_text("evde kitap");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn segment_text_deduplicates_case_insensitively() {
        let mut analyzer = analyzer();

        let results = analyzer.segment_text("Evde kitap okudum, evde! EVDE...");
        assert_eq!(results.len(), 3);
        assert_eq!(results["evde"].root(), "ev");
        assert_eq!(results["kitap"].root(), "kitap");
        assert!(results.contains_key("okudum"));
    }

    #[test]
    fn load_lexicon_parses_tsv_with_default_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roots.tsv");
        std::fs::write(&path, "masa\tnoun\nkoş\tverb\nkapı\n\n").unwrap();

        let mut analyzer = Analyzer::in_memory(AnalyzerConfig::default()).unwrap();
        let added = analyzer.load_lexicon(&path).unwrap();
        assert_eq!(added, 3);

        assert_eq!(
            analyzer.lexicon().category_of("koş"),
            Some(PartOfSpeech::Verb)
        );
        assert_eq!(
            analyzer.lexicon().category_of("kapı"),
            Some(PartOfSpeech::Noun)
        );
    }

    #[test]
    fn learning_persists_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let mut analyzer = Analyzer::open(&path, AnalyzerConfig::default()).unwrap();
            analyzer.register_root("ev", PartOfSpeech::Noun).unwrap();
            analyzer.segment("evlerimizde").unwrap();
            analyzer.close().unwrap();
        }

        let mut analyzer = Analyzer::open(&path, AnalyzerConfig::default()).unwrap();
        let result = analyzer.segment("evlerimizde").unwrap();
        assert_eq!(result.root(), "ev");
        assert!(result.suffixes().len() >= 2);
        assert_eq!(result.suffixes().last().unwrap().text, "de");
        analyzer.close().unwrap();
    }
}
