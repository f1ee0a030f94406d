//! Durable analysis cache backed by SQLite.
//!
//! The cache is the single owner of persisted knowledge: roots, the
//! suffix inventory, memoized analyses and problem words. It is written
//! in WAL mode so several batch processes can share one cache file;
//! every mutating call runs inside a bounded retry loop with exponential
//! backoff to absorb transient lock contention from concurrent writers,
//! and carries a fixed busy timeout so nothing blocks indefinitely.

use std::path::Path;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::segmenter::analysis::AnalysisResult;
use crate::types::{PartOfSpeech, Provenance};

pub mod error;

pub use self::error::StorageError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Default confidence score assigned to newly learned roots.
const DEFAULT_CONFIDENCE: i64 = 50;

/// The closed seed inventory of inflectional/derivational suffixes,
/// inserted once when the cache is created.
const SEED_SUFFIXES: &[(&str, &[&str])] = &[
    (
        "noun_inflection",
        &[
            "ler", "lar", "in", "ın", "un", "ün", "a", "e", "i", "ı", "u", "ü", "da", "de", "ta",
            "te", "dan", "den", "tan", "ten",
        ],
    ),
    (
        "verb_inflection",
        &[
            "di", "dı", "du", "dü", "ti", "tı", "tu", "tü", "miş", "mış", "muş", "müş", "yor",
            "ecek", "acak", "ir", "ır", "ur", "ür",
        ],
    ),
    (
        "possessive",
        &[
            "im", "ım", "um", "üm", "in", "ın", "un", "ün", "si", "sı", "su", "sü", "imiz",
            "ımız", "umuz", "ümüz",
        ],
    ),
    (
        "derivation",
        &[
            "ci", "cı", "cu", "cü", "li", "lı", "lu", "lü", "lik", "lık", "luk", "lük", "siz",
            "sız", "suz", "süz",
        ],
    ),
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS roots (
    id INTEGER PRIMARY KEY,
    text TEXT UNIQUE,
    category TEXT,
    occurrence_count INTEGER DEFAULT 1,
    confidence INTEGER DEFAULT 50,
    provenance TEXT
);
CREATE TABLE IF NOT EXISTS suffixes (
    id INTEGER PRIMARY KEY,
    text TEXT,
    category TEXT,
    occurrence_count INTEGER DEFAULT 1,
    UNIQUE(text, category)
);
CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY,
    surface_word TEXT UNIQUE,
    root_ref INTEGER,
    analysis_payload TEXT,
    occurrence_count INTEGER DEFAULT 1,
    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (root_ref) REFERENCES roots (id)
);
CREATE TABLE IF NOT EXISTS problem_words (
    id INTEGER PRIMARY KEY,
    surface_word TEXT UNIQUE,
    status TEXT,
    note TEXT,
    attempt_count INTEGER DEFAULT 1
);
";

/// Lifecycle state of a word the automatic strategies could not segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    /// Queued for manual resolution.
    Pending,
    /// Resolved through an explicit correction.
    Resolved,
    /// Examined and given up on.
    Unresolved,
}

impl ProblemStatus {
    /// Stable label stored in the cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Pending => "pending",
            ProblemStatus::Resolved => "resolved",
            ProblemStatus::Unresolved => "unresolved",
        }
    }

    fn from_label(label: &str) -> ProblemStatus {
        match label {
            "resolved" => ProblemStatus::Resolved,
            "unresolved" => ProblemStatus::Unresolved,
            _ => ProblemStatus::Pending,
        }
    }
}

/// A surface form queued for manual resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProblemWord {
    /// the surface word as submitted
    pub text: SmolStr,
    /// where the word is in its resolution lifecycle
    pub status: ProblemStatus,
    /// free-form note (e.g. the correction that resolved it)
    pub note: String,
    /// how many times the word was submitted and still failed
    pub attempt_count: u32,
}

/// Durable key/value cache of everything the engine has learned.
///
/// The connection sits behind a mutex so one cache handle can be shared
/// across threads; cross-process sharing goes through SQLite itself.
pub struct AnalysisCache {
    conn: Mutex<Connection>,
}

impl AnalysisCache {
    /// Opens (creating if necessary) a cache file and ensures the schema
    /// and the seed suffix inventory exist. Failure here is fatal to the
    /// session.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<AnalysisCache, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Open(path.display().to_string(), e))?;
        let cache = AnalysisCache::init(conn)
            .map_err(|e| StorageError::Open(path.display().to_string(), e))?;
        log::debug!("analysis cache opened: {}", path.display());
        Ok(cache)
    }

    /// Opens a private in-memory cache. Used by tests and throwaway
    /// sessions; nothing persists past the handle.
    pub fn open_in_memory() -> Result<AnalysisCache, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Open(":memory:".into(), e))?;
        AnalysisCache::init(conn).map_err(|e| StorageError::Open(":memory:".into(), e))
    }

    fn init(conn: Connection) -> rusqlite::Result<AnalysisCache> {
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // WAL returns the resulting mode as a row; in-memory databases
        // report "memory" instead, which is fine.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = 10000;
             PRAGMA temp_store = MEMORY;",
        )?;

        conn.execute_batch(SCHEMA)?;

        {
            let mut stmt =
                conn.prepare("INSERT OR IGNORE INTO suffixes (text, category) VALUES (?1, ?2)")?;
            for (category, morphs) in SEED_SUFFIXES {
                for morph in *morphs {
                    stmt.execute(params![morph, category])?;
                }
            }
        }

        Ok(AnalysisCache {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `op` against the connection, retrying on transient lock
    /// contention with exponential backoff. Exhausting the budget
    /// surfaces [`StorageError::Contention`] for this operation only.
    fn with_retry<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: Fn(&Connection) -> rusqlite::Result<T>,
    {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 1u32;

        loop {
            let result = {
                let conn = self.conn.lock();
                op(&conn)
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if attempt < RETRY_ATTEMPTS && is_locked(&err) => {
                    log::warn!(
                        "analysis cache locked, retrying in {:?} (attempt {}/{})",
                        delay,
                        attempt,
                        RETRY_ATTEMPTS
                    );
                    std::thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) if is_locked(&err) => {
                    return Err(StorageError::Contention(attempt, err));
                }
                Err(err) => return Err(StorageError::Query(err)),
            }
        }
    }

    /// Inserts a root or increments its occurrence count, returning the
    /// row id. Never deletes or downgrades existing knowledge.
    pub fn upsert_root(
        &self,
        text: &str,
        category: PartOfSpeech,
        provenance: Provenance,
    ) -> Result<i64, StorageError> {
        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO roots (text, category, confidence, provenance)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(text) DO UPDATE SET occurrence_count = occurrence_count + 1",
                params![text, category.as_str(), DEFAULT_CONFIDENCE, provenance.as_str()],
            )?;
            conn.query_row("SELECT id FROM roots WHERE text = ?1", params![text], |r| {
                r.get(0)
            })
        })
    }

    /// Inserts a suffix or increments its occurrence count.
    pub fn upsert_suffix(&self, text: &str, category: &str) -> Result<(), StorageError> {
        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO suffixes (text, category) VALUES (?1, ?2)
                 ON CONFLICT(text, category) DO UPDATE SET
                     occurrence_count = occurrence_count + 1",
                params![text, category],
            )
            .map(|_| ())
        })
    }

    /// Persists an analysis for `word`, last-write-wins. Re-saving bumps
    /// the usage counter and the timestamp.
    pub fn save_analysis(
        &self,
        word: &str,
        root_id: i64,
        analysis: &AnalysisResult,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_string(analysis)
            .map_err(|e| StorageError::Payload(word.to_string(), e))?;

        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO analyses (surface_word, root_ref, analysis_payload)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(surface_word) DO UPDATE SET
                     root_ref = ?2,
                     analysis_payload = ?3,
                     occurrence_count = occurrence_count + 1,
                     last_updated = CURRENT_TIMESTAMP",
                params![word, root_id, payload],
            )
            .map(|_| ())
        })
    }

    /// Fetches the memoized analysis for `word`, if any.
    pub fn get_analysis(&self, word: &str) -> Result<Option<AnalysisResult>, StorageError> {
        let payload: Option<String> = self.with_retry(|conn| {
            conn.query_row(
                "SELECT analysis_payload FROM analyses WHERE surface_word = ?1",
                params![word],
                |r| r.get(0),
            )
            .optional()
        })?;

        match payload {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::Payload(word.to_string(), e)),
            None => Ok(None),
        }
    }

    /// Records `word` as a problem word, or bumps its attempt counter if
    /// it has failed before. A resolved word that fails again goes back
    /// to pending.
    pub fn record_problem_word(&self, word: &str, note: &str) -> Result<(), StorageError> {
        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO problem_words (surface_word, status, note) VALUES (?1, ?2, ?3)
                 ON CONFLICT(surface_word) DO UPDATE SET
                     attempt_count = attempt_count + 1,
                     status = ?2,
                     note = ?3",
                params![word, ProblemStatus::Pending.as_str(), note],
            )
            .map(|_| ())
        })
    }

    /// Marks a problem word resolved without touching its attempt count.
    pub fn resolve_problem_word(&self, word: &str, note: &str) -> Result<(), StorageError> {
        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO problem_words (surface_word, status, note) VALUES (?1, ?2, ?3)
                 ON CONFLICT(surface_word) DO UPDATE SET status = ?2, note = ?3",
                params![word, ProblemStatus::Resolved.as_str(), note],
            )
            .map(|_| ())
        })
    }

    /// Lists problem words, optionally filtered by status.
    pub fn problem_words(
        &self,
        status: Option<ProblemStatus>,
    ) -> Result<Vec<ProblemWord>, StorageError> {
        self.with_retry(|conn| {
            let mut out = vec![];
            let mut push_row = |row: &rusqlite::Row| -> rusqlite::Result<()> {
                let status: String = row.get(1)?;
                out.push(ProblemWord {
                    text: SmolStr::new(row.get::<_, String>(0)?),
                    status: ProblemStatus::from_label(&status),
                    note: row.get(2)?,
                    attempt_count: row.get(3)?,
                });
                Ok(())
            };

            match status {
                Some(filter) => {
                    let mut stmt = conn.prepare(
                        "SELECT surface_word, status, note, attempt_count
                         FROM problem_words WHERE status = ?1 ORDER BY surface_word",
                    )?;
                    let mut rows = stmt.query(params![filter.as_str()])?;
                    while let Some(row) = rows.next()? {
                        push_row(row)?;
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT surface_word, status, note, attempt_count
                         FROM problem_words ORDER BY surface_word",
                    )?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        push_row(row)?;
                    }
                }
            }

            Ok(out)
        })
    }

    /// All known roots with their categories; used to rebuild the
    /// in-memory lexicon projection at startup.
    pub fn known_roots(&self) -> Result<HashMap<SmolStr, PartOfSpeech>, StorageError> {
        self.with_retry(|conn| {
            let mut stmt = conn.prepare("SELECT text, category FROM roots")?;
            let mut rows = stmt.query([])?;
            let mut out = HashMap::new();
            while let Some(row) = rows.next()? {
                let text: String = row.get(0)?;
                let category: String = row.get(1)?;
                out.insert(SmolStr::new(text), PartOfSpeech::from_label(&category));
            }
            Ok(out)
        })
    }

    /// All known suffixes as `(text, category)` pairs.
    pub fn known_suffixes(&self) -> Result<Vec<(SmolStr, SmolStr)>, StorageError> {
        self.with_retry(|conn| {
            let mut stmt = conn.prepare("SELECT text, category FROM suffixes")?;
            let mut rows = stmt.query([])?;
            let mut out = vec![];
            while let Some(row) = rows.next()? {
                let text: String = row.get(0)?;
                let category: String = row.get(1)?;
                out.push((SmolStr::new(text), SmolStr::new(category)));
            }
            Ok(out)
        })
    }

    /// Current occurrence count for a memoized analysis, if present.
    pub fn analysis_occurrences(&self, word: &str) -> Result<Option<u32>, StorageError> {
        self.with_retry(|conn| {
            conn.query_row(
                "SELECT occurrence_count FROM analyses WHERE surface_word = ?1",
                params![word],
                |r| r.get(0),
            )
            .optional()
        })
    }

    /// Flushes and releases the storage handle.
    pub fn close(self) -> Result<(), StorageError> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| StorageError::Query(e))
    }

    // Lets tests mangle stored rows directly.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> rusqlite::Result<usize> {
        self.conn.lock().execute(sql, [])
    }
}

fn is_locked(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::analysis::SuffixPiece;

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult::new(
            "ev",
            vec![SuffixPiece::new("de", "noun_inflection")],
            Provenance::Inference,
        )
    }

    #[test]
    fn seeds_default_suffix_inventory() {
        let cache = AnalysisCache::open_in_memory().unwrap();
        let suffixes = cache.known_suffixes().unwrap();

        let expected: usize = SEED_SUFFIXES.iter().map(|(_, morphs)| morphs.len()).sum();
        assert_eq!(suffixes.len(), expected);
        assert!(suffixes
            .iter()
            .any(|(t, c)| t == "de" && c == "noun_inflection"));
        assert!(suffixes
            .iter()
            .any(|(t, c)| t == "miş" && c == "verb_inflection"));
    }

    #[test]
    fn root_upsert_increments_occurrences() {
        let cache = AnalysisCache::open_in_memory().unwrap();

        let id = cache
            .upsert_root("ev", PartOfSpeech::Noun, Provenance::Manual)
            .unwrap();
        let again = cache
            .upsert_root("ev", PartOfSpeech::Noun, Provenance::Inference)
            .unwrap();
        assert_eq!(id, again);

        let roots = cache.known_roots().unwrap();
        assert_eq!(roots.get("ev"), Some(&PartOfSpeech::Noun));
    }

    #[test]
    fn analysis_round_trip_and_last_write_wins() {
        let cache = AnalysisCache::open_in_memory().unwrap();
        let root_id = cache
            .upsert_root("ev", PartOfSpeech::Noun, Provenance::Inference)
            .unwrap();

        assert_eq!(cache.get_analysis("evde").unwrap(), None);

        let first = sample_analysis();
        cache.save_analysis("evde", root_id, &first).unwrap();
        assert_eq!(cache.get_analysis("evde").unwrap(), Some(first));
        assert_eq!(cache.analysis_occurrences("evde").unwrap(), Some(1));

        let second = AnalysisResult::bare("evde", Provenance::Manual);
        cache.save_analysis("evde", root_id, &second).unwrap();
        assert_eq!(cache.get_analysis("evde").unwrap(), Some(second));
        assert_eq!(cache.analysis_occurrences("evde").unwrap(), Some(2));
    }

    #[test]
    fn problem_words_count_attempts_and_resolve() {
        let cache = AnalysisCache::open_in_memory().unwrap();

        cache.record_problem_word("xyz", "").unwrap();
        cache.record_problem_word("xyz", "").unwrap();

        let pending = cache.problem_words(Some(ProblemStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].text, "xyz");
        assert_eq!(pending[0].attempt_count, 2);

        cache.resolve_problem_word("xyz", "root: xy").unwrap();
        assert!(cache
            .problem_words(Some(ProblemStatus::Pending))
            .unwrap()
            .is_empty());

        let all = cache.problem_words(None).unwrap();
        assert_eq!(all[0].status, ProblemStatus::Resolved);
        assert_eq!(all[0].attempt_count, 2);
        assert_eq!(all[0].note, "root: xy");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let cache = AnalysisCache::open(&path).unwrap();
            let root_id = cache
                .upsert_root("ev", PartOfSpeech::Noun, Provenance::Manual)
                .unwrap();
            cache
                .save_analysis("evde", root_id, &sample_analysis())
                .unwrap();
            cache.close().unwrap();
        }

        let cache = AnalysisCache::open(&path).unwrap();
        assert_eq!(cache.get_analysis("evde").unwrap(), Some(sample_analysis()));
        assert!(cache.known_roots().unwrap().contains_key("ev"));
    }
}
