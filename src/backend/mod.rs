//! Port for an optional external morphological analyzer.
//!
//! The resolution policy queries the backend, when one is configured,
//! before running the rule engine. The contract is deliberately narrow:
//! one idempotent, side-effect-free call that either produces an
//! analysis in the engine's own result shape or has no answer. A failing
//! or malformed backend is treated as "no answer" by the policy and is
//! never fatal.

use crate::segmenter::analysis::AnalysisResult;

/// Errors reported by an external backend adapter.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend could not be reached or crashed mid-call.
    #[error("Backend unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The backend answered with data the adapter could not interpret.
    #[error("Malformed backend response for '{0}'")]
    MalformedResponse(String),
}

/// An external analyzer that may be consulted before the rule engine.
pub trait Backend {
    /// Analyzes `word`, returning `Ok(None)` when the backend has no
    /// answer. Expected to be idempotent and side-effect-free.
    fn analyze(&self, word: &str) -> Result<Option<AnalysisResult>, BackendError>;
}
