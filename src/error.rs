//! Error types for the landscape engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LandscapeError {
    /// A weight vector, column or matrix does not have the expected length/shape
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported aggregation method: {0:?} (expected one of sum, avg, max)")]
    UnsupportedAggregation(String),

    /// Every document was removed by masking
    #[error("masking removed every document ({after} of {before} documents retained)")]
    EmptyResult { before: usize, after: usize },

    /// No term keeps a positive weight (n-gram gate and term weights excluded all)
    #[error("no term survives term weighting ({columns} columns, all excluded)")]
    EmptyVocabulary { columns: usize },

    #[error("invalid {what} at index {index}: {value} (weights must be finite and non-negative)")]
    InvalidWeight {
        what: &'static str,
        index: usize,
        value: f64,
    },

    #[error("duplicate term in vocabulary: {0:?}")]
    DuplicateTerm(String),

    #[error("term not found in vocabulary: {0:?}")]
    UnknownTerm(String),

    #[error("document column not found: {0:?}")]
    MissingColumn(String),

    #[error("cache snapshot error: {0}")]
    Snapshot(#[from] serde_cbor::Error),
}

pub type Result<T> = std::result::Result<T, LandscapeError>;

/// Check a vector/axis length, returning `DimensionMismatch` on disagreement.
#[inline]
pub(crate) fn expect_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(LandscapeError::DimensionMismatch { what, expected, actual })
    }
}
