/// This crate is an n-gram significance engine: it ranks the salient terms of a
/// weighted term-document matrix and links the top terms by co-occurrence.
pub mod landscape;
pub mod config;
pub mod error;
pub mod utils;

/// Landscape Pipeline
/// The top-level struct of this crate.
/// One run goes through:
/// - document weights (filter, recency / citation weighting, caller weights)
/// - mask construction from document and term weights
/// - masking and removal of documents left without score
/// - term ranking with the configured pick method
/// - optional per-year term counts
///
/// `run_batch` runs independent inputs in parallel; every run is isolated.
pub use landscape::{Landscape, LandscapeInput, LandscapeReport};

/// Landscape Configuration
/// Plain serde structure; every field has a default.
pub use config::LandscapeConfig;

/// Error type of every fallible operation, and its `Result` alias
pub use error::{LandscapeError, Result};

/// Term-Document Matrix and Vocabulary
/// Sparse (documents x terms) matrix of non-negative scores, generic over the
/// value type `N` (e.g. f32, f64, u16, u32), with the ordered term list of its
/// columns.
///
/// # Serialization
/// Supported. Deserialization validates the shape and values again.
pub use landscape::matrix::{TermDocMatrix, Vocabulary};

/// Weight Vectors
/// - `WeightVector`: dense non-negative multipliers, one per document or term
/// - `DocumentColumns`: per-document metadata (dates, citations, categories)
/// - `DocumentFilter`, `DocumentWeighting`: document weights from that metadata
/// - `TermFilter`, `TermScorer`: term weights from an external relevance score
pub use landscape::weights::{
    documents::{ColumnMode, DocumentColumns, DocumentFilter, DocumentWeighting},
    terms::{TermFilter, TermScorer},
    WeightVector,
};

/// Mask and Mask Builder
/// Merges document weights and term weights into a sparse multiplier aligned
/// with a term-document matrix.
pub use landscape::mask::{Mask, MaskBuilder, RowNormalization};

/// Matrix Reducer
/// Applies a mask and drops the zero-sum documents, keeping the source index
/// of every retained row.
pub use landscape::reduce::{MaskedMatrix, MatrixReducer};

/// Term Ranking
/// - `PickMethod`: sum / avg / max aggregation
/// - `TermRanker`: aggregated, deterministically ordered term scores
/// - `RankedTerms`: ranked list; `{:#?}` prints one term per line
pub use landscape::evaluate::rank::{PickMethod, RankedTerm, RankedTerms, TermRanker};

/// Term Counts
/// Per-bucket (e.g. per-year) document frequencies of every term.
pub use landscape::evaluate::counts::{year_buckets, TermCounts};

/// Co-occurrence Graph
/// Complete graph over the top terms with `{nodes, links}` output.
pub use landscape::evaluate::graph::{GraphBuilder, GraphLink, GraphNode, LinkNormalization, TermGraph};

/// Matrix Cache
/// Term-document matrices keyed by corpus and vectorizer configuration, with
/// CBOR snapshots.
pub use landscape::cache::{CacheKey, MatrixCache, VectorizerConfig};
