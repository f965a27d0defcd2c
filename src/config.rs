//! Run configuration for the landscape pipeline.

use serde::{Deserialize, Serialize};

use crate::landscape::{
    evaluate::{graph::GraphBuilder, rank::PickMethod},
    mask::MaskBuilder,
    weights::documents::{DocumentFilter, DocumentWeighting},
};

/// Top-level landscape configuration.
///
/// Every field has a default, so a partial document (e.g. `{"top_terms": 50}`)
/// deserializes into a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Aggregation used to rank terms (`sum`, `avg` or `max`).
    pub pick_method: PickMethod,
    /// Number of top terms linked by `Landscape::graph`; reports keep every ranked term.
    pub top_terms: usize,
    /// Count per-year document frequencies when the input carries dates.
    pub term_counts: bool,
    /// Which documents take part in the run.
    pub document_filter: DocumentFilter,
    /// Recency / citation weighting of the documents that take part.
    pub document_weighting: DocumentWeighting,
    /// Mask options.
    pub mask: MaskBuilder,
    /// Graph options used by `Landscape::graph`.
    pub graph: GraphBuilder,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            pick_method: PickMethod::Sum,
            top_terms: 25,
            term_counts: false,
            document_filter: DocumentFilter::default(),
            document_weighting: DocumentWeighting::default(),
            mask: MaskBuilder::default(),
            graph: GraphBuilder::default(),
        }
    }
}

impl LandscapeConfig {
    pub fn pick_method(mut self, method: PickMethod) -> Self {
        self.pick_method = method;
        self
    }

    pub fn top_terms(mut self, n: usize) -> Self {
        self.top_terms = n;
        self
    }

    pub fn term_counts(mut self, on: bool) -> Self {
        self.term_counts = on;
        self
    }

    pub fn document_filter(mut self, filter: DocumentFilter) -> Self {
        self.document_filter = filter;
        self
    }

    pub fn document_weighting(mut self, weighting: DocumentWeighting) -> Self {
        self.document_weighting = weighting;
        self
    }

    pub fn mask(mut self, mask: MaskBuilder) -> Self {
        self.mask = mask;
        self
    }

    pub fn graph(mut self, graph: GraphBuilder) -> Self {
        self.graph = graph;
        self
    }
}
