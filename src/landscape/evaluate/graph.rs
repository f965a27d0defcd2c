use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec, CsVecView};
use tracing::debug;

use crate::{
    error::{expect_len, LandscapeError, Result},
    landscape::{evaluate::rank::RankedTerm, matrix::Vocabulary, reduce::MaskedMatrix},
    utils::math::{norm_sq, sparse_dot},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub text: String,
    pub freq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub size: f64,
}

/// Term co-occurrence graph
/// `{nodes: [{text, freq}], links: [{source, target, size}]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl TermGraph {
    /// size of the link between two terms, in either direction
    pub fn link_size(&self, a: &str, b: &str) -> Option<f64> {
        self.links
            .iter()
            .find(|l| (l.source == a && l.target == b) || (l.source == b && l.target == a))
            .map(|l| l.size)
    }
}

/// Link size normalization
/// size = (col_i · col_j) / denominator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkNormalization {
    /// denominator = ||col_i|| * ||col_j||
    /// cosine of the two column vectors, in [0, 1]
    #[default]
    Cosine,
    /// denominator = max_k ||col_k||^2 over the selected terms
    /// one constant for the whole graph, in [0, 1]
    CorpusConstant,
}

/// Graph builder
/// Complete co-occurrence graph over the given top terms.
///
/// N terms give N * (N - 1) / 2 links, including zero-size links, unless
/// `min_link_size` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphBuilder {
    pub normalization: LinkNormalization,
    /// only emit links with `size >= min_link_size`
    pub min_link_size: Option<f64>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalization(mut self, normalization: LinkNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn min_link_size(mut self, min: f64) -> Self {
        self.min_link_size = Some(min);
        self
    }

    /// # Errors
    /// - `DimensionMismatch` if the vocabulary does not match the matrix columns
    /// - `UnknownTerm` if a term is not in the vocabulary
    /// - `DuplicateTerm` if a term is given twice
    pub fn build(&self, terms: &[RankedTerm], matrix: &MaskedMatrix, vocabulary: &Vocabulary) -> Result<TermGraph> {
        expect_len("vocabulary", matrix.cols(), vocabulary.len())?;
        let mut seen = HashSet::with_capacity(terms.len());
        let columns = terms
            .iter()
            .map(|t| {
                let col = vocabulary.index_of(&t.term).ok_or_else(|| LandscapeError::UnknownTerm(t.term.clone()))?;
                if !seen.insert(col) {
                    return Err(LandscapeError::DuplicateTerm(t.term.clone()));
                }
                Ok(col)
            })
            .collect::<Result<Vec<usize>>>()?;

        // 列ベクトルを得るため CSC へ
        let csc: CsMat<f64> = matrix.matrix().to_csc();
        let raw: Vec<Option<CsVecView<'_, f64>>> = columns.iter().map(|&c| csc.outer_view(c)).collect();

        // columns are rescaled before any product so norms and dots stay finite;
        // both normalizations are invariant under this scaling
        let peaks: Vec<f64> = raw
            .iter()
            .map(|col| col.as_ref().map_or(0.0, |v| v.data().iter().copied().fold(0.0_f64, f64::max)))
            .collect();
        let global_peak = peaks.iter().copied().fold(0.0_f64, f64::max);
        let scaled: Vec<CsVec<f64>> = raw
            .iter()
            .zip(&peaks)
            .map(|(col, &peak)| {
                let scale = match self.normalization {
                    LinkNormalization::Cosine => peak,
                    LinkNormalization::CorpusConstant => global_peak,
                };
                match col {
                    Some(v) if scale > 0.0 => v.map(|x| x / scale),
                    _ => CsVec::empty(matrix.rows()),
                }
            })
            .collect();
        let norms: Vec<f64> = scaled.iter().map(|v| norm_sq(v.view())).collect();
        let constant = norms.iter().copied().fold(0.0_f64, f64::max);

        let nodes = terms
            .iter()
            .map(|t| GraphNode { text: t.term.clone(), freq: t.score })
            .collect();

        let mut links = Vec::with_capacity(terms.len() * terms.len().saturating_sub(1) / 2);
        for i in 0..terms.len() {
            for j in (i + 1)..terms.len() {
                let dot = sparse_dot(scaled[i].view(), scaled[j].view());
                let denominator = match self.normalization {
                    LinkNormalization::Cosine => (norms[i] * norms[j]).sqrt(),
                    LinkNormalization::CorpusConstant => constant,
                };
                let size = dot / denominator;
                let size = if denominator > 0.0 && size.is_finite() { size.min(1.0) } else { 0.0 };
                if self.min_link_size.map_or(true, |min| size >= min) {
                    links.push(GraphLink {
                        source: terms[i].term.clone(),
                        target: terms[j].term.clone(),
                        size,
                    });
                }
            }
        }

        debug!(nodes = terms.len(), links = links.len(), normalization = ?self.normalization, "term graph built");
        Ok(TermGraph { nodes, links })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landscape::{
        evaluate::rank::{PickMethod, TermRanker},
        mask::MaskBuilder,
        matrix::TermDocMatrix,
        reduce::MatrixReducer,
        weights::WeightVector,
    };

    fn setup() -> (MaskedMatrix, Vocabulary, Vec<RankedTerm>) {
        let vocab = Vocabulary::new(["gate line", "fluid commun", "central portion", "core network"]).unwrap();
        let m = TermDocMatrix::from_dense_rows(
            &[
                [0.5, 0.5, 0.0, 0.0],
                [0.4, 0.0, 0.3, 0.0],
                [0.0, 0.2, 0.0, 0.0],
                [0.6, 0.1, 0.3, 0.0],
                [0.0, 0.0, 0.0, 0.9],
            ],
            vocab.clone(),
        )
        .unwrap();
        let mask = MaskBuilder::new().build(&m, &WeightVector::uniform(5), None).unwrap();
        let masked = MatrixReducer::apply(&m, &mask).unwrap();
        let ranked = TermRanker::extract(&masked, &vocab, PickMethod::Sum).unwrap();
        (masked, vocab, ranked.list)
    }

    #[test]
    fn complete_graph_over_top_terms() {
        let (m, v, ranked) = setup();
        let graph = GraphBuilder::new().build(&ranked, &m, &v).unwrap();
        let n = ranked.len();
        assert_eq!(graph.nodes.len(), n);
        assert_eq!(graph.links.len(), n * (n - 1) / 2);
        assert_eq!(graph.nodes[0], GraphNode { text: "gate line".into(), freq: ranked[0].score });
        // sources come before targets in rank order
        for link in &graph.links {
            let pos = |t: &str| ranked.iter().position(|r| r.term == t).unwrap();
            assert!(pos(&link.source) < pos(&link.target));
        }
        // no shared document, still linked
        assert_eq!(graph.link_size("core network", "gate line"), Some(0.0));
    }

    #[test]
    fn cosine_sizes_are_symmetric_and_bounded() {
        let (m, v, ranked) = setup();
        let graph = GraphBuilder::new().build(&ranked, &m, &v).unwrap();
        let mut reversed = ranked.clone();
        reversed.reverse();
        let flipped = GraphBuilder::new().build(&reversed, &m, &v).unwrap();
        for link in &graph.links {
            assert!((0.0..=1.0 + 1e-12).contains(&link.size));
            assert_eq!(flipped.link_size(&link.target, &link.source), Some(link.size));
        }
        // gate line = [.5,.4,0,.6,0], central portion = [0,.3,0,.3,0]
        let expected = (0.4 * 0.3 + 0.6 * 0.3) / ((0.25f64 + 0.16 + 0.36) * (0.09 + 0.09)).sqrt();
        let size = graph.link_size("gate line", "central portion").unwrap();
        assert!((size - expected).abs() < 1e-12);
    }

    #[test]
    fn corpus_constant_normalization() {
        let (m, v, ranked) = setup();
        let graph = GraphBuilder::new()
            .normalization(LinkNormalization::CorpusConstant)
            .build(&ranked, &m, &v)
            .unwrap();
        // largest squared column norm: core network = 0.81
        let expected = (0.5 * 0.5 + 0.6 * 0.1) / 0.81;
        let size = graph.link_size("gate line", "fluid commun").unwrap();
        assert!((size - expected).abs() < 1e-12);
        assert!(graph.links.iter().all(|l| l.size <= 1.0));
    }

    #[test]
    fn threshold_is_opt_in() {
        let (m, v, ranked) = setup();
        let graph = GraphBuilder::new().min_link_size(0.1).build(&ranked, &m, &v).unwrap();
        assert!(graph.links.len() < 6);
        assert!(graph.links.iter().all(|l| l.size >= 0.1));
        assert_eq!(graph.nodes.len(), 4);
    }

    #[test]
    fn unknown_terms_and_small_inputs() {
        let (m, v, ranked) = setup();
        let mut bad = ranked[..2].to_vec();
        bad[1].term = "quantum dot".into();
        assert!(matches!(
            GraphBuilder::new().build(&bad, &m, &v),
            Err(LandscapeError::UnknownTerm(t)) if t == "quantum dot"
        ));

        let single = GraphBuilder::new().build(&ranked[..1], &m, &v).unwrap();
        assert_eq!((single.nodes.len(), single.links.len()), (1, 0));
        let empty = GraphBuilder::new().build(&[], &m, &v).unwrap();
        assert_eq!(empty, TermGraph::default());
    }

    #[test]
    fn serializes_to_renderer_shape() {
        let (m, v, ranked) = setup();
        let graph = GraphBuilder::new().build(&ranked[..2], &m, &v).unwrap();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][0]["text"], "gate line");
        assert!(json["nodes"][0]["freq"].is_f64());
        assert_eq!(json["links"][0]["source"], "gate line");
        assert_eq!(json["links"][0]["target"], "core network");
        assert!(json["links"][0]["size"].is_f64());
    }

    #[test]
    fn repeated_terms_are_rejected() {
        let (m, v, ranked) = setup();
        let repeated = vec![ranked[0].clone(), ranked[1].clone(), ranked[0].clone()];
        assert!(matches!(
            GraphBuilder::new().build(&repeated, &m, &v),
            Err(LandscapeError::DuplicateTerm(t)) if t == "gate line"
        ));
    }

    #[test]
    fn huge_values_keep_sizes_finite() {
        let vocab = Vocabulary::new(["a", "b"]).unwrap();
        let m = TermDocMatrix::from_dense_rows(&[[1e300, 1e300], [1e300, 0.0], [1.0, 1.0]], vocab.clone()).unwrap();
        let mask = MaskBuilder::new().build(&m, &WeightVector::uniform(3), None).unwrap();
        let masked = MatrixReducer::apply(&m, &mask).unwrap();
        let ranked = TermRanker::extract(&masked, &vocab, PickMethod::Max).unwrap();

        for normalization in [LinkNormalization::Cosine, LinkNormalization::CorpusConstant] {
            let graph = GraphBuilder::new().normalization(normalization).build(&ranked.list, &masked, &vocab).unwrap();
            let size = graph.link_size("a", "b").unwrap();
            assert!(size.is_finite() && (0.0..=1.0).contains(&size), "{:?}: {}", normalization, size);
        }
        // a = [1, 1, ~0], b = [1, 0, ~0] after scaling
        let cosine = GraphBuilder::new().build(&ranked.list, &masked, &vocab).unwrap();
        assert!((cosine.link_size("a", "b").unwrap() - 1.0 / 2f64.sqrt()).abs() < 1e-12);
    }
}
