use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    landscape::{
        matrix::{check_weight, Vocabulary},
        weights::WeightVector,
    },
};

/// Term scorer
/// External source of per-term importance, e.g. embedding similarity of a term
/// to a set of seed phrases. Scores must be finite and non-negative.
pub trait TermScorer {
    fn score(&self, term: &str) -> f64;
}

impl<F> TermScorer for F
where
    F: Fn(&str) -> f64,
{
    #[inline]
    fn score(&self, term: &str) -> f64 {
        self(term)
    }
}

/// Term filter
/// Turns scorer output into a term weight vector aligned to a vocabulary.
/// Scores below `threshold` become 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermFilter {
    pub threshold: f64,
    /// true: surviving terms weigh 1.0, false: surviving terms keep their score
    pub binary: bool,
}

impl Default for TermFilter {
    fn default() -> Self {
        Self { threshold: 0.0, binary: true }
    }
}

impl TermFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, ..Default::default() }
    }

    /// # Errors
    /// - `InvalidWeight` if the scorer returns a negative or non-finite score
    pub fn weights<S>(&self, vocabulary: &Vocabulary, scorer: &S) -> Result<WeightVector>
    where
        S: TermScorer + ?Sized,
    {
        let mut weights = Vec::with_capacity(vocabulary.len());
        for (index, term) in vocabulary.iter().enumerate() {
            let score = scorer.score(term);
            check_weight("term score", index, score)?;
            let w = if score < self.threshold {
                0.0
            } else if self.binary {
                1.0
            } else {
                score
            };
            weights.push(w);
        }
        let weights = WeightVector { weights };
        debug!(kept = weights.count_positive(), total = vocabulary.len(), "term filter applied");
        Ok(weights)
    }
}
