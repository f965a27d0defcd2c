use std::{fmt::{self, Debug, Display}, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{expect_len, LandscapeError, Result},
    landscape::{matrix::Vocabulary, reduce::MaskedMatrix},
};

/// Pick Method
/// Aggregation policy collapsing a term's per-document scores into one ranking score.
///
/// - Sum: Σ_d x[d, t]
/// - Avg: Σ_d x[d, t] / |{d : x[d, t] != 0}| (zero entries are not observations)
/// - Max: max_d x[d, t]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum PickMethod {
    #[default]
    Sum,
    Avg,
    Max,
}

impl PickMethod {
    pub fn name(&self) -> &'static str {
        match self {
            PickMethod::Sum => "sum",
            PickMethod::Avg => "avg",
            PickMethod::Max => "max",
        }
    }

    /// Score every column of `matrix` in a single pass over its non-zeros
    /// Row-major accumulation order keeps results bit-identical between runs.
    pub fn aggregate(&self, matrix: &MaskedMatrix) -> Vec<f64> {
        let cols = matrix.cols();
        let mut acc = vec![0.0_f64; cols];
        let mut seen = match self {
            PickMethod::Avg => vec![0_u32; cols],
            _ => Vec::new(),
        };
        for doc in matrix.matrix().outer_iterator() {
            for (col, &value) in doc.iter() {
                match self {
                    PickMethod::Sum => acc[col] += value,
                    PickMethod::Avg => {
                        acc[col] += value;
                        seen[col] += 1;
                    }
                    PickMethod::Max => {
                        if value > acc[col] {
                            acc[col] = value;
                        }
                    }
                }
            }
        }
        if let PickMethod::Avg = self {
            for (score, &n) in acc.iter_mut().zip(&seen) {
                if n > 0 {
                    *score /= n as f64;
                }
            }
        }
        acc
    }
}

impl FromStr for PickMethod {
    type Err = LandscapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(PickMethod::Sum),
            "avg" | "mean" => Ok(PickMethod::Avg),
            "max" => Ok(PickMethod::Max),
            _ => Err(LandscapeError::UnsupportedAggregation(s.to_string())),
        }
    }
}

impl TryFrom<String> for PickMethod {
    type Error = LandscapeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<PickMethod> for &'static str {
    fn from(m: PickMethod) -> Self {
        m.name()
    }
}

impl Display for PickMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// (term, score) with the column the term came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTerm {
    pub term: String,
    pub score: f64,
    #[serde(skip)]
    pub column: usize,
}

/// Ranked Terms
/// Terms ordered by score descending, ties by column ascending.
#[derive(Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedTerms {
    pub list: Vec<RankedTerm>,
}

impl RankedTerms {
    /// Sort `(column, score)` pairs and attach terms
    /// Zero scores are dropped.
    fn from_scores(scores: impl Iterator<Item = (usize, f64)>, vocabulary: &Vocabulary) -> Self {
        let mut list: Vec<RankedTerm> = scores
            .filter(|(_, score)| *score > 0.0)
            .filter_map(|(column, score)| {
                vocabulary.term(column).map(|term| RankedTerm {
                    term: term.to_string(),
                    score,
                    column,
                })
            })
            .collect();
        list.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.column.cmp(&b.column)));
        Self { list }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// the first `n` terms (all of them if fewer exist)
    #[inline]
    pub fn top(&self, n: usize) -> &[RankedTerm] {
        &self.list[..n.min(self.list.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedTerm> + '_ {
        self.list.iter()
    }

    pub fn into_pairs(self) -> Vec<(String, f64)> {
        self.list.into_iter().map(|t| (t.term, t.score)).collect()
    }
}

impl Debug for RankedTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "RankedTerms [")?;
            for t in &self.list {
                writeln!(f, "    {:?}: {:.6} (col: {})", t.term, t.score, t.column)?;
            }
            write!(f, "]")
        } else {
            f.debug_list()
                .entries(self.list.iter().map(|t| (&t.term, t.score)))
                .finish()
        }
    }
}

impl Display for RankedTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.list.iter().map(|t| t.term.chars().count()).max().unwrap_or(0);
        for (rank, t) in self.list.iter().enumerate() {
            writeln!(f, "{:>4}. {:<width$}  {:.6}", rank + 1, t.term, t.score, width = width)?;
        }
        Ok(())
    }
}

/// Term ranker
pub struct TermRanker;

impl TermRanker {
    /// Rank every term with a positive aggregated score
    ///
    /// # Errors
    /// - `DimensionMismatch` if the vocabulary does not match the masked matrix columns
    pub fn extract(matrix: &MaskedMatrix, vocabulary: &Vocabulary, method: PickMethod) -> Result<RankedTerms> {
        expect_len("vocabulary", matrix.cols(), vocabulary.len())?;
        let scores = method.aggregate(matrix);
        let ranked = RankedTerms::from_scores(scores.into_iter().enumerate(), vocabulary);
        debug!(method = %method, terms = ranked.len(), "terms ranked");
        Ok(ranked)
    }

    /// Same as `extract` with the pick method given by name
    /// Fails with `UnsupportedAggregation` on an unknown name.
    pub fn extract_by_name(matrix: &MaskedMatrix, vocabulary: &Vocabulary, method: &str) -> Result<RankedTerms> {
        Self::extract(matrix, vocabulary, method.parse()?)
    }

    /// Rank the terms of one retained document by their masked value
    pub fn extract_document(matrix: &MaskedMatrix, vocabulary: &Vocabulary, row: usize) -> Result<RankedTerms> {
        expect_len("vocabulary", matrix.cols(), vocabulary.len())?;
        let doc = matrix.matrix().outer_view(row).ok_or(LandscapeError::DimensionMismatch {
            what: "document row",
            expected: matrix.rows(),
            actual: row,
        })?;
        Ok(RankedTerms::from_scores(doc.iter().map(|(col, v)| (col, *v)), vocabulary))
    }
}
