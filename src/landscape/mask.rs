use num::Num;
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use tracing::{debug, warn};

use crate::{
    error::{expect_len, LandscapeError, Result},
    landscape::{
        matrix::{check_weight, TermDocMatrix, Vocabulary},
        weights::WeightVector,
    },
};

/// Row normalization of the mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowNormalization {
    /// leave the raw products
    #[default]
    Off,
    /// rescale each row so the masked row sums to 1.0
    /// keeps long documents from dominating purely through their term count
    UnitSum,
}

/// Mask
/// Sparse (documents x terms) multiplier matrix:
/// mask[d, t] = doc_weight[d] * term_weight[t] (* row scale)
///
/// Only entries on the support of the term-document matrix are stored,
/// every other entry multiplies a zero and is implicitly 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    values: CsMat<f64>,
}

impl Mask {
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.values.rows(), self.values.cols())
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.nnz()
    }

    #[inline]
    pub fn matrix(&self) -> &CsMat<f64> {
        &self.values
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values.get(row, col).copied().unwrap_or(0.0)
    }
}

/// Mask builder
/// Merges a document weight vector and a term weight vector into a `Mask`
/// aligned with a term-document matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskBuilder {
    pub row_normalization: RowNormalization,
    /// terms with more tokens than this get weight 0
    pub max_ngram_length: Option<usize>,
    /// within a document, zero the sub-phrases of a longer term present in the same document
    pub unbias_ngrams: bool,
}

impl MaskBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_normalization(mut self, normalization: RowNormalization) -> Self {
        self.row_normalization = normalization;
        self
    }

    pub fn max_ngram_length(mut self, max: usize) -> Self {
        self.max_ngram_length = Some(max);
        self
    }

    pub fn unbias_ngrams(mut self, unbias: bool) -> Self {
        self.unbias_ngrams = unbias;
        self
    }

    /// Build the mask for `matrix`
    ///
    /// # Arguments
    /// * `matrix` - term-document matrix (D x T)
    /// * `doc_weights` - D document weights
    /// * `term_weights` - T term weights, `None` means uniform 1.0
    ///
    /// # Errors
    /// - `DimensionMismatch` if a weight vector length does not match the matrix
    /// - `EmptyVocabulary` if no term keeps a positive weight
    /// - `InvalidWeight` if a weight product or a masked row sum overflows
    pub fn build<N>(
        &self,
        matrix: &TermDocMatrix<N>,
        doc_weights: &WeightVector,
        term_weights: Option<&WeightVector>,
    ) -> Result<Mask>
    where
        N: Num + Copy + Into<f64>,
    {
        let (rows, cols) = matrix.shape();
        expect_len("document weights", rows, doc_weights.len())?;
        if let Some(term_weights) = term_weights {
            expect_len("term weights", cols, term_weights.len())?;
        }

        let col_weights = self.column_weights(matrix.vocabulary(), term_weights);
        if !col_weights.iter().any(|w| *w > 0.0) {
            warn!(columns = cols, max_ngram_length = ?self.max_ngram_length, "every term excluded by term weighting");
            return Err(LandscapeError::EmptyVocabulary { columns: cols });
        }

        let subterms = if self.unbias_ngrams {
            Some(subterm_index(matrix.vocabulary()))
        } else {
            None
        };

        let mut indptr = Vec::with_capacity(rows + 1);
        let mut inds = Vec::with_capacity(matrix.nnz());
        let mut vals = Vec::with_capacity(matrix.nnz());
        let mut suppressed: Vec<usize> = Vec::new();
        indptr.push(0);

        for (row, doc) in matrix.matrix().outer_iterator().enumerate() {
            let doc_w = doc_weights[row];
            let start = inds.len();
            if doc_w > 0.0 {
                suppressed.clear();
                if let Some(subterms) = &subterms {
                    for &col in doc.indices() {
                        if col_weights[col] > 0.0 {
                            suppressed.extend(subterms[col].iter().copied());
                        }
                    }
                    suppressed.sort_unstable();
                    suppressed.dedup();
                }

                let mut masked_sum = 0.0;
                for (col, value) in doc.iter() {
                    let w = doc_w * col_weights[col];
                    if w > 0.0 && suppressed.binary_search(&col).is_err() {
                        check_weight("mask value", col, w)?;
                        inds.push(col);
                        vals.push(w);
                        masked_sum += w * (*value).into();
                    }
                }
                // finite factors can still overflow once multiplied
                check_weight("masked row sum", row, masked_sum)?;

                if self.row_normalization == RowNormalization::UnitSum {
                    if masked_sum > 0.0 {
                        let scale = 1.0 / masked_sum;
                        vals[start..].iter_mut().for_each(|w| *w *= scale);
                    } else {
                        // ゼロ除算になる行は空のまま残す (後段で除去)
                        inds.truncate(start);
                        vals.truncate(start);
                    }
                }
            }
            indptr.push(inds.len());
        }

        debug!(rows, cols, nnz = inds.len(), normalization = ?self.row_normalization, "mask built");
        Ok(Mask {
            values: CsMat::new((rows, cols), indptr, inds, vals),
        })
    }

    /// term weight x n-gram order gate
    fn column_weights(&self, vocabulary: &Vocabulary, term_weights: Option<&WeightVector>) -> Vec<f64> {
        vocabulary
            .iter()
            .enumerate()
            .map(|(col, term)| {
                let w = term_weights.map_or(1.0, |tw| tw[col]);
                match self.max_ngram_length {
                    Some(max) if super::matrix::ngram_order(term) > max => 0.0,
                    _ => w,
                }
            })
            .collect()
    }
}

/// For every column, the columns of its shorter contiguous sub-phrases present in the vocabulary
fn subterm_index(vocabulary: &Vocabulary) -> Vec<Vec<usize>> {
    vocabulary
        .iter()
        .map(|term| {
            let tokens: Vec<&str> = term.split_whitespace().collect();
            let mut subs = Vec::new();
            for len in 1..tokens.len() {
                for window in tokens.windows(len) {
                    if let Some(col) = vocabulary.index_of(&window.join(" ")) {
                        subs.push(col);
                    }
                }
            }
            subs
        })
        .collect()
}
