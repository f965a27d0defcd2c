use num::Num;
use sprs::CsMat;
use tracing::{debug, info, warn};

use crate::{
    error::{expect_len, LandscapeError, Result},
    landscape::{mask::Mask, matrix::TermDocMatrix},
    utils::math::hadamard_extend,
};

/// Masked Matrix
/// Element-wise product of a mask and a term-document matrix with
/// zero-sum rows removed.
///
/// `retained_rows[i]` is the source document index of row `i`, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedMatrix {
    matrix: CsMat<f64>,
    retained_rows: Vec<usize>,
    source_rows: usize,
}

impl MaskedMatrix {
    #[inline]
    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.matrix.cols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// source document indices of the retained rows
    #[inline]
    pub fn retained_rows(&self) -> &[usize] {
        &self.retained_rows
    }

    /// row count of the matrix before masking
    #[inline]
    pub fn source_rows(&self) -> usize {
        self.source_rows
    }

    /// source document index of masked row `row`
    #[inline]
    pub fn source_row(&self, row: usize) -> Option<usize> {
        self.retained_rows.get(row).copied()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }
}

/// Matrix reducer
/// Applies a mask and removes the documents left without any score.
pub struct MatrixReducer;

impl MatrixReducer {
    /// # Errors
    /// - `DimensionMismatch` if the mask and matrix shapes differ
    /// - `EmptyResult` if every row is removed
    pub fn apply<N>(matrix: &TermDocMatrix<N>, mask: &Mask) -> Result<MaskedMatrix>
    where
        N: Num + Copy + Into<f64>,
    {
        let (rows, cols) = matrix.shape();
        expect_len("mask rows", rows, mask.shape().0)?;
        expect_len("mask columns", cols, mask.shape().1)?;

        let mut indptr = Vec::with_capacity(rows + 1);
        let mut inds = Vec::new();
        let mut vals = Vec::new();
        let mut retained_rows = Vec::new();
        indptr.push(0);

        for (row, (doc, mask_row)) in matrix
            .matrix()
            .outer_iterator()
            .zip(mask.matrix().outer_iterator())
            .enumerate()
        {
            let start = inds.len();
            let sum = hadamard_extend(doc, mask_row, &mut inds, &mut vals);
            if sum > 0.0 {
                retained_rows.push(row);
                indptr.push(inds.len());
            } else {
                inds.truncate(start);
                vals.truncate(start);
            }
        }

        let after = retained_rows.len();
        if after == 0 {
            warn!(documents = rows, "masking removed every document");
            return Err(LandscapeError::EmptyResult { before: rows, after });
        }

        info!("processing term-document matrix of {} / {} documents", after, rows);
        debug!(nnz = inds.len(), cols, "masked matrix built");
        Ok(MaskedMatrix {
            matrix: CsMat::new((after, cols), indptr, inds, vals),
            retained_rows,
            source_rows: rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landscape::{mask::MaskBuilder, matrix::Vocabulary, weights::WeightVector};

    fn abc() -> TermDocMatrix {
        TermDocMatrix::from_dense_rows(
            &[[1.0, 0.0, 2.0], [0.0, 0.0, 0.0], [0.5, 1.5, 0.0], [0.0, 3.0, 0.0]],
            Vocabulary::new(["a", "b", "c"]).unwrap(),
        )
        .unwrap()
    }

    fn reduce(m: &TermDocMatrix, docs: Vec<f64>, terms: Option<Vec<f64>>) -> Result<MaskedMatrix> {
        let docs = WeightVector::from_vec(docs).unwrap();
        let terms = terms.map(|t| WeightVector::from_vec(t).unwrap());
        let mask = MaskBuilder::new().build(m, &docs, terms.as_ref())?;
        MatrixReducer::apply(m, &mask)
    }

    #[test]
    fn uniform_mask_reproduces_matrix_without_zero_rows() {
        let m = abc();
        let masked = reduce(&m, vec![1.0; 4], None).unwrap();
        assert_eq!(masked.shape(), (3, 3));
        assert_eq!(masked.retained_rows(), &[0, 2, 3]);
        assert_eq!(masked.source_rows(), 4);
        for (i, &src) in masked.retained_rows().iter().enumerate() {
            for c in 0..3 {
                assert_eq!(masked.get(i, c), m.get(src, c));
            }
        }
    }

    #[test]
    fn zero_weights_drop_rows_and_keep_order() {
        let m = abc();
        let masked = reduce(&m, vec![2.0, 1.0, 0.0, 1.0], None).unwrap();
        assert_eq!(masked.retained_rows(), &[0, 3]);
        assert_eq!(masked.get(0, 2), 4.0);
        assert_eq!(masked.source_row(1), Some(3));
        assert_eq!(masked.source_row(2), None);

        // term weights can empty a document too
        let masked = reduce(&m, vec![1.0; 4], Some(vec![1.0, 0.0, 1.0])).unwrap();
        assert_eq!(masked.retained_rows(), &[0, 2]);
        assert_eq!(masked.cols(), 3);
    }

    #[test]
    fn all_rows_removed_is_an_error() {
        let err = reduce(&abc(), vec![0.0; 4], None).unwrap_err();
        assert!(matches!(err, LandscapeError::EmptyResult { before: 4, after: 0 }));
    }

    #[test]
    fn mask_shape_must_match() {
        let m = abc();
        let other = TermDocMatrix::from_dense_rows(&[[1.0, 1.0, 1.0]], Vocabulary::new(["a", "b", "c"]).unwrap()).unwrap();
        let mask = MaskBuilder::new().build(&other, &WeightVector::uniform(1), None).unwrap();
        let err = MatrixReducer::apply(&m, &mask).unwrap_err();
        assert!(matches!(err, LandscapeError::DimensionMismatch { what: "mask rows", .. }));
    }
}
