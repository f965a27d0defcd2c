use std::cmp::Ordering;

use num::Num;
use sprs::CsVecView;

/// ドット積 (sparse merge over sorted indices)
/// d(a, b) = Σ(a_i * b_i)
///
/// Cost is O(nnz(a) + nnz(b)).
#[inline]
pub fn sparse_dot(a: CsVecView<'_, f64>, b: CsVecView<'_, f64>) -> f64 {
    debug_assert_eq!(a.dim(), b.dim(), "Vectors must be of the same length to compute dot product.");
    let (a_inds, a_vals) = (a.indices(), a.data());
    let (b_inds, b_vals) = (b.indices(), b.data());
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;
    while i < a_inds.len() && j < b_inds.len() {
        match a_inds[i].cmp(&b_inds[j]) {
            Ordering::Equal => {
                result += a_vals[i] * b_vals[j];
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    result
}

/// ||a||^2
#[inline]
pub fn norm_sq(a: CsVecView<'_, f64>) -> f64 {
    a.data().iter().map(|v| v * v).sum()
}

/// アダマール積
/// Multiplies a stored row by a mask row and appends the non-zero products
/// to `inds`/`vals` (CSR buffers). Returns the sum of the appended values.
#[inline]
pub fn hadamard_extend<N>(
    row: CsVecView<'_, N>,
    mask: CsVecView<'_, f64>,
    inds: &mut Vec<usize>,
    vals: &mut Vec<f64>,
) -> f64
where
    N: Num + Copy + Into<f64>,
{
    debug_assert_eq!(row.dim(), mask.dim(), "Vectors must be of the same length to compute hadamard product.");
    let (r_inds, r_vals) = (row.indices(), row.data());
    let (m_inds, m_vals) = (mask.indices(), mask.data());
    let mut sum = 0.0;
    let mut i = 0;
    let mut j = 0;
    while i < r_inds.len() && j < m_inds.len() {
        match r_inds[i].cmp(&m_inds[j]) {
            Ordering::Equal => {
                let value = r_vals[i].into() * m_vals[j];
                if value != 0.0 {
                    inds.push(r_inds[i]);
                    vals.push(value);
                    sum += value;
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::CsVec;

    #[test]
    fn dot_only_counts_shared_indices() {
        let a = CsVec::new(6, vec![0, 2, 5], vec![1.0, 2.0, 3.0]);
        let b = CsVec::new(6, vec![2, 3, 5], vec![4.0, 7.0, 0.5]);
        assert_eq!(sparse_dot(a.view(), b.view()), 2.0 * 4.0 + 3.0 * 0.5);
        assert_eq!(sparse_dot(b.view(), a.view()), sparse_dot(a.view(), b.view()));
        assert_eq!(norm_sq(a.view()), 14.0);
    }

    #[test]
    fn hadamard_drops_zero_products() {
        let row = CsVec::new(4, vec![0, 1, 3], vec![2u32, 5, 1]);
        let mask = CsVec::new(4, vec![0, 1, 2], vec![0.5, 0.0, 9.0]);
        let mut inds = vec![];
        let mut vals = vec![];
        let sum = hadamard_extend(row.view(), mask.view(), &mut inds, &mut vals);
        assert_eq!(inds, vec![0]);
        assert_eq!(vals, vec![1.0]);
        assert_eq!(sum, 1.0);
    }
}
