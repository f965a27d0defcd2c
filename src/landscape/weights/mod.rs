pub mod documents;
pub mod terms;

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::{error::{expect_len, Result}, landscape::matrix::check_weight};

/// WeightVector
/// Dense vector of non-negative multipliers, one per document or one per term.
/// Produced by document/term weight collaborators; the engine only reads and combines them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WeightVector {
    weights: Vec<f64>,
}

impl WeightVector {
    /// every entry 1.0
    pub fn uniform(len: usize) -> Self {
        Self { weights: vec![1.0; len] }
    }

    /// Fails with `InvalidWeight` on a negative or non-finite entry
    pub fn from_vec(weights: Vec<f64>) -> Result<Self> {
        for (index, &w) in weights.iter().enumerate() {
            check_weight("weight", index, w)?;
        }
        Ok(Self { weights })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights.iter().copied()
    }

    /// Element-wise product
    /// w[i] = self[i] * other[i]
    pub fn combine(&self, other: &WeightVector) -> Result<WeightVector> {
        expect_len("weight vector", self.len(), other.len())?;
        Ok(Self {
            weights: self.iter().zip(other.iter()).map(|(a, b)| a * b).collect(),
        })
    }

    /// number of strictly positive entries
    pub fn count_positive(&self) -> usize {
        self.weights.iter().filter(|w| **w > 0.0).count()
    }
}

impl Index<usize> for WeightVector {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.weights[index]
    }
}

impl TryFrom<Vec<f64>> for WeightVector {
    type Error = crate::error::LandscapeError;

    fn try_from(weights: Vec<f64>) -> Result<Self> {
        WeightVector::from_vec(weights)
    }
}

impl From<WeightVector> for Vec<f64> {
    fn from(w: WeightVector) -> Self {
        w.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LandscapeError;

    #[test]
    fn combine_multiplies_element_wise() {
        let a = WeightVector::from_vec(vec![1.0, 0.5, 0.0]).unwrap();
        let b = WeightVector::from_vec(vec![2.0, 2.0, 3.0]).unwrap();
        let c = a.combine(&b).unwrap();
        assert_eq!(c.as_slice(), &[2.0, 1.0, 0.0]);
        assert_eq!(c.count_positive(), 2);
        assert_eq!(c[1], 1.0);
    }

    #[test]
    fn rejects_negative_and_mismatched() {
        assert!(matches!(
            WeightVector::from_vec(vec![1.0, -1.0]),
            Err(LandscapeError::InvalidWeight { index: 1, .. })
        ));
        assert!(matches!(
            WeightVector::from_vec(vec![f64::INFINITY]),
            Err(LandscapeError::InvalidWeight { index: 0, .. })
        ));
        let err = WeightVector::uniform(2).combine(&WeightVector::uniform(3)).unwrap_err();
        assert!(matches!(err, LandscapeError::DimensionMismatch { expected: 2, actual: 3, .. }));
    }
}
