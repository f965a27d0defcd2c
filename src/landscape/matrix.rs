use std::fmt::Debug;

use indexmap::IndexSet;
use num::Num;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{expect_len, LandscapeError, Result};

/// Vocabulary
/// Ordered, duplicate-free list of terms.
/// The position of a term is its column index in the term-document matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: IndexSet<Box<str>>,
}

impl Vocabulary {
    /// Build a vocabulary from terms in column order
    /// Fails with `DuplicateTerm` if a term appears twice
    pub fn new<I, T>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let iter = terms.into_iter();
        let mut set = IndexSet::with_capacity(iter.size_hint().0);
        for term in iter {
            let term = term.as_ref();
            if !set.insert(Box::<str>::from(term)) {
                return Err(LandscapeError::DuplicateTerm(term.to_string()));
            }
        }
        Ok(Self { terms: set })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term at column `index`
    #[inline]
    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get_index(index).map(|t| t.as_ref())
    }

    /// Column index of `term`
    #[inline]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    /// Number of tokens making up the term at `index` (1 = unigram, 2 = bigram ...)
    #[inline]
    pub fn ngram_order(&self, index: usize) -> Option<usize> {
        self.term(index).map(ngram_order)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.iter().map(|t| t.as_ref())
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = LandscapeError;

    fn try_from(terms: Vec<String>) -> Result<Self> {
        Vocabulary::new(terms)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.terms.into_iter().map(String::from).collect()
    }
}

/// token count of an n-gram
#[inline]
pub fn ngram_order(term: &str) -> usize {
    term.split_whitespace().count()
}

/// Term-Document Matrix
/// Sparse CSR matrix with one row per document and one column per vocabulary term.
/// Values are non-negative scores produced by an external vectorizer (TF-IDF, counts, ...).
///
/// `TermDocMatrix<N>` is generic over the stored value type:
/// - `N`: any `num::Num` that widens into `f64` (f32, f64, u8, u16, u32)
///
/// All arithmetic done by the engine is performed in `f64`.
/// The shape is fixed once constructed.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawTermDocMatrix<N>",
    bound(
        serialize = "N: Serialize + Clone",
        deserialize = "N: Deserialize<'de> + Num + Copy + Into<f64> + Default"
    )
)]
pub struct TermDocMatrix<N = f64>
where
    N: Num + Copy + Into<f64>,
{
    matrix: CsMat<N>,
    vocabulary: Vocabulary,
}

#[derive(Deserialize)]
struct RawTermDocMatrix<N> {
    matrix: CsMat<N>,
    vocabulary: Vocabulary,
}

impl<N> TryFrom<RawTermDocMatrix<N>> for TermDocMatrix<N>
where
    N: Num + Copy + Into<f64> + Default,
{
    type Error = LandscapeError;

    fn try_from(raw: RawTermDocMatrix<N>) -> Result<Self> {
        TermDocMatrix::from_csr(raw.matrix, raw.vocabulary)
    }
}

impl<N> TermDocMatrix<N>
where
    N: Num + Copy + Into<f64> + Default,
{
    /// Wrap an existing sparse matrix
    /// CSC input is converted to CSR.
    ///
    /// # Errors
    /// - `DimensionMismatch` if the vocabulary length differs from the column count
    /// - `InvalidWeight` if a stored value is negative or not finite
    pub fn from_csr(matrix: CsMat<N>, vocabulary: Vocabulary) -> Result<Self> {
        expect_len("vocabulary", matrix.cols(), vocabulary.len())?;
        let matrix = if matrix.is_csr() { matrix } else { matrix.to_csr() };
        for (index, value) in matrix.data().iter().enumerate() {
            check_weight("matrix value", index, (*value).into())?;
        }
        Ok(Self { matrix, vocabulary })
    }

    /// Build from `(row, column, value)` triplets; duplicated coordinates are summed
    pub fn from_triplets(rows: usize, vocabulary: Vocabulary, triplets: &[(usize, usize, N)]) -> Result<Self> {
        let cols = vocabulary.len();
        let mut tri = TriMat::with_capacity((rows, cols), triplets.len());
        for (index, &(row, col, value)) in triplets.iter().enumerate() {
            if row >= rows {
                return Err(LandscapeError::DimensionMismatch { what: "triplet row", expected: rows, actual: row });
            }
            if col >= cols {
                return Err(LandscapeError::DimensionMismatch { what: "triplet column", expected: cols, actual: col });
            }
            check_weight("matrix value", index, value.into())?;
            // ゼロは疎として持たない
            if value != N::zero() {
                tri.add_triplet(row, col, value);
            }
        }
        Self::from_csr(tri.to_csr(), vocabulary)
    }

    /// Build from dense rows; every row must have `vocabulary.len()` entries
    pub fn from_dense_rows<R>(rows: &[R], vocabulary: Vocabulary) -> Result<Self>
    where
        R: AsRef<[N]>,
    {
        let cols = vocabulary.len();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in rows {
            let row = row.as_ref();
            expect_len("dense row", cols, row.len())?;
            for (col, &value) in row.iter().enumerate() {
                if value != N::zero() {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }
        Self::from_csr(CsMat::new((rows.len(), cols), indptr, indices, data), vocabulary)
    }
}

impl<N> TermDocMatrix<N>
where
    N: Num + Copy + Into<f64>,
{
    /// (documents, terms)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.rows(), self.matrix.cols())
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
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    #[inline]
    pub fn matrix(&self) -> &CsMat<N> {
        &self.matrix
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Value at (row, col) widened to f64; absent entries are 0.0
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).map_or(0.0, |v| (*v).into())
    }
}

impl<N> Debug for TermDocMatrix<N>
where
    N: Num + Copy + Into<f64>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermDocMatrix")
            .field("shape", &self.shape())
            .field("nnz", &self.nnz())
            .field("vocabulary", &self.vocabulary.len())
            .finish()
    }
}

/// weights must be finite and >= 0
#[inline]
pub(crate) fn check_weight(what: &'static str, index: usize, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LandscapeError::InvalidWeight { what, index, value })
    }
}
