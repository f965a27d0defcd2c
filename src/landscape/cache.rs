use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;
use num::Num;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::{error::Result, landscape::matrix::TermDocMatrix};

/// Vectorizer configuration a term-document matrix was built with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    pub min_ngram: usize,
    pub max_ngram: usize,
    /// terms in a larger share of documents than this are dropped by the vectorizer
    pub max_document_frequency: f64,
    pub text_column: String,
    pub tokenizer: String,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            min_ngram: 1,
            max_ngram: 3,
            max_document_frequency: 0.1,
            text_column: "abstract".to_string(),
            tokenizer: "lemma".to_string(),
        }
    }
}

impl PartialEq for VectorizerConfig {
    fn eq(&self, other: &Self) -> bool {
        self.min_ngram == other.min_ngram
            && self.max_ngram == other.max_ngram
            && self.max_document_frequency.to_bits() == other.max_document_frequency.to_bits()
            && self.text_column == other.text_column
            && self.tokenizer == other.tokenizer
    }
}

impl Eq for VectorizerConfig {}

impl Hash for VectorizerConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min_ngram.hash(state);
        self.max_ngram.hash(state);
        self.max_document_frequency.to_bits().hash(state);
        self.text_column.hash(state);
        self.tokenizer.hash(state);
    }
}

/// (corpus identity, vectorizer configuration)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub corpus: String,
    pub vectorizer: VectorizerConfig,
}

impl CacheKey {
    pub fn new(corpus: impl Into<String>, vectorizer: VectorizerConfig) -> Self {
        Self { corpus: corpus.into(), vectorizer }
    }
}

/// Matrix Cache
/// Precomputed term-document matrices keyed by corpus and vectorizer configuration.
/// The cache is an ordinary value owned by the caller and passed between runs;
/// there is no process-wide instance.
///
/// # Serialization
/// `to_snapshot` / `from_snapshot` encode the whole cache as CBOR bytes.
/// Where the bytes are kept is up to the host.
#[derive(Debug, Clone)]
pub struct MatrixCache<N = f64>
where
    N: Num + Copy + Into<f64>,
{
    entries: IndexMap<CacheKey, Arc<TermDocMatrix<N>>>,
}

impl<N> Default for MatrixCache<N>
where
    N: Num + Copy + Into<f64>,
{
    fn default() -> Self {
        Self { entries: IndexMap::new() }
    }
}

impl<N> MatrixCache<N>
where
    N: Num + Copy + Into<f64>,
{
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<TermDocMatrix<N>>> {
        self.entries.get(key).cloned()
    }

    /// Insert or replace the matrix for `key`
    pub fn insert(&mut self, key: CacheKey, matrix: TermDocMatrix<N>) -> Arc<TermDocMatrix<N>> {
        let matrix = Arc::new(matrix);
        self.entries.insert(key, Arc::clone(&matrix));
        matrix
    }

    /// Return the cached matrix, or build and cache it
    /// `build` only runs on a miss; if it fails nothing is cached.
    pub fn get_or_try_insert_with<F>(&mut self, key: CacheKey, build: F) -> Result<Arc<TermDocMatrix<N>>>
    where
        F: FnOnce() -> Result<TermDocMatrix<N>>,
    {
        if let Some(matrix) = self.entries.get(&key) {
            debug!(corpus = %key.corpus, "matrix cache hit");
            return Ok(Arc::clone(matrix));
        }
        debug!(corpus = %key.corpus, "matrix cache miss");
        let matrix = build()?;
        Ok(self.insert(key, matrix))
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<Arc<TermDocMatrix<N>>> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> + '_ {
        self.entries.keys()
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a, N>
where
    N: Num + Copy + Into<f64>,
{
    entries: Vec<(&'a CacheKey, &'a TermDocMatrix<N>)>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "N: Deserialize<'de> + Num + Copy + Into<f64> + Default"))]
struct SnapshotOwned<N>
where
    N: Num + Copy + Into<f64>,
{
    entries: Vec<(CacheKey, TermDocMatrix<N>)>,
}

impl<N> MatrixCache<N>
where
    N: Num + Copy + Into<f64> + Serialize,
{
    /// Encode every entry, in insertion order, as CBOR
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = SnapshotRef {
            entries: self.entries.iter().map(|(k, m)| (k, m.as_ref())).collect(),
        };
        Ok(serde_cbor::to_vec(&snapshot)?)
    }
}

impl<N> MatrixCache<N>
where
    N: Num + Copy + Into<f64> + Default + DeserializeOwned,
{
    /// Decode a snapshot; every matrix is validated again
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self> {
        let snapshot: SnapshotOwned<N> = serde_cbor::from_slice(bytes)?;
        let entries = snapshot
            .entries
            .into_iter()
            .map(|(k, m)| (k, Arc::new(m)))
            .collect::<IndexMap<_, _>>();
        debug!(entries = entries.len(), "matrix cache restored");
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{error::LandscapeError, landscape::matrix::Vocabulary};

    fn matrix() -> TermDocMatrix {
        TermDocMatrix::from_dense_rows(&[[0.1, 0.0], [0.3, 0.7]], Vocabulary::new(["a", "b c"]).unwrap()).unwrap()
    }

    fn key(corpus: &str, max_ngram: usize) -> CacheKey {
        CacheKey::new(corpus, VectorizerConfig { max_ngram, ..Default::default() })
    }

    #[test]
    fn builds_once_per_key() {
        let mut cache = MatrixCache::new();
        let calls = Cell::new(0);
        let build = || {
            calls.set(calls.get() + 1);
            Ok(matrix())
        };
        let first = cache.get_or_try_insert_with(key("patents", 3), build).unwrap();
        let second = cache.get_or_try_insert_with(key("patents", 3), build).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        // a different vectorizer configuration is a different entry
        cache.get_or_try_insert_with(key("patents", 2), build).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_build_is_not_cached() {
        let mut cache: MatrixCache = MatrixCache::new();
        let err = cache
            .get_or_try_insert_with(key("patents", 3), || Err(LandscapeError::MissingColumn("abstract".into())))
            .unwrap_err();
        assert!(matches!(err, LandscapeError::MissingColumn(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn max_df_is_part_of_the_key() {
        let a = CacheKey::new("c", VectorizerConfig { max_document_frequency: 0.1, ..Default::default() });
        let b = CacheKey::new("c", VectorizerConfig { max_document_frequency: 0.3, ..Default::default() });
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn snapshot_round_trip() {
        let mut cache = MatrixCache::new();
        cache.insert(key("patents", 3), matrix());
        cache.insert(key("news", 1), matrix());
        let bytes = cache.to_snapshot().unwrap();
        let restored: MatrixCache = MatrixCache::from_snapshot(&bytes).unwrap();
        assert_eq!(restored.keys().cloned().collect::<Vec<_>>(), cache.keys().cloned().collect::<Vec<_>>());
        assert_eq!(*restored.get(&key("patents", 3)).unwrap(), matrix());

        assert!(matches!(
            MatrixCache::<f64>::from_snapshot(&bytes[..bytes.len() / 2]),
            Err(LandscapeError::Snapshot(_))
        ));
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = MatrixCache::new();
        cache.insert(key("a", 1), matrix());
        cache.insert(key("b", 1), matrix());
        assert!(cache.remove(&key("a", 1)).is_some());
        assert!(!cache.contains(&key("a", 1)));
        cache.clear();
        assert!(cache.is_empty());
    }
}
