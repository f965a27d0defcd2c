use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    error::{expect_len, Result},
    landscape::{matrix::Vocabulary, reduce::MaskedMatrix},
};

/// Term Counts
/// Raw document frequency of every term per bucket (e.g. per publication year).
/// Counts are document counts, independent of the scoring policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TermCounts<B>
where
    B: Ord,
{
    /// bucket -> count per column
    pub buckets: BTreeMap<B, Vec<u32>>,
}

impl<B> TermCounts<B>
where
    B: Ord + Clone,
{
    /// Count, per bucket, the retained documents in which each term is non-zero
    ///
    /// # Arguments
    /// * `matrix` - masked matrix
    /// * `buckets` - one bucket key per retained row
    pub fn count_by_bucket(matrix: &MaskedMatrix, buckets: &[B]) -> Result<Self> {
        expect_len("bucket assignment", matrix.rows(), buckets.len())?;
        let cols = matrix.cols();
        let mut counts: BTreeMap<B, Vec<u32>> = BTreeMap::new();
        for (doc, bucket) in matrix.matrix().outer_iterator().zip(buckets) {
            let row = counts.entry(bucket.clone()).or_insert_with(|| vec![0; cols]);
            for (col, value) in doc.iter() {
                if *value != 0.0 {
                    row[col] += 1;
                }
            }
        }
        Ok(Self { buckets: counts })
    }

    /// count of column `col` in `bucket` (0 if the bucket is absent)
    #[inline]
    pub fn get(&self, bucket: &B, col: usize) -> u32 {
        self.buckets.get(bucket).and_then(|row| row.get(col).copied()).unwrap_or(0)
    }

    pub fn bucket_keys(&self) -> impl Iterator<Item = &B> + '_ {
        self.buckets.keys()
    }

    /// counts of one term over the buckets, in bucket order
    pub fn series(&self, col: usize) -> Vec<(B, u32)> {
        self.buckets
            .iter()
            .map(|(b, row)| (b.clone(), row.get(col).copied().unwrap_or(0)))
            .collect()
    }

    /// Per-bucket counts keyed by term, zero counts omitted
    pub fn by_term<'a>(&'a self, vocabulary: &'a Vocabulary) -> BTreeMap<&'a B, BTreeMap<&'a str, u32>> {
        self.buckets
            .iter()
            .map(|(b, row)| {
                let terms = row
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| **n > 0)
                    .filter_map(|(col, n)| vocabulary.term(col).map(|t| (t, *n)))
                    .collect();
                (b, terms)
            })
            .collect()
    }
}

/// Year of each retained row, looked up through `retained_rows`
///
/// # Arguments
/// * `dates` - one date per source document (before masking)
pub fn year_buckets(dates: &[NaiveDate], matrix: &MaskedMatrix) -> Result<Vec<i32>> {
    expect_len("dates column", matrix.source_rows(), dates.len())?;
    Ok(matrix.retained_rows().iter().map(|&src| dates[src].year()).collect())
}
