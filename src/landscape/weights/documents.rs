//! Document-level weights derived from corpus columns.
//!
//! The corpus provider hands over the columns it loaded (dates, citation counts,
//! category flags); the filter and weighting here turn them into `WeightVector`s
//! with one entry per document.

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::{expect_len, LandscapeError, Result}, landscape::weights::WeightVector};

/// Column view of the document table, one entry per document (row of the term-document matrix)
#[derive(Debug, Clone, Default)]
pub struct DocumentColumns {
    len: usize,
    dates: Option<Vec<NaiveDate>>,
    citations: Option<Vec<u32>>,
    categories: IndexMap<String, Vec<bool>>,
}

impl DocumentColumns {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        expect_len("dates column", self.len, dates.len())?;
        self.dates = Some(dates);
        Ok(self)
    }

    pub fn with_citations(mut self, citations: Vec<u32>) -> Result<Self> {
        expect_len("citations column", self.len, citations.len())?;
        self.citations = Some(citations);
        Ok(self)
    }

    /// Add a boolean category column (e.g. CPC class membership)
    pub fn with_category(mut self, name: impl Into<String>, flags: Vec<bool>) -> Result<Self> {
        expect_len("category column", self.len, flags.len())?;
        self.categories.insert(name.into(), flags);
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    #[inline]
    pub fn citations(&self) -> Option<&[u32]> {
        self.citations.as_deref()
    }

    #[inline]
    pub fn category(&self, name: &str) -> Option<&[bool]> {
        self.categories.get(name).map(Vec::as_slice)
    }
}

/// How several category columns are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    /// keep a document flagged in at least one column
    #[default]
    Any,
    /// keep a document flagged in every column
    All,
}

/// Document filter
/// Produces 0/1 weights: 1 keeps a document, 0 removes it from the analysis.
/// Criteria combine with AND; no criteria keeps every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    /// inclusive lower date bound
    pub date_from: Option<NaiveDate>,
    /// inclusive upper date bound
    pub date_to: Option<NaiveDate>,
    /// category columns to filter on
    pub columns: Vec<String>,
    pub column_mode: ColumnMode,
}

impl DocumentFilter {
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none() && self.columns.is_empty()
    }

    /// # Errors
    /// - `MissingColumn` if a date bound is set without a dates column, or a category column is absent
    pub fn weights(&self, docs: &DocumentColumns) -> Result<WeightVector> {
        let mut keep = vec![true; docs.len()];

        if self.date_from.is_some() || self.date_to.is_some() {
            let dates = docs.dates().ok_or_else(|| LandscapeError::MissingColumn("dates".to_string()))?;
            for (k, date) in keep.iter_mut().zip(dates) {
                let after_from = self.date_from.map_or(true, |from| *date >= from);
                let before_to = self.date_to.map_or(true, |to| *date <= to);
                *k &= after_from && before_to;
            }
        }

        if !self.columns.is_empty() {
            let flags = self
                .columns
                .iter()
                .map(|name| docs.category(name).ok_or_else(|| LandscapeError::MissingColumn(name.clone())))
                .collect::<Result<Vec<&[bool]>>>()?;
            for (row, k) in keep.iter_mut().enumerate() {
                let hit = match self.column_mode {
                    ColumnMode::Any => flags.iter().any(|col| col[row]),
                    ColumnMode::All => flags.iter().all(|col| col[row]),
                };
                *k &= hit;
            }
        }

        let kept = keep.iter().filter(|k| **k).count();
        debug!(kept, total = docs.len(), "document filter applied");
        WeightVector::from_vec(keep.into_iter().map(|k| if k { 1.0 } else { 0.0 }).collect())
    }
}

/// Document weighting
/// Multiplicative per-document importance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentWeighting {
    /// favour recent documents
    /// w = 1 + (date - min_date) / (max_date - min_date)
    pub time: bool,
    /// favour cited documents
    /// w = 1 + ln(1 + c) / ln(1 + max_c)
    pub citations: bool,
}

impl DocumentWeighting {
    pub fn weights(&self, docs: &DocumentColumns) -> Result<WeightVector> {
        let mut weights = WeightVector::uniform(docs.len());
        if self.time {
            let dates = docs.dates().ok_or_else(|| LandscapeError::MissingColumn("dates".to_string()))?;
            weights = weights.combine(&recency_weights(dates))?;
        }
        if self.citations {
            let citations = docs
                .citations()
                .ok_or_else(|| LandscapeError::MissingColumn("citations".to_string()))?;
            weights = weights.combine(&citation_weights(citations))?;
        }
        Ok(weights)
    }
}

/// linear in the date, 1.0 for the oldest and 2.0 for the newest document
fn recency_weights(dates: &[NaiveDate]) -> WeightVector {
    let days: Vec<i32> = dates.iter().map(|d| d.num_days_from_ce()).collect();
    let (min, max) = match (days.iter().min(), days.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return WeightVector::uniform(0),
    };
    let span = (max - min) as f64;
    let weights = days
        .iter()
        .map(|d| if span > 0.0 { 1.0 + (d - min) as f64 / span } else { 1.0 })
        .collect();
    WeightVector { weights }
}

/// log-scaled citations in 1.0..=2.0
fn citation_weights(citations: &[u32]) -> WeightVector {
    let max = citations.iter().copied().max().unwrap_or(0);
    let denom = (1.0 + max as f64).ln();
    let weights = citations
        .iter()
        .map(|&c| if max > 0 { 1.0 + (1.0 + c as f64).ln() / denom } else { 1.0 })
        .collect();
    WeightVector { weights }
}
