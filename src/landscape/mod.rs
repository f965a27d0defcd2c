pub mod matrix;
pub mod weights;
pub mod mask;
pub mod reduce;
pub mod evaluate;
pub mod cache;

use num::Num;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    config::LandscapeConfig,
    error::{expect_len, Result},
    landscape::{
        evaluate::{
            counts::{year_buckets, TermCounts},
            graph::{GraphBuilder, TermGraph},
            rank::{RankedTerm, RankedTerms, TermRanker},
        },
        matrix::{TermDocMatrix, Vocabulary},
        reduce::{MaskedMatrix, MatrixReducer},
        weights::{documents::DocumentColumns, WeightVector},
    },
};

/// One landscape run's input
/// Borrowed views only; a run never mutates its input.
#[derive(Debug, Clone, Copy)]
pub struct LandscapeInput<'a, N = f64>
where
    N: Num + Copy + Into<f64>,
{
    pub matrix: &'a TermDocMatrix<N>,
    /// per-document metadata used by the document filter and weighting
    pub documents: Option<&'a DocumentColumns>,
    /// extra caller-side document weights, multiplied in last
    pub doc_weights: Option<&'a WeightVector>,
    /// term weights (e.g. embedding filter output), uniform when `None`
    pub term_weights: Option<&'a WeightVector>,
}

impl<'a, N> LandscapeInput<'a, N>
where
    N: Num + Copy + Into<f64>,
{
    pub fn new(matrix: &'a TermDocMatrix<N>) -> Self {
        Self { matrix, documents: None, doc_weights: None, term_weights: None }
    }

    pub fn documents(mut self, documents: &'a DocumentColumns) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn doc_weights(mut self, weights: &'a WeightVector) -> Self {
        self.doc_weights = Some(weights);
        self
    }

    pub fn term_weights(mut self, weights: &'a WeightVector) -> Self {
        self.term_weights = Some(weights);
        self
    }
}

/// Landscape Report
/// Result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct LandscapeReport {
    /// every term with a positive score, best first
    pub ranked: RankedTerms,
    /// masked matrix the ranking was computed from
    #[serde(skip)]
    pub masked: MaskedMatrix,
    /// per-year document counts, when enabled and the input has dates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_counts: Option<TermCounts<i32>>,
}

impl LandscapeReport {
    #[inline]
    pub fn top(&self, n: usize) -> &[RankedTerm] {
        self.ranked.top(n)
    }

    /// Co-occurrence graph over the top `n` terms
    ///
    /// # Arguments
    /// * `n` - number of top terms (fewer if fewer were ranked)
    /// * `vocabulary` - vocabulary of the input matrix
    /// * `builder` - graph options
    pub fn graph(&self, n: usize, vocabulary: &Vocabulary, builder: &GraphBuilder) -> Result<TermGraph> {
        builder.build(self.top(n), &self.masked, vocabulary)
    }
}

/// Landscape
/// Document weights -> mask -> reduction -> ranking, with optional per-year
/// term counts.
///
/// # Example
/// ```
/// use ngram_landscape::{Landscape, LandscapeConfig, LandscapeInput, TermDocMatrix, Vocabulary};
///
/// let vocab = Vocabulary::new(["gate line", "fluid commun"]).unwrap();
/// let matrix = TermDocMatrix::from_dense_rows(&[[0.5, 0.1], [0.2, 0.0]], vocab).unwrap();
/// let report = Landscape::new(LandscapeConfig::default())
///     .run(&LandscapeInput::new(&matrix))
///     .unwrap();
/// assert_eq!(report.top(1)[0].term, "gate line");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Landscape {
    config: LandscapeConfig,
}

impl Landscape {
    pub fn new(config: LandscapeConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &LandscapeConfig {
        &self.config
    }

    /// Run the pipeline once
    ///
    /// # Errors
    /// Any error of the stages: `DimensionMismatch`, `MissingColumn`,
    /// `InvalidWeight`, `EmptyVocabulary`, `EmptyResult`.
    #[instrument(skip_all, fields(documents = input.matrix.rows(), terms = input.matrix.cols()))]
    pub fn run<N>(&self, input: &LandscapeInput<'_, N>) -> Result<LandscapeReport>
    where
        N: Num + Copy + Into<f64>,
    {
        let matrix = input.matrix;
        let doc_weights = self.document_weights(input)?;
        debug!(kept = doc_weights.count_positive(), "document weights ready");

        let mask = self.config.mask.build(matrix, &doc_weights, input.term_weights)?;
        let masked = MatrixReducer::apply(matrix, &mask)?;
        let ranked = TermRanker::extract(&masked, matrix.vocabulary(), self.config.pick_method)?;

        let term_counts = match (self.config.term_counts, input.documents.and_then(|d| d.dates())) {
            (true, Some(dates)) => {
                let years = year_buckets(dates, &masked)?;
                Some(TermCounts::count_by_bucket(&masked, &years)?)
            }
            (true, None) => {
                debug!("no dates column, term counts skipped");
                None
            }
            (false, _) => None,
        };

        info!(ranked = ranked.len(), "landscape run finished");
        Ok(LandscapeReport { ranked, masked, term_counts })
    }

    /// Run independent inputs in parallel
    /// Results keep the input order; one failing input does not affect the others.
    pub fn run_batch<N>(&self, inputs: &[LandscapeInput<'_, N>]) -> Vec<Result<LandscapeReport>>
    where
        N: Num + Copy + Into<f64> + Send + Sync,
    {
        inputs.par_iter().map(|input| self.run(input)).collect()
    }

    /// Graph over the configured number of top terms with the configured options
    pub fn graph(&self, report: &LandscapeReport, vocabulary: &Vocabulary) -> Result<TermGraph> {
        report.graph(self.config.top_terms, vocabulary, &self.config.graph)
    }

    /// filter ⊙ weighting ⊙ caller weights
    fn document_weights<N>(&self, input: &LandscapeInput<'_, N>) -> Result<WeightVector>
    where
        N: Num + Copy + Into<f64>,
    {
        let rows = input.matrix.rows();
        // without metadata, any configured criterion fails with MissingColumn
        let bare;
        let documents = match input.documents {
            Some(documents) => {
                expect_len("document columns", rows, documents.len())?;
                documents
            }
            None => {
                bare = DocumentColumns::new(rows);
                &bare
            }
        };

        let mut weights = self.config.document_weighting.weights(documents)?;
        if !self.config.document_filter.is_empty() {
            weights = weights.combine(&self.config.document_filter.weights(documents)?)?;
        }
        if let Some(extra) = input.doc_weights {
            expect_len("document weights", rows, extra.len())?;
            weights = weights.combine(extra)?;
        }
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        error::LandscapeError,
        landscape::{
            evaluate::rank::PickMethod,
            weights::documents::{DocumentFilter, DocumentWeighting},
        },
    };

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 6, 1).unwrap()
    }

    fn corpus() -> (TermDocMatrix, DocumentColumns) {
        let vocab = Vocabulary::new(["gate line", "fluid commun", "core network"]).unwrap();
        let m = TermDocMatrix::from_dense_rows(
            &[[0.5, 0.2, 0.0], [0.1, 0.0, 0.8], [0.0, 0.4, 0.3], [0.3, 0.3, 0.0]],
            vocab,
        )
        .unwrap();
        let docs = DocumentColumns::new(4)
            .with_dates(vec![date(2015), date(2016), date(2019), date(2020)])
            .unwrap()
            .with_category("wireless", vec![false, true, true, false])
            .unwrap();
        (m, docs)
    }

    #[test]
    fn default_run_sums_scores() {
        let (m, _) = corpus();
        let report = Landscape::default().run(&LandscapeInput::new(&m)).unwrap();
        let pairs = report.ranked.clone().into_pairs();
        assert_eq!(pairs[0].0, "core network");
        assert!((pairs[0].1 - 1.1).abs() < 1e-12);
        assert_eq!(report.masked.rows(), 4);
        assert!(report.term_counts.is_none());
    }

    #[test]
    fn filter_and_caller_weights_combine() {
        let (m, docs) = corpus();
        let config = LandscapeConfig::default().document_filter(DocumentFilter {
            columns: vec!["wireless".into()],
            ..Default::default()
        });
        let extra = WeightVector::from_vec(vec![1.0, 0.0, 1.0, 1.0]).unwrap();
        let report = Landscape::new(config)
            .run(&LandscapeInput::new(&m).documents(&docs).doc_weights(&extra))
            .unwrap();
        // only document 2 survives: filtered by category, then zeroed by caller
        assert_eq!(report.masked.retained_rows(), &[2]);
        assert_eq!(report.ranked.top(1)[0].term, "fluid commun");
    }

    #[test]
    fn term_counts_by_year() {
        let (m, docs) = corpus();
        let config = LandscapeConfig::default().term_counts(true).document_filter(DocumentFilter {
            date_from: Some(date(2016)),
            ..Default::default()
        });
        let report = Landscape::new(config).run(&LandscapeInput::new(&m).documents(&docs)).unwrap();
        let counts = report.term_counts.unwrap();
        assert_eq!(counts.bucket_keys().copied().collect::<Vec<_>>(), vec![2016, 2019, 2020]);
        assert_eq!(counts.buckets[&2016], vec![1, 0, 1]);

        // no dates: counts are skipped, not an error
        let report = Landscape::new(LandscapeConfig::default().term_counts(true))
            .run(&LandscapeInput::new(&m))
            .unwrap();
        assert!(report.term_counts.is_none());
    }

    #[test]
    fn weighting_without_metadata_fails() {
        let (m, _) = corpus();
        let config = LandscapeConfig::default().document_weighting(DocumentWeighting { time: true, citations: false });
        let err = Landscape::new(config).run(&LandscapeInput::new(&m)).unwrap_err();
        assert!(matches!(err, LandscapeError::MissingColumn(c) if c == "dates"));
    }

    #[test]
    fn metadata_length_is_checked() {
        let (m, _) = corpus();
        let docs = DocumentColumns::new(3);
        let err = Landscape::default().run(&LandscapeInput::new(&m).documents(&docs)).unwrap_err();
        assert!(matches!(err, LandscapeError::DimensionMismatch { what: "document columns", .. }));
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let (m, _) = corpus();
        let zero_terms = WeightVector::from_vec(vec![0.0; 3]).unwrap();
        let inputs = [
            LandscapeInput::new(&m),
            LandscapeInput::new(&m).term_weights(&zero_terms),
            LandscapeInput::new(&m),
        ];
        let landscape = Landscape::new(LandscapeConfig::default().pick_method(PickMethod::Max));
        let results = landscape.run_batch(&inputs);
        assert_eq!(results.len(), 3);
        assert!(matches!(results[1], Err(LandscapeError::EmptyVocabulary { .. })));
        let first = results[0].as_ref().unwrap();
        let last = results[2].as_ref().unwrap();
        assert_eq!(first.ranked, last.ranked);
        assert_eq!(first.ranked, landscape.run(&inputs[0]).unwrap().ranked);
    }

    #[test]
    fn graph_uses_configured_top_terms() {
        let (m, _) = corpus();
        let landscape = Landscape::new(LandscapeConfig::default().top_terms(2));
        let report = landscape.run(&LandscapeInput::new(&m)).unwrap();
        // the report is not truncated, only the graph is
        assert_eq!(report.ranked.len(), 3);
        let graph = landscape.graph(&report, m.vocabulary()).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);

        let all = report.graph(10, m.vocabulary(), &GraphBuilder::new()).unwrap();
        assert_eq!(all.links.len(), 3);
    }
}
