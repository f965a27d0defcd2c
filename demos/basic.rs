use std::sync::Arc;

use chrono::NaiveDate;
use ngram_landscape::{
    CacheKey, DocumentColumns, DocumentWeighting, GraphBuilder, Landscape, LandscapeConfig, LandscapeInput,
    MaskBuilder, MatrixCache, PickMethod, TermDocMatrix, TermFilter, VectorizerConfig, Vocabulary,
};
use tracing_subscriber::EnvFilter;

fn build_matrix() -> ngram_landscape::Result<TermDocMatrix> {
    let vocabulary = Vocabulary::new([
        "gate line",
        "fluid commun",
        "central portion",
        "core network",
        "network",
        "radio access network",
    ])?;
    TermDocMatrix::from_dense_rows(
        &[
            [0.52, 0.31, 0.00, 0.00, 0.10, 0.00],
            [0.40, 0.00, 0.28, 0.00, 0.00, 0.00],
            [0.00, 0.22, 0.00, 0.00, 0.00, 0.00],
            [0.00, 0.00, 0.00, 0.61, 0.35, 0.47],
            [0.00, 0.00, 0.00, 0.44, 0.20, 0.58],
            [0.63, 0.12, 0.30, 0.00, 0.00, 0.00],
        ],
        vocabulary,
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // the matrix is built once per (corpus, vectorizer configuration)
    let mut cache = MatrixCache::new();
    let key = CacheKey::new("demo-patents", VectorizerConfig::default());
    let matrix = cache.get_or_try_insert_with(key.clone(), build_matrix)?;
    let again = cache.get_or_try_insert_with(key, build_matrix)?;
    assert!(Arc::ptr_eq(&matrix, &again));

    let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1).ok_or("bad date");
    let documents = DocumentColumns::new(6)
        .with_dates(vec![d(2012, 3)?, d(2014, 7)?, d(2015, 1)?, d(2018, 9)?, d(2019, 2)?, d(2020, 11)?])?
        .with_citations(vec![12, 3, 0, 40, 7, 1])?;

    // stand-in for an embedding relevance score
    let scorer = |term: &str| if term.starts_with("fluid") { 0.1 } else { 0.9 };
    let term_weights = TermFilter::new(0.5).weights(matrix.vocabulary(), &scorer)?;

    let config = LandscapeConfig::default()
        .pick_method(PickMethod::Sum)
        .top_terms(4)
        .term_counts(true)
        .document_weighting(DocumentWeighting { time: true, citations: true })
        .mask(MaskBuilder::new().unbias_ngrams(true));
    let landscape = Landscape::new(config);

    let input = LandscapeInput::new(&*matrix).documents(&documents).term_weights(&term_weights);
    let report = landscape.run(&input)?;

    println!("{}", report.ranked);
    println!("{:#?}", report.ranked);
    if let Some(counts) = &report.term_counts {
        println!("{:?}", counts.by_term(matrix.vocabulary()));
    }

    let graph = landscape.graph(&report, matrix.vocabulary())?;
    println!("{}", serde_json::to_string_pretty(&graph)?);

    let strict = report.graph(4, matrix.vocabulary(), &GraphBuilder::new().min_link_size(0.2))?;
    println!("{} of {} links at size >= 0.2", strict.links.len(), graph.links.len());

    let snapshot = cache.to_snapshot()?;
    println!("cache snapshot: {} bytes", snapshot.len());
    Ok(())
}
