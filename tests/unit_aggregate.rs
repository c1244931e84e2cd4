// Integration tests for the semantic term aggregator.
//
// A deterministic stub embedder stands in for the ONNX model: each known
// word gets a hand-placed vector, so cluster structure is fully controlled.
// "buy" and "purchase" are placed within the default merge threshold of each
// other; every other pair is far apart.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use lexfold::aggregate::{ClusterRow, SemanticTermAggregator};
use lexfold::embedding::TermEmbedder;
use lexfold::vectorizer::VectorizerConfig;

/// Embedder with a fixed word -> vector table. Fails on unknown words so a
/// test can't silently embed something it didn't plan for.
struct StubEmbedder {
    vectors: HashMap<String, Vec<f64>>,
}

impl StubEmbedder {
    fn new(entries: &[(&str, Vec<f64>)]) -> Self {
        let vectors = entries
            .iter()
            .map(|(word, v)| (word.to_string(), v.clone()))
            .collect();
        Self { vectors }
    }

    /// The shared fixture: "buy" and "purchase" nearly parallel
    /// (cosine ~0.98), everything else on its own axis.
    fn shopping() -> Self {
        Self::new(&[
            ("buy", vec![1.0, 0.0, 0.0, 0.0]),
            ("purchase", vec![0.98, 0.2, 0.0, 0.0]),
            ("shoes", vec![0.0, 1.0, 0.0, 0.0]),
            ("eat", vec![0.0, 0.0, 1.0, 0.0]),
            ("food", vec![0.0, 0.0, 0.0, 1.0]),
        ])
    }
}

#[async_trait]
impl TermEmbedder for StubEmbedder {
    async fn embed_batch(&self, terms: &[String]) -> Result<Vec<Vec<f64>>> {
        terms
            .iter()
            .map(|t| {
                self.vectors
                    .get(t)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Stub has no vector for term: {t}"))
            })
            .collect()
    }
}

fn docs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

fn aggregator(threshold: f64) -> SemanticTermAggregator {
    SemanticTermAggregator::new(
        Arc::new(StubEmbedder::shopping()),
        threshold,
        VectorizerConfig::default(),
    )
    .unwrap()
}

// ============================================================
// Concrete scenario: buy/purchase merge, everything else alone
// ============================================================

#[tokio::test]
async fn concrete_scenario_merges_buy_and_purchase() {
    let corpus = docs(&["buy shoes", "purchase shoes", "eat food"]);
    let rows = aggregator(0.8).fit_transform(&corpus).await.unwrap();

    assert_eq!(
        rows,
        vec![
            ClusterRow {
                label: 0,
                terms: "buy,purchase".to_string(),
                count: 2
            },
            ClusterRow {
                label: 1,
                terms: "shoes".to_string(),
                count: 2
            },
            ClusterRow {
                label: 2,
                terms: "eat".to_string(),
                count: 1
            },
            ClusterRow {
                label: 3,
                terms: "food".to_string(),
                count: 1
            },
        ]
    );
}

// ============================================================
// Count conservation and partition
// ============================================================

#[tokio::test]
async fn count_conservation() {
    let corpus = docs(&["buy buy shoes food", "purchase shoes", "eat food food"]);
    let rows = aggregator(0.8).fit_transform(&corpus).await.unwrap();

    let total: u64 = rows.iter().map(|r| r.count).sum();
    // 4 + 2 + 3 raw term occurrences
    assert_eq!(total, 9);
}

#[tokio::test]
async fn every_term_in_exactly_one_row() {
    let corpus = docs(&["buy shoes", "purchase shoes", "eat food"]);
    let rows = aggregator(0.8).fit_transform(&corpus).await.unwrap();

    let mut seen: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        for term in row.terms.split(',') {
            *seen.entry(term.to_string()).or_insert(0) += 1;
        }
    }

    for term in ["buy", "purchase", "shoes", "eat", "food"] {
        assert_eq!(seen.get(term), Some(&1), "term {term} not in exactly one row");
    }
}

// ============================================================
// fit + transform vs fit_transform equivalence
// ============================================================

#[tokio::test]
async fn fit_then_transform_matches_fit_transform() {
    let corpus = docs(&["buy shoes", "purchase shoes", "eat food"]);

    let rows_a = aggregator(0.8).fit_transform(&corpus).await.unwrap();

    let mut agg = aggregator(0.8);
    let rows_b = agg.fit(&corpus).await.unwrap().transform(&corpus).unwrap();

    assert_eq!(rows_a, rows_b);
}

// ============================================================
// Transform semantics: reuse of fitted state
// ============================================================

#[tokio::test]
async fn transform_counts_new_data_with_fitted_clusters() {
    let mut agg = aggregator(0.8);
    agg.fit(&docs(&["buy shoes", "purchase shoes", "eat food"]))
        .await
        .unwrap();

    // New data mentions only two fitted terms.
    let rows = agg.transform(&docs(&["purchase food food"])).unwrap();

    assert_eq!(rows.len(), 2);
    // "purchase" keeps the label of the buy/purchase cluster from the fit.
    assert_eq!(rows[0].terms, "purchase");
    assert_eq!(rows[0].count, 1);
    assert_eq!(rows[1].terms, "food");
    assert_eq!(rows[1].count, 2);
}

#[tokio::test]
async fn unseen_terms_only_yields_empty_result() {
    let mut agg = aggregator(0.8);
    agg.fit(&docs(&["buy shoes", "eat food"])).await.unwrap();

    let rows = agg.transform(&docs(&["sell hats quickly"])).unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn transform_does_not_mutate_fitted_state() {
    let corpus = docs(&["buy shoes", "purchase shoes", "eat food"]);
    let mut agg = aggregator(0.8);
    let first = agg.fit_transform(&corpus).await.unwrap();

    // An unrelated transform in between must not disturb the fit.
    let _ = agg.transform(&docs(&["food food"])).unwrap();

    let again = agg.transform(&corpus).unwrap();
    assert_eq!(first, again);
}

#[test]
fn transform_before_fit_fails() {
    let agg = aggregator(0.8);
    let err = agg.transform(&docs(&["buy shoes"])).unwrap_err();
    assert!(
        err.to_string().contains("not fitted"),
        "unexpected error: {err}"
    );
}

// ============================================================
// Threshold behavior
// ============================================================

#[tokio::test]
async fn stricter_threshold_never_fewer_clusters() {
    let corpus = docs(&["buy shoes", "purchase shoes", "eat food"]);

    let loose = aggregator(0.5).fit_transform(&corpus).await.unwrap();
    let strict = aggregator(0.99).fit_transform(&corpus).await.unwrap();

    assert!(
        strict.len() >= loose.len(),
        "raising the similarity threshold reduced clusters: {} -> {}",
        loose.len(),
        strict.len()
    );
}

#[tokio::test]
async fn threshold_just_above_pair_similarity_keeps_them_apart() {
    // cos(buy, purchase) ~ 0.98; at 0.99 they must not merge.
    let corpus = docs(&["buy shoes", "purchase shoes", "eat food"]);
    let rows = aggregator(0.99).fit_transform(&corpus).await.unwrap();
    assert_eq!(rows.len(), 5);
}

// ============================================================
// Error paths
// ============================================================

#[tokio::test]
async fn empty_corpus_fails_at_fit() {
    let mut agg = aggregator(0.8);
    assert!(agg.fit(&[]).await.is_err());
}

#[tokio::test]
async fn empty_vocabulary_fails_at_fit() {
    let mut agg = aggregator(0.8);
    // Single characters fall below the token pattern's length floor.
    assert!(agg.fit(&docs(&["a b", "c"])).await.is_err());
}

#[tokio::test]
async fn failed_fit_leaves_previous_state_intact() {
    let corpus = docs(&["buy shoes", "eat food"]);
    let mut agg = aggregator(0.8);
    let before = agg.fit_transform(&corpus).await.unwrap();

    // This fit fails at the embedding step (unknown word). Fitted state is
    // committed as one unit at the end of a successful pass, so the earlier
    // fit must still be fully usable.
    assert!(agg.fit(&docs(&["unknownword everywhere"])).await.is_err());

    let after = agg.transform(&corpus).unwrap();
    assert_eq!(before, after);
}
