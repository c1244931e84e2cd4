// The semantic term aggregator — the heart of lexfold.
//
// Composes three collaborators: a bag-of-words counter (vocabulary + counts),
// a term embedder, and an agglomerative clusterer. Fitting builds the
// vocabulary, embeds each distinct term once, and clusters the embeddings
// with a cosine distance threshold of `1 - similarity_threshold`. Aggregation
// then folds per-term counts into one row per semantic cluster.
//
// Fit and fit_transform share a single internal fit pass, so fit_transform
// never embeds or clusters twice and is guaranteed to match fit + transform
// on the same documents. transform reuses the fitted vocabulary and cluster
// labels as-is — only counts are recomputed from the new documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::AgglomerativeClusterer;
use crate::embedding::TermEmbedder;
use crate::vectorizer::{CountVectorizer, VectorizerConfig};

/// One aggregated output row: a semantic cluster of vocabulary terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRow {
    /// Cluster label. Carries no meaning beyond grouping; rows are ordered
    /// by ascending label.
    pub label: usize,
    /// Member terms joined by `,`, in vocabulary iteration order.
    pub terms: String,
    /// Sum of the member terms' occurrence counts.
    pub count: u64,
}

/// State produced by a fit pass and reused by later transforms.
///
/// Committed as one unit at the end of a successful fit, so a failed fit
/// leaves the previous state fully intact — no rollback logic needed.
struct FittedState {
    /// The counter holding the fitted vocabulary.
    vectorizer: CountVectorizer,
    /// One embedding per vocabulary term, in vocabulary index order.
    /// Retained for the aggregator's lifetime; never recomputed by transform.
    #[allow(dead_code)]
    embeddings: Vec<Vec<f64>>,
    /// Cluster label per vocabulary term, in vocabulary index order.
    labels: Vec<usize>,
}

/// Groups semantically similar vocabulary terms and aggregates their counts.
///
/// Not designed for concurrent use: fitting mutates instance state, so
/// callers either serialize access or use separate instances.
pub struct SemanticTermAggregator {
    vectorizer_config: VectorizerConfig,
    embedder: Arc<dyn TermEmbedder>,
    similarity_threshold: f64,
    clusterer: AgglomerativeClusterer,
    fitted: Option<FittedState>,
}

impl SemanticTermAggregator {
    /// Build an aggregator around the given embedder.
    ///
    /// `similarity_threshold` must lie in (0, 1]; higher means stricter
    /// merging (fewer terms per cluster). The clusterer's distance threshold
    /// is derived as `1 - similarity_threshold`.
    pub fn new(
        embedder: Arc<dyn TermEmbedder>,
        similarity_threshold: f64,
        vectorizer_config: VectorizerConfig,
    ) -> Result<Self> {
        if similarity_threshold <= 0.0 || similarity_threshold > 1.0 {
            anyhow::bail!(
                "similarity_threshold must be in (0, 1], got {similarity_threshold}"
            );
        }

        // Surface counting-config errors at construction, not at fit time.
        CountVectorizer::new(vectorizer_config.clone())?;

        Ok(Self {
            vectorizer_config,
            embedder,
            similarity_threshold,
            clusterer: AgglomerativeClusterer::new(1.0 - similarity_threshold),
            fitted: None,
        })
    }

    /// The single fit pass shared by `fit` and `fit_transform`.
    ///
    /// Builds a fresh vocabulary, counts the corpus, embeds each distinct
    /// term once, clusters the embeddings, and commits everything but the
    /// counts as instance state. Returns this pass's counts so
    /// `fit_transform` can aggregate without recomputing anything. State is
    /// only written at the very end, so a failed fit leaves the previous
    /// fitted state untouched.
    async fn fit_pass(&mut self, documents: &[String]) -> Result<Vec<u64>> {
        let mut vectorizer = CountVectorizer::new(self.vectorizer_config.clone())?;
        let counts = vectorizer.fit_counts(documents)?;
        let terms = vectorizer.terms().to_vec();

        let embeddings = self.embedder.embed_batch(&terms).await?;
        if embeddings.len() != terms.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} terms",
                embeddings.len(),
                terms.len()
            );
        }

        let labels = self.clusterer.fit_predict(&embeddings);

        let n_clusters = labels.iter().max().map_or(0, |&m| m + 1);
        info!(
            terms = terms.len(),
            clusters = n_clusters,
            similarity_threshold = self.similarity_threshold,
            "Fitted semantic term aggregator"
        );

        self.fitted = Some(FittedState {
            vectorizer,
            embeddings,
            labels,
        });
        Ok(counts)
    }

    /// Fit the aggregator on a corpus: vocabulary, per-term embeddings, and
    /// cluster assignments are computed once and retained for later
    /// `transform` calls. Returns `&mut Self` for chaining.
    pub async fn fit(&mut self, documents: &[String]) -> Result<&mut Self> {
        self.fit_pass(documents).await?;
        Ok(self)
    }

    /// Fit on a corpus and aggregate that same corpus's counts in one pass.
    ///
    /// Equivalent to `fit` followed by `transform` on the same documents,
    /// but reuses the counts and labels already computed during the fit.
    pub async fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<ClusterRow>> {
        let counts = self.fit_pass(documents).await?;
        let fitted = self
            .fitted
            .as_ref()
            .expect("fit_pass commits state on success");
        Ok(aggregate(fitted.vectorizer.terms(), &fitted.labels, &counts))
    }

    /// Aggregate a new document set using the fitted vocabulary and cluster
    /// assignments. Terms outside the fitted vocabulary are ignored; fitted
    /// terms with zero count in the new data are excluded from the output.
    /// Does not mutate fitted state, so an all-unseen document set yields an
    /// empty result rather than an error.
    pub fn transform(&self, documents: &[String]) -> Result<Vec<ClusterRow>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Aggregator is not fitted — call fit() first"))?;

        let counts = fitted.vectorizer.counts(documents)?;
        Ok(aggregate(fitted.vectorizer.terms(), &fitted.labels, &counts))
    }
}

/// Fold per-term counts into one row per cluster.
///
/// Walks terms in vocabulary index order, skipping zero counts, and groups
/// the rest by label. Member terms are joined by `,` in that walk order;
/// counts are summed. Output rows come out in ascending label order.
fn aggregate(terms: &[String], labels: &[usize], counts: &[u64]) -> Vec<ClusterRow> {
    let mut groups: BTreeMap<usize, (Vec<&str>, u64)> = BTreeMap::new();

    for (idx, term) in terms.iter().enumerate() {
        let count = counts[idx];
        if count == 0 {
            continue;
        }
        let entry = groups.entry(labels[idx]).or_default();
        entry.0.push(term);
        entry.1 += count;
    }

    groups
        .into_iter()
        .map(|(label, (members, count))| ClusterRow {
            label,
            terms: members.join(","),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_groups_and_sums() {
        let terms: Vec<String> = ["buy", "shoes", "purchase"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = aggregate(&terms, &[0, 1, 0], &[1, 2, 1]);
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
            ]
        );
    }

    #[test]
    fn test_aggregate_skips_zero_counts() {
        let terms: Vec<String> = ["buy", "shoes"].iter().map(|s| s.to_string()).collect();
        let rows = aggregate(&terms, &[0, 1], &[0, 3]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].terms, "shoes");
        assert_eq!(rows[0].count, 3);
    }

    #[test]
    fn test_aggregate_all_zero_is_empty() {
        let terms: Vec<String> = ["buy"].iter().map(|s| s.to_string()).collect();
        assert!(aggregate(&terms, &[0], &[0]).is_empty());
    }

    #[test]
    fn test_aggregate_rows_ordered_by_label() {
        let terms: Vec<String> = ["cc", "bb", "aa"].iter().map(|s| s.to_string()).collect();
        // Labels deliberately out of vocabulary order.
        let rows = aggregate(&terms, &[2, 0, 1], &[1, 1, 1]);
        let labels: Vec<usize> = rows.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        struct Never;
        #[async_trait::async_trait]
        impl TermEmbedder for Never {
            async fn embed_batch(&self, _terms: &[String]) -> Result<Vec<Vec<f64>>> {
                anyhow::bail!("unused")
            }
        }

        for bad in [0.0, -0.1, 1.5] {
            let result = SemanticTermAggregator::new(
                Arc::new(Never),
                bad,
                VectorizerConfig::default(),
            );
            assert!(result.is_err(), "threshold {bad} should be rejected");
        }
    }
}
