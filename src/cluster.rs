// Agglomerative clustering over cosine distance with complete linkage.
//
// Groups term embeddings into semantic buckets: start with every vector as
// its own cluster, repeatedly merge the closest pair, and stop once the
// closest remaining pair is at or beyond the distance threshold. Complete
// linkage means a merge only happens when *every* pair of members across the
// two clusters is within the threshold — a strict criterion that keeps
// clusters tight, which is what we want for near-synonym grouping.
//
// The number of clusters is determined by the data and the threshold, never
// specified in advance.

use tracing::debug;

/// Threshold-based agglomerative clusterer.
///
/// `distance_threshold` is a cosine distance: two clusters merge while their
/// complete-linkage distance is strictly below it. The aggregator derives it
/// as `1 - similarity_threshold`.
pub struct AgglomerativeClusterer {
    distance_threshold: f64,
}

impl AgglomerativeClusterer {
    pub fn new(distance_threshold: f64) -> Self {
        Self { distance_threshold }
    }

    /// Cluster the given vectors and return one label per input vector.
    ///
    /// Labels are assigned 0..k in order of each cluster's minimum member
    /// index — deterministic for a given input, but carrying no meaning
    /// beyond grouping.
    pub fn fit_predict(&self, embeddings: &[Vec<f64>]) -> Vec<usize> {
        let n = embeddings.len();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![0];
        }

        // Pairwise cosine distances between the original points. Complete
        // linkage between clusters is derived from these, so the matrix is
        // computed once and never updated.
        let mut dist = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = cosine_distance(&embeddings[i], &embeddings[j]);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }

        // Active clusters as member index lists. Merging is O(n^3) worst
        // case, fine for vocabulary-sized inputs.
        let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for a in 0..clusters.len() {
                for b in (a + 1)..clusters.len() {
                    let d = complete_linkage(&clusters[a], &clusters[b], &dist);
                    if best.map_or(true, |(_, _, bd)| d < bd) {
                        best = Some((a, b, d));
                    }
                }
            }

            match best {
                Some((a, b, d)) if d < self.distance_threshold => {
                    let merged = clusters.swap_remove(b);
                    clusters[a].extend(merged);
                }
                _ => break,
            }
        }

        // Number clusters by their minimum member index.
        clusters.sort_by_key(|members| members.iter().copied().min().unwrap_or(usize::MAX));

        let mut labels = vec![0usize; n];
        for (label, members) in clusters.iter().enumerate() {
            for &idx in members {
                labels[idx] = label;
            }
        }

        debug!(
            points = n,
            clusters = clusters.len(),
            threshold = self.distance_threshold,
            "Agglomerative clustering complete"
        );

        labels
    }
}

/// Maximum pairwise distance between any two members of the two clusters.
fn complete_linkage(a: &[usize], b: &[usize], dist: &[Vec<f64>]) -> f64 {
    let mut max = 0.0f64;
    for &i in a {
        for &j in b {
            if dist[i][j] > max {
                max = dist[i][j];
            }
        }
    }
    max
}

/// Cosine distance: 1 - cosine similarity. Ranges over [0, 2]; a
/// zero-magnitude vector is treated as maximally distant from everything.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        2.0
    } else {
        1.0 - dot / denom
    }
}
