// Term embedder trait — the swap-ready abstraction.
//
// The default implementation runs a local ONNX sentence transformer. The
// trait exists so the aggregator never depends on a concrete model: tests
// substitute a deterministic stub, and a remote embedding API could slot in
// later without touching the pipeline.

use anyhow::Result;
use async_trait::async_trait;

/// Maps vocabulary terms to fixed-length dense vectors.
///
/// Implementations must be async because inference is an opaque blocking
/// batch call (offloaded via spawn_blocking) or a remote API call.
#[async_trait]
pub trait TermEmbedder: Send + Sync {
    /// Embed a batch of terms, returning one vector per term in input order.
    /// All returned vectors must have the same dimension.
    async fn embed_batch(&self, terms: &[String]) -> Result<Vec<Vec<f64>>>;
}
