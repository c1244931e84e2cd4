use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Base directory containing downloaded embedding models.
    pub model_dir: PathBuf,
    /// Name of the sentence-transformers model to use
    /// (subdirectory of model_dir; also the HuggingFace repo name).
    pub model_name: String,
    /// Cosine similarity above which two terms may share a cluster.
    pub similarity_threshold: f64,
}

/// Default embedding model when LEXFOLD_MODEL is unset.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every field has a default; an unparseable or out-of-range
    /// LEXFOLD_SIMILARITY_THRESHOLD is a hard error, not a silent fallback.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("LEXFOLD_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::embedding::download::default_model_dir());

        let model_name =
            env::var("LEXFOLD_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let similarity_threshold = match env::var("LEXFOLD_SIMILARITY_THRESHOLD") {
            Ok(raw) => raw
                .parse::<f64>()
                .with_context(|| format!("Invalid LEXFOLD_SIMILARITY_THRESHOLD: {raw}"))?,
            Err(_) => 0.8,
        };
        if similarity_threshold <= 0.0 || similarity_threshold > 1.0 {
            anyhow::bail!(
                "LEXFOLD_SIMILARITY_THRESHOLD must be in (0, 1], got {similarity_threshold}"
            );
        }

        Ok(Self {
            model_dir,
            model_name,
            similarity_threshold,
        })
    }

    /// Check that the embedding model files are on disk.
    /// Call this before any operation that needs to embed terms.
    pub fn require_model(&self) -> Result<()> {
        if !crate::embedding::download::model_files_present(&self.model_dir, &self.model_name) {
            anyhow::bail!(
                "Embedding model files not found in {}\n\
                 Run `lexfold download-model` to download {}.",
                self.model_dir.display(),
                self.model_name
            );
        }
        Ok(())
    }
}
