// Model download helper for the sentence embedding model.
//
// Pulls `model.onnx` and `tokenizer.json` for a sentence-transformers model
// from HuggingFace. Files are stored in a platform-appropriate directory
// (~/.local/share/lexfold/models/<model-name>/ on Linux) so they persist
// across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace organization hosting the sentence transformer models.
const HF_BASE_URL: &str = "https://huggingface.co/sentence-transformers";

/// Path of the ONNX export within a sentence-transformers repo.
const MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default base directory for storing model files.
/// Uses the platform data directory: ~/.local/share/lexfold/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexfold")
        .join("models")
}

/// Subdirectory of `base` holding the named model's files.
pub fn model_dir_for(base: &Path, model_name: &str) -> PathBuf {
    base.join(model_name)
}

/// Check whether both required model files exist for the named model.
pub fn model_files_present(base: &Path, model_name: &str) -> bool {
    let dir = model_dir_for(base, model_name);
    dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
}

/// Download the named embedding model (ONNX export + tokenizer).
///
/// Shows a progress bar for the model file. Skips files that already exist.
/// Creates directories as needed.
pub async fn download_model(base: &Path, model_name: &str) -> Result<()> {
    let dir = model_dir_for(base, model_name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nSentence embedding model ({model_name}):");

    let repo_url = format!("{HF_BASE_URL}/{model_name}/resolve/main");

    let tokenizer_path = dir.join("tokenizer.json");
    if tokenizer_path.exists() {
        info!("Embedding tokenizer already exists, skipping");
        println!("  tokenizer.json (already exists)");
    } else {
        println!("  Downloading tokenizer.json...");
        download_file(&format!("{repo_url}/{TOKENIZER_FILE}"), &tokenizer_path, false).await?;
    }

    let model_path = dir.join("model.onnx");
    if model_path.exists() {
        info!("Embedding model already exists, skipping");
        println!("  model.onnx (already exists)");
    } else {
        println!("  Downloading model.onnx (~90 MB)...");
        download_file(&format!("{repo_url}/{MODEL_FILE}"), &model_path, true).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let total_size = response.content_length();

    let pb = if show_progress {
        let pb = if let Some(size) = total_size {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}
