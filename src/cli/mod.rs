pub mod detect;
pub mod forget;
pub mod inspect;
pub mod re_embed;
pub mod remember;
pub mod search;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use mnemos::config::{EmbeddingConfig, MnemosConfig};
use mnemos::db::repository::SqliteRepository;
use mnemos::embedding::{self, Embedder};
use mnemos::memory::MemoryStore;

const HF_BASE_URL: &str = "https://huggingface.co/sentence-transformers";

/// Open the configured database and, if asked, the configured embedder.
///
/// Blocking: loads the ONNX model for the local provider.
pub fn open_store(
    config: &MnemosConfig,
    with_embedder: bool,
) -> Result<(MemoryStore, Arc<SqliteRepository>)> {
    let repo = Arc::new(
        SqliteRepository::open(config.resolved_db_path()).context("failed to open database")?,
    );
    let embedder: Option<Arc<dyn Embedder>> = if with_embedder {
        Some(embedding::create_embedder(&config.embedding)?)
    } else {
        None
    };
    Ok((MemoryStore::new(repo.clone(), embedder), repo))
}

/// Trim `content` to `max` characters for one-line display.
pub fn preview(content: &str, max: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let cache_dir = mnemos::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    let files = [
        ("model.onnx", "onnx/model.onnx"),
        ("tokenizer.json", "tokenizer.json"),
    ];

    for (name, remote_path) in files {
        let dest = cache_dir.join(name);
        if dest.exists() {
            println!("{name} already exists at {}", dest.display());
            continue;
        }
        let url = format!("{HF_BASE_URL}/{}/resolve/main/{remote_path}", config.model);
        println!("Downloading {name} for {}...", config.model);
        download_file(&url, &dest).await?;
        println!("{name} saved to {}", dest.display());
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
