//! CLI `re-embed` command: embed memories stored without a vector.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::time::Duration;

use mnemos::config::MnemosConfig;

const BATCH_SIZE: usize = 32;

pub fn re_embed(config: &MnemosConfig) -> Result<()> {
    let (store, repo) = super::open_store(config, true)?;
    let model_id = match store.embedder() {
        Some(e) => e.model_id(),
        None => anyhow::bail!("no embedder configured"),
    };

    println!("Embedding memories without a vector using '{model_id}'...");
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));

    let embedded = store
        .embed_missing(BATCH_SIZE)
        .context("embedding batch failed")?;
    pb.finish_and_clear();

    repo.set_embedding_model(&model_id)?;

    println!("Embedded {embedded} memories.");
    Ok(())
}
