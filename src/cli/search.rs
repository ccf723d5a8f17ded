use anyhow::Result;

use mnemos::config::MnemosConfig;
use mnemos::memory::{Category, SearchOptions};

/// Run a semantic search from the terminal.
pub fn search(
    config: &MnemosConfig,
    query: &str,
    agent: Option<String>,
    path: Option<String>,
    categories: Vec<Category>,
    limit: Option<usize>,
    threshold: Option<f32>,
) -> Result<()> {
    let (store, _) = super::open_store(config, true)?;

    let options = SearchOptions {
        agent_handle: agent,
        path_scope: path,
        threshold: threshold.unwrap_or(config.search.threshold),
        limit: limit.unwrap_or(config.search.limit),
        categories: (!categories.is_empty()).then_some(categories),
        track_access: true,
    };

    let results = store.search(query, &options)?;
    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let m = &result.memory;
        println!(
            "  {}. [{}] {} (similarity: {:.4}, confidence: {:.2})",
            i + 1,
            m.category,
            m.id,
            result.similarity,
            m.confidence,
        );
        println!("     {}", super::preview(&m.content, 120));
        println!();
    }

    Ok(())
}
