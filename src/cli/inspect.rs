//! CLI `get` and `list` commands.

use anyhow::Result;

use mnemos::config::MnemosConfig;
use mnemos::error::MemoryError;
use mnemos::memory::{ListOptions, Memory, MemoryStore};

/// Look up a memory by full id, falling back to a unique prefix of an active one.
pub fn resolve(store: &MemoryStore, id: &str) -> Result<Memory> {
    match store.get(id) {
        Ok(m) => Ok(m),
        Err(MemoryError::NotFound(_)) => Ok(store.get_by_prefix(id)?),
        Err(e) => Err(e.into()),
    }
}

/// Display full details for a single memory, including its audit log.
pub fn get(config: &MnemosConfig, id: &str) -> Result<()> {
    let (store, repo) = super::open_store(config, false)?;
    let m = resolve(&store, id)?;

    println!("Memory: {}", m.id);
    println!("{}", "=".repeat(50));
    println!("  Category:       {}", m.category);
    println!("  Status:         {}", m.status);
    println!("  Confidence:     {:.2}", m.confidence);
    if let Some(ref agent) = m.agent_handle {
        println!("  Agent:          {agent}");
    }
    if let Some(ref path) = m.path_scope {
        println!("  Path:           {path}");
    }
    println!("  Access count:   {}", m.access_count);
    if let Some(ref la) = m.last_accessed_at {
        println!("  Last accessed:  {la}");
    }
    println!("  Created:        {}", m.created_at);
    println!("  Updated:        {}", m.updated_at);
    println!(
        "  Embedded:       {}",
        if m.embedding.is_some() { "yes" } else { "no" }
    );
    if let Some(ref s) = m.supersedes_id {
        println!("  Supersedes:     {s}");
    }
    if let Some(ref sb) = m.superseded_by_id {
        println!("  Superseded by:  {sb}");
    }
    if let Some(ref reason) = m.supersede_reason {
        println!("  Reason:         {reason}");
    }
    println!();
    println!("Content:");
    println!("  {}", m.content);

    let log = repo.audit_log(&m.id)?;
    if !log.is_empty() {
        println!();
        println!("Audit Log:");
        for entry in log {
            let details = entry
                .details
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            println!("  {} [{}] {}", entry.created_at, entry.operation, details);
        }
    }

    Ok(())
}

/// List memories, newest first.
pub fn list(config: &MnemosConfig, options: &ListOptions) -> Result<()> {
    let (store, _) = super::open_store(config, false)?;
    let memories = store.list(options)?;

    if memories.is_empty() {
        println!("No memories.");
        return Ok(());
    }

    for m in &memories {
        println!(
            "  {} [{}] ({}) {}",
            m.id,
            m.category,
            m.status,
            super::preview(&m.content, 80)
        );
    }
    println!(
        "\n{} shown, {} active",
        memories.len(),
        store.count(options.agent_handle.as_deref())?
    );
    Ok(())
}
