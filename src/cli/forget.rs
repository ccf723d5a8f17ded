//! CLI `forget` and `clear` commands.

use anyhow::{bail, Result};
use std::io::Write;

use mnemos::config::MnemosConfig;

/// Soft-delete one memory, or hard-delete it with `purge`.
pub fn forget(config: &MnemosConfig, id: &str, purge: bool) -> Result<()> {
    let (store, _) = super::open_store(config, false)?;
    let memory = super::inspect::resolve(&store, id)?;

    if purge {
        store.delete(&memory.id)?;
        println!("Deleted {}", memory.id);
    } else {
        store.forget(&memory.id)?;
        println!("Forgot {}", memory.id);
    }
    Ok(())
}

/// Forget every active memory for one agent, or all of them, after confirmation.
pub fn clear(config: &MnemosConfig, agent: Option<&str>, yes: bool) -> Result<()> {
    let (store, _) = super::open_store(config, false)?;
    let active = store.count(agent)?;
    if active == 0 {
        println!("Nothing to clear.");
        return Ok(());
    }

    if !yes {
        match agent {
            Some(a) => println!("This will forget {active} active memories for agent '{a}'."),
            None => println!("This will forget ALL {active} active memories."),
        }
        println!("Database: {}", config.resolved_db_path().display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "YES" {
            bail!("clear cancelled");
        }
    }

    let cleared = store.clear(agent)?;
    println!("Forgot {cleared} memories.");
    Ok(())
}
