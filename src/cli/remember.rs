//! CLI `remember` command: form a memory through the dedup/supersede procedure.

use anyhow::{bail, Result};

use mnemos::config::MnemosConfig;
use mnemos::formation::{form, FormationIntent, FormationOutcome};
use mnemos::memory::Category;

pub fn remember(
    config: &MnemosConfig,
    content: &str,
    category: Category,
    agent: Option<String>,
    path: Option<String>,
    confidence: Option<f64>,
) -> Result<()> {
    let (store, _) = super::open_store(config, true)?;

    let mut intent = FormationIntent::new(content, category);
    intent.agent_handle = agent;
    intent.path_scope = path;
    intent.confidence = confidence;

    let result = form(&store, &intent);
    let id = result.memory.as_ref().map(|m| m.id.as_str()).unwrap_or("-");
    match &result.outcome {
        FormationOutcome::Created => println!("Created {id}"),
        FormationOutcome::Deduplicated => println!(
            "Already known as {id} (similarity {:.3})",
            result.similarity.unwrap_or(1.0)
        ),
        FormationOutcome::Superseded { previous_id } => println!(
            "Created {id}, superseding {previous_id} (similarity {:.3})",
            result.similarity.unwrap_or(0.0)
        ),
        FormationOutcome::Failed { reason } => bail!("remember failed: {reason}"),
    }
    Ok(())
}
