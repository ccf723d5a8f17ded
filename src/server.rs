//! MCP server initialization for the stdio transport.
//!
//! [`serve_stdio`] wires the database, embedder, formation pipeline, and MCP tool
//! handler into a running server, then drains the formation queue on exit.

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;
use std::time::Duration;

use mnemos::config::MnemosConfig;
use mnemos::db::repository::SqliteRepository;
use mnemos::embedding::Embedder;
use mnemos::formation::{FormationOutcome, FormationPipeline, FormationResult};
use mnemos::memory::MemoryStore;

use crate::tools::MnemosTools;

/// Open the database and embedder, and check that stored vectors came from the
/// configured model. Blocking.
fn setup_store(config: &MnemosConfig) -> Result<MemoryStore> {
    let db_path = config.resolved_db_path();
    let repo = Arc::new(SqliteRepository::open(&db_path)?);
    tracing::info!(db = %db_path.display(), "database ready");

    let embedder: Arc<dyn Embedder> = mnemos::embedding::create_embedder(&config.embedding)?;
    let model_id = embedder.model_id();
    tracing::info!(model = %model_id, dimension = embedder.dimension(), "embedder ready");

    match repo.embedding_model()? {
        Some(stored) if stored != model_id => {
            tracing::warn!(
                stored = %stored,
                configured = %model_id,
                "embedding model changed, existing vectors are not comparable; run `mnemos re-embed` after clearing them"
            );
        }
        Some(_) => {}
        None => repo.set_embedding_model(&model_id)?,
    }

    Ok(MemoryStore::new(repo, Some(embedder)))
}

fn log_result(result: &FormationResult) {
    match &result.outcome {
        FormationOutcome::Failed { reason } => {
            tracing::warn!(request = %result.intent_id, reason = %reason, "formation failed")
        }
        outcome => tracing::debug!(
            request = %result.intent_id,
            outcome = ?outcome,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "formation finished"
        ),
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: MnemosConfig) -> Result<()> {
    tracing::info!("starting mnemos MCP server on stdio");

    let setup_config = config.clone();
    let store = tokio::task::spawn_blocking(move || setup_store(&setup_config))
        .await
        .context("setup task failed")??;

    let pipeline = Arc::new(FormationPipeline::start(
        store,
        config.formation.queue_capacity,
    ));
    pipeline.subscribe(log_result);

    let grace = Duration::from_millis(config.formation.shutdown_grace_ms);
    let tools = MnemosTools::new(Arc::clone(&pipeline), Arc::new(config));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP client disconnected");

    if !pipeline.shutdown(grace).await {
        tracing::warn!(
            outstanding = pipeline.pending_count(),
            "formation queue not fully drained"
        );
    }
    tracing::info!("MCP server shut down");

    Ok(())
}
