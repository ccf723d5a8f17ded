pub mod forget_memory;
pub mod list_memories;
pub mod recall;
pub mod remember;

use forget_memory::ForgetMemoryParams;
use list_memories::ListMemoriesParams;
use recall::RecallParams;
use remember::RememberParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use mnemos::config::MnemosConfig;
use mnemos::formation::{FormationIntent, FormationPipeline};
use mnemos::memory::{Category, ListOptions, SearchOptions};

/// Run a blocking store call off the async runtime, flattening both error layers.
async fn blocking<T, F>(what: &str, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("{what} task failed: {e}"))?
        .map_err(|e| format!("{what} failed: {e}"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

/// The mnemos MCP tool handler. Holds the formation pipeline (and through it the
/// memory store) plus config, and exposes the tools via `#[tool_router]`.
#[derive(Clone)]
pub struct MnemosTools {
    tool_router: ToolRouter<Self>,
    pipeline: Arc<FormationPipeline>,
    config: Arc<MnemosConfig>,
}

#[tool_router]
impl MnemosTools {
    pub fn new(pipeline: Arc<FormationPipeline>, config: Arc<MnemosConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            pipeline,
            config,
        }
    }

    /// Remember something, deduplicating against what is already stored.
    #[tool(description = "Store a memory. Near-identical content is deduplicated; a close variant supersedes the older memory. Categories: preference, fact, correction, pattern.")]
    async fn remember(
        &self,
        Parameters(params): Parameters<RememberParams>,
    ) -> Result<String, String> {
        let category: Category = params.category.parse().map_err(|e: String| e)?;

        let confidence = params.confidence.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&confidence) {
            return Err("confidence must be between 0.0 and 1.0".into());
        }
        if params.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }

        tracing::info!(
            content_len = params.content.len(),
            category = %category,
            agent = params.agent_handle.as_deref().unwrap_or("*"),
            "remember called"
        );

        let mut intent = FormationIntent::new(params.content, category).with_confidence(confidence);
        intent.agent_handle = params.agent_handle;
        intent.path_scope = params.path_scope;

        if !params.wait.unwrap_or(true) {
            let request_id = self
                .pipeline
                .enqueue_intent(intent)
                .map_err(|e| e.to_string())?;
            return Ok(serde_json::json!({ "request_id": request_id, "status": "pending" }).to_string());
        }

        let pipeline = Arc::clone(&self.pipeline);
        let result = tokio::task::spawn_blocking(move || pipeline.form_now(&intent))
            .await
            .map_err(|e| format!("formation task failed: {e}"))?;

        tracing::info!(
            intent = %result.intent_id,
            outcome = ?result.outcome,
            "memory formed"
        );
        to_json(&result)
    }

    /// Search memories by meaning.
    #[tool(description = "Search memories by natural language query. Returns active memories ranked by semantic similarity.")]
    async fn recall(
        &self,
        Parameters(params): Parameters<RecallParams>,
    ) -> Result<String, String> {
        let categories = params
            .categories
            .map(|list| {
                list.iter()
                    .map(|c| c.parse::<Category>())
                    .collect::<Result<Vec<_>, String>>()
            })
            .transpose()?;

        let options = SearchOptions {
            agent_handle: params.agent_handle,
            path_scope: params.path_scope,
            threshold: params.threshold.unwrap_or(self.config.search.threshold),
            limit: params.limit.unwrap_or(self.config.search.limit).clamp(1, 50),
            categories,
            track_access: true,
        };

        tracing::info!(query = %params.query, limit = options.limit, "recall called");

        let store = self.pipeline.store().clone();
        let query = params.query;
        let results = blocking("search", move || Ok(store.search(&query, &options)?)).await?;

        to_json(&serde_json::json!({
            "memories": results,
            "total": results.len(),
        }))
    }

    /// Forget a memory.
    #[tool(description = "Forget a memory by ID or unique ID prefix. Forgotten memories are kept for audit but never returned by recall. Set hard_delete=true to remove it permanently.")]
    async fn forget_memory(
        &self,
        Parameters(params): Parameters<ForgetMemoryParams>,
    ) -> Result<String, String> {
        let store = self.pipeline.store().clone();
        let hard = params.hard_delete.unwrap_or(false);
        let id = params.memory_id;

        tracing::info!(id = %id, hard, "forget_memory called");

        let forgotten = blocking("forget", move || {
            let memory = crate::cli::inspect::resolve(&store, &id)?;
            if hard {
                store.delete(&memory.id)?;
            } else {
                store.forget(&memory.id)?;
            }
            Ok(memory.id)
        })
        .await?;

        to_json(&serde_json::json!({
            "id": forgotten,
            "status": if hard { "deleted" } else { "forgotten" },
        }))
    }

    /// Page through stored memories.
    #[tool(description = "List memories newest first, optionally for one agent. Active only unless include_inactive=true.")]
    async fn list_memories(
        &self,
        Parameters(params): Parameters<ListMemoriesParams>,
    ) -> Result<String, String> {
        let options = ListOptions {
            agent_handle: params.agent_handle,
            limit: params.limit.unwrap_or(50).clamp(1, 200),
            offset: params.offset.unwrap_or(0),
            include_inactive: params.include_inactive.unwrap_or(false),
        };

        let store = self.pipeline.store().clone();
        let (memories, active) = blocking("list", move || {
            let memories = store.list(&options)?;
            let active = store.count(options.agent_handle.as_deref())?;
            Ok((memories, active))
        })
        .await?;

        to_json(&serde_json::json!({
            "memories": memories,
            "returned": memories.len(),
            "active_total": active,
        }))
    }
}

#[tool_handler]
impl ServerHandler for MnemosTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "mnemos is a semantic memory server. Use remember to save preferences, \
                 facts, corrections, and patterns; recall to search them by meaning; \
                 list_memories to browse; forget_memory to retire one."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
