//! MCP `recall` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallParams {
    #[schemars(description = "Natural language query to search memories")]
    pub query: String,

    #[schemars(description = "Only return memories owned by this agent")]
    pub agent_handle: Option<String>,

    #[schemars(description = "Only return memories scoped to this path")]
    pub path_scope: Option<String>,

    /// Subset of `preference`, `fact`, `correction`, `pattern`.
    #[schemars(
        description = "Filter by category: any of 'preference', 'fact', 'correction', 'pattern'"
    )]
    pub categories: Option<Vec<String>>,

    #[schemars(description = "Maximum number of results to return (1-50). Defaults to the configured limit.")]
    pub limit: Option<usize>,

    #[schemars(description = "Minimum cosine similarity (-1.0 to 1.0). Defaults to the configured threshold.")]
    pub threshold: Option<f32>,
}
