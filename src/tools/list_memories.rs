use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListMemoriesParams {
    #[schemars(description = "Only list memories owned by this agent")]
    pub agent_handle: Option<String>,

    #[schemars(description = "Page size (1-200). Defaults to 50.")]
    pub limit: Option<usize>,

    #[schemars(description = "Number of memories to skip. Defaults to 0.")]
    pub offset: Option<usize>,

    #[schemars(description = "Include superseded, archived, and forgotten memories (default: false)")]
    pub include_inactive: Option<bool>,
}
