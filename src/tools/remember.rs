use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberParams {
    #[schemars(description = "The natural language content of the memory")]
    pub content: String,

    #[schemars(
        description = "Category: 'preference' (how the user likes things done), 'fact' (something true about the user or project), 'correction' (a fix to something previously believed), 'pattern' (a recurring way of working)"
    )]
    pub category: String,

    #[schemars(description = "Agent this memory belongs to. Omit for memories shared by all agents.")]
    pub agent_handle: Option<String>,

    #[schemars(description = "Project or path the memory applies to")]
    pub path_scope: Option<String>,

    #[schemars(description = "Confidence score 0.0-1.0. Defaults to 1.0.")]
    pub confidence: Option<f64>,

    #[schemars(
        description = "If false, queue the memory and return a request id immediately instead of waiting for the result. Defaults to true."
    )]
    pub wait: Option<bool>,
}
