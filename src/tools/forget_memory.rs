use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetMemoryParams {
    #[schemars(description = "ID (or unique ID prefix) of the memory to forget")]
    pub memory_id: String,

    #[schemars(description = "Permanently delete instead of marking forgotten (default: false)")]
    pub hard_delete: Option<bool>,
}
