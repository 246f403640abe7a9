//! Parameters for the `search_notes` tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchNotesParams {
    /// Natural language query.
    #[schemars(description = "Natural language query to match against stored notes")]
    pub query: String,

    /// How many results to return. Defaults to the configured `default_k`.
    #[schemars(description = "Number of closest notes to return (at least 1). Defaults to 5.")]
    pub k: Option<usize>,

    #[schemars(description = "Collection to search. Defaults to the configured collection.")]
    pub collection: Option<String>,
}
