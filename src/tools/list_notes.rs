use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListNotesParams {
    #[schemars(description = "Collection to list. Defaults to the configured collection.")]
    pub collection: Option<String>,

    #[schemars(
        description = "If true, include each note's embedding vector. Defaults to false to keep responses small."
    )]
    pub include_embeddings: Option<bool>,
}
