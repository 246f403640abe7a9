use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::notes::types::NewNote;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NoteInput {
    #[schemars(description = "Optional short title for the note")]
    pub title: Option<String>,

    #[schemars(description = "The note text. Must not be empty.")]
    pub content: String,
}

impl From<NoteInput> for NewNote {
    fn from(input: NoteInput) -> Self {
        NewNote {
            title: input.title.unwrap_or_default(),
            content: input.content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestNotesParams {
    #[schemars(
        description = "Notes to store. The batch is atomic: either every note is stored or none is."
    )]
    pub notes: Vec<NoteInput>,

    #[schemars(description = "Collection to store into. Defaults to the configured collection.")]
    pub collection: Option<String>,
}
