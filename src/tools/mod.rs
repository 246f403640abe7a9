pub mod ingest_notes;
pub mod list_notes;
pub mod search_notes;

use std::sync::Arc;

use ingest_notes::IngestNotesParams;
use list_notes::ListNotesParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_notes::SearchNotesParams;
use serde_json::json;

use crate::error::Error;
use crate::notes::service::NoteService;
use crate::notes::types::NewNote;

/// The stdio tool handler. Wraps a shared [`NoteService`] and exposes the
/// ingest, list and search operations via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct QuillTools {
    tool_router: ToolRouter<Self>,
    service: Arc<NoteService>,
}

#[tool_router]
impl QuillTools {
    pub fn new(service: Arc<NoteService>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }

    /// Store a batch of notes.
    #[tool(description = "Store a batch of notes ({title, content}). Each note's content is embedded for similarity search. The batch is atomic. Returns the new note ids in input order.")]
    async fn ingest_notes(
        &self,
        Parameters(params): Parameters<IngestNotesParams>,
    ) -> Result<String, String> {
        tracing::info!(
            count = params.notes.len(),
            collection = ?params.collection,
            "ingest_notes called"
        );
        let batch: Vec<NewNote> = params.notes.into_iter().map(NewNote::from).collect();
        let ids = self
            .service
            .ingest(batch, params.collection.as_deref())
            .await
            .map_err(tool_error)?;

        Ok(json!({ "ids": ids }).to_string())
    }

    /// List every note in a collection.
    #[tool(description = "List every note in a collection, oldest first. Embeddings are omitted unless include_embeddings is true.")]
    async fn list_notes(
        &self,
        Parameters(params): Parameters<ListNotesParams>,
    ) -> Result<String, String> {
        tracing::info!(collection = ?params.collection, "list_notes called");
        let notes = self
            .service
            .list(params.collection.as_deref())
            .await
            .map_err(tool_error)?;

        let notes = if params.include_embeddings.unwrap_or(false) {
            serde_json::to_value(&notes).map_err(|e| format!("serialization failed: {e}"))?
        } else {
            notes
                .iter()
                .map(|n| {
                    json!({
                        "id": n.id,
                        "title": n.title,
                        "content": n.content,
                        "collection": n.collection,
                        "created_at": n.created_at,
                    })
                })
                .collect()
        };

        Ok(json!({ "notes": notes }).to_string())
    }

    /// Nearest-neighbour search over a collection.
    #[tool(description = "Find the k notes most similar to a natural language query. Results are ordered closest first; score is cosine distance (lower is closer).")]
    async fn search_notes(
        &self,
        Parameters(params): Parameters<SearchNotesParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, k = ?params.k, "search_notes called");
        let results = self
            .service
            .search(&params.query, params.collection.as_deref(), params.k)
            .await
            .map_err(tool_error)?;

        Ok(json!({ "results": results }).to_string())
    }
}

fn tool_error(err: Error) -> String {
    tracing::warn!(kind = err.kind(), error = %err, "tool call failed");
    format!("{}: {err}", err.kind())
}

#[tool_handler]
impl ServerHandler for QuillTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Quill stores short notes and finds them by meaning. Use ingest_notes to \
                 add notes, search_notes to query them, and list_notes to see everything."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_input_defaults_title() {
        let input = ingest_notes::NoteInput {
            title: None,
            content: "body".into(),
        };
        assert_eq!(NewNote::from(input), NewNote::new("", "body"));
    }

    #[test]
    fn tool_error_carries_kind() {
        let msg = tool_error(Error::validation("query must not be empty"));
        assert!(msg.starts_with("validation_error"));
    }
}
