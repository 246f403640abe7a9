pub mod collections;
pub mod delete;
pub mod doctor;
pub mod export;
pub mod ingest;
pub mod list;
pub mod search;

use anyhow::Result;

use quill::config::QuillConfig;
use quill::notes::service::NoteService;

/// Open the service for a one-shot command, run `f`, then close the store so
/// WAL files are checkpointed before the process exits.
pub async fn with_service<T, F, Fut>(config: &QuillConfig, f: F) -> Result<T>
where
    F: FnOnce(std::sync::Arc<NoteService>) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let service = quill::server::build_service(config)?;
    let store = std::sync::Arc::clone(service.store());
    let out = f(service).await;
    store.close()?;
    out
}

/// Truncate `text` to at most `max` characters for one-line display.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
