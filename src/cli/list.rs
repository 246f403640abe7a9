use anyhow::Result;

use quill::config::QuillConfig;

/// Print every note in the collection, oldest first.
pub async fn list(config: &QuillConfig) -> Result<()> {
    super::with_service(config, |service| async move {
        let notes = service.list(None).await?;
        if notes.is_empty() {
            println!("No notes in '{}'.", service.store().default_collection());
            return Ok(());
        }

        for note in &notes {
            let title = if note.title.is_empty() {
                "(untitled)"
            } else {
                note.title.as_str()
            };
            println!("{}  {}  {}", note.id, note.created_at, title);
            println!("     {}", super::preview(&note.content, 120));
        }
        println!("\n{} note(s)", notes.len());
        Ok::<_, anyhow::Error>(())
    })
    .await
}
