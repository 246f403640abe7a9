use anyhow::Result;

use quill::config::QuillConfig;

/// Export the collection's notes as a JSON array to stdout.
///
/// The output is accepted by `quill ingest`, which reads `title` and
/// `content` and ignores the other fields.
pub async fn export(config: &QuillConfig) -> Result<()> {
    super::with_service(config, |service| async move {
        let notes = service.list(None).await?;
        let json = serde_json::to_string_pretty(&notes)?;
        println!("{json}");

        eprintln!(
            "Exported {} note(s) from '{}'",
            notes.len(),
            service.store().default_collection()
        );
        Ok::<_, anyhow::Error>(())
    })
    .await
}
