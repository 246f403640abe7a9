//! CLI `ingest` command: load a JSON array of notes from a file.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use quill::config::QuillConfig;
use quill::notes::ingest::parse_batch;

/// Ingest every note in `file`. Without `chunk_size` the whole file is one
/// atomic batch; with it, each chunk is atomic and earlier chunks stay stored
/// if a later one fails.
pub async fn ingest(config: &QuillConfig, file: &Path, chunk_size: Option<usize>) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let notes = parse_batch(&value)?;
    let total = notes.len();

    if let Some(0) = chunk_size {
        anyhow::bail!("--chunk-size must be at least 1");
    }

    super::with_service(config, |service| async move {
        let ids = match chunk_size {
            None => service.ingest(notes, None).await?,
            Some(size) => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("  {bar:40.cyan/blue} {pos}/{len} notes ({eta})")?
                        .progress_chars("##-"),
                );

                let mut ids = Vec::with_capacity(total);
                for chunk in notes.chunks(size) {
                    let stored = service
                        .ingest(chunk.to_vec(), None)
                        .await
                        .with_context(|| {
                            format!("chunk failed after {} of {total} notes were stored", ids.len())
                        })?;
                    pb.inc(stored.len() as u64);
                    ids.extend(stored);
                }
                pb.finish_and_clear();
                ids
            }
        };

        for id in &ids {
            println!("{id}");
        }
        eprintln!(
            "Ingested {} note(s) into '{}'",
            ids.len(),
            service.store().default_collection()
        );
        Ok::<_, anyhow::Error>(())
    })
    .await
}
