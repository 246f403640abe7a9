use anyhow::Result;

use quill::config::QuillConfig;

/// Print a table of every collection in the data directory.
pub async fn collections(config: &QuillConfig) -> Result<()> {
    super::with_service(config, |service| async move {
        let stats = service.collections().await?;
        if stats.is_empty() {
            println!("No collections in {}", service.store().data_dir().display());
            return Ok(());
        }

        println!("{:<24} {:>8} {:>10}  MODEL", "COLLECTION", "NOTES", "DIMENSION");
        for c in &stats {
            let dimension = c
                .dimension
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "{:<24} {:>8} {:>10}  {}",
                c.name,
                c.notes,
                dimension,
                c.embedding_model.as_deref().unwrap_or("-")
            );
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
}
