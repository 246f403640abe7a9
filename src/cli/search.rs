use anyhow::Result;

use quill::config::QuillConfig;

/// Run a similarity search from the terminal.
pub async fn search(config: &QuillConfig, query: &str, k: Option<usize>) -> Result<()> {
    super::with_service(config, |service| async move {
        let hits = service.search(query, None, k).await?;

        if hits.is_empty() {
            println!("No results found.");
            return Ok(());
        }

        println!("Found {} result(s)\n", hits.len());
        for (i, hit) in hits.iter().enumerate() {
            println!("  {}. {} (distance: {:.4})", i + 1, hit.id, hit.score);
            if !hit.title.is_empty() {
                println!("     {}", hit.title);
            }
            println!("     {}", super::preview(&hit.content, 120));
            println!();
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
}
