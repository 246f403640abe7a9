use anyhow::Result;

use quill::config::QuillConfig;

pub async fn delete(config: &QuillConfig, ids: Vec<String>) -> Result<()> {
    super::with_service(config, |service| async move {
        let deleted = service.delete(ids, None).await?;
        println!(
            "Deleted {deleted} note(s) from '{}'",
            service.store().default_collection()
        );
        Ok::<_, anyhow::Error>(())
    })
    .await
}
