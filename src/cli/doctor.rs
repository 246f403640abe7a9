//! CLI `doctor` command: database diagnostics and index consistency per collection.

use anyhow::{Context, Result};

use quill::config::QuillConfig;
use quill::notes::store::{NoteStore, StoreConfig};

/// Print a health report for every collection. With `repair`, rebuild any
/// index that disagrees with its repository.
pub fn doctor(config: &QuillConfig, repair: bool) -> Result<()> {
    let data_dir = config.resolved_data_dir();
    if !data_dir.exists() {
        println!("Data directory: not found at {}", data_dir.display());
        println!("Run `quill ingest` or `quill serve` to create it.");
        return Ok(());
    }

    let store = NoteStore::open(StoreConfig::from_config(config))
        .context("failed to open note store (a collection file may be corrupt)")?;

    println!("Quill Health Report");
    println!("===================");
    println!();
    println!("Data directory:    {}", data_dir.display());
    println!("Configured model:  {}", config.embedding.model);

    let names = store.collection_names()?;
    if names.is_empty() {
        println!();
        println!("No collections.");
    }

    let mut problems = 0;
    for name in names {
        let Some(collection) = store.existing(&name)? else {
            continue;
        };
        let path = data_dir.join(format!("{name}.db"));
        let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let report = collection.health()?;
        let consistency = collection.verify()?;

        println!();
        println!("Collection '{name}'");
        println!("  File:            {} ({})", path.display(), format_bytes(file_size));
        println!("  Schema version:  {}", report.schema_version);
        println!("  Notes:           {}", report.note_count);
        println!("  Log entries:     {}", report.log_count);
        println!(
            "  Dimension:       {}",
            report
                .dimension
                .map(|d| d.to_string())
                .unwrap_or_else(|| "(not set)".into())
        );
        println!(
            "  Embedding model: {}",
            report.embedding_model.as_deref().unwrap_or("(not set)")
        );
        if let Some(stored) = &report.embedding_model {
            if stored != &config.embedding.model {
                println!("  WARNING: model mismatch; search results will be unreliable.");
                problems += 1;
            }
        }

        if report.integrity_ok {
            println!("  Integrity check: PASSED");
        } else {
            println!("  Integrity check: FAILED ({})", report.integrity_details);
            problems += 1;
        }
        if report.malformed_embeddings > 0 {
            println!("  Malformed embeddings: {}", report.malformed_embeddings);
            problems += 1;
        }

        if consistency.is_consistent() {
            println!("  Index:           OK ({} entries)", consistency.indexed_notes);
        } else {
            problems += 1;
            println!(
                "  Index:           INCONSISTENT ({} indexed, {} stored, {} orphaned, {} missing)",
                consistency.indexed_notes,
                consistency.repository_notes,
                consistency.orphaned_in_index.len(),
                consistency.missing_from_index.len()
            );
            if repair {
                collection.rebuild_index()?;
                println!("  Index rebuilt from repository.");
            } else {
                println!("  Run `quill doctor --repair` to rebuild it.");
            }
        }
    }

    store.close()?;

    println!();
    if problems == 0 {
        println!("No problems found.");
    } else {
        println!("{problems} problem(s) found.");
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
