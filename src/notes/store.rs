//! The note store: every open collection, its repository, index and locks.
//!
//! Each [`Collection`] pairs a [`SimilarityIndex`] behind a `RwLock` with a
//! [`NoteRepository`] behind a `Mutex`. The `RwLock` is the collection's
//! read-write boundary: writers hold it exclusively across the repository
//! transaction and the index mutation, readers hold it shared across the index
//! query and the repository join. Lock order is always index, then repository.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use super::index::SimilarityIndex;
use super::repository::{self, NoteRepository};
use super::types::{validate_collection_name, CollectionStats, NewNote, Note, SearchHit};
use crate::db::{self, migrations};
use crate::error::{Error, Result};

const DB_EXTENSION: &str = "db";

/// Construction parameters for [`NoteStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub default_collection: String,
}

impl StoreConfig {
    pub fn from_config(config: &crate::config::QuillConfig) -> Self {
        Self {
            data_dir: config.resolved_data_dir(),
            default_collection: config.storage.default_collection.clone(),
        }
    }
}

pub struct NoteStore {
    data_dir: PathBuf,
    default_collection: String,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl NoteStore {
    /// Open the store rooted at `config.data_dir`, reopening every existing
    /// collection and rebuilding its index from the repository.
    pub fn open(config: StoreConfig) -> Result<Self> {
        validate_collection_name(&config.default_collection)?;
        std::fs::create_dir_all(&config.data_dir).map_err(|e| Error::Io {
            message: format!("failed to create {}: {e}", config.data_dir.display()),
        })?;

        let mut collections = HashMap::new();
        for name in discover_collections(&config.data_dir)? {
            let path = collection_path(&config.data_dir, &name);
            let collection = Collection::open(&path, &name)?;
            collections.insert(name, Arc::new(collection));
        }

        tracing::info!(
            data_dir = %config.data_dir.display(),
            collections = collections.len(),
            "note store opened"
        );

        Ok(Self {
            data_dir: config.data_dir,
            default_collection: config.default_collection,
            collections: RwLock::new(collections),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn default_collection(&self) -> &str {
        &self.default_collection
    }

    /// Resolve an optional caller-supplied collection name to a validated one.
    pub fn resolve_name<'a>(&'a self, name: Option<&'a str>) -> Result<&'a str> {
        let name = name.unwrap_or(&self.default_collection);
        validate_collection_name(name)?;
        Ok(name)
    }

    /// The named collection, created on first use.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        if let Some(existing) = self.existing(name)? {
            return Ok(existing);
        }
        validate_collection_name(name)?;

        let mut collections = self.collections.write()?;
        if let Some(existing) = collections.get(name) {
            return Ok(Arc::clone(existing));
        }
        let path = collection_path(&self.data_dir, name);
        let collection = Arc::new(Collection::open(&path, name)?);
        collections.insert(name.to_string(), Arc::clone(&collection));
        tracing::info!(collection = %name, path = %path.display(), "collection created");
        Ok(collection)
    }

    /// The named collection if it has been created, without creating it.
    pub fn existing(&self, name: &str) -> Result<Option<Arc<Collection>>> {
        Ok(self.collections.read()?.get(name).cloned())
    }

    /// Names of all open collections, sorted.
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Checkpoint every collection and release its connection. The store is
    /// empty afterwards; everything it held is recoverable from disk.
    pub fn close(&self) -> Result<()> {
        let drained: Vec<Arc<Collection>> = {
            let mut collections = self.collections.write()?;
            collections.drain().map(|(_, c)| c).collect()
        };
        for collection in &drained {
            // Taking the write lock waits out in-flight operations
            let _guard = collection.index.write()?;
            collection.repo.lock()?.checkpoint()?;
        }
        tracing::info!(collections = drained.len(), "note store closed");
        Ok(())
    }
}

fn collection_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.{DB_EXTENSION}"))
}

fn discover_collections(data_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(DB_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if validate_collection_name(stem).is_ok() {
            names.push(stem.to_string());
        } else {
            tracing::warn!(path = %path.display(), "skipping database with invalid collection name");
        }
    }
    names.sort();
    Ok(names)
}

/// Result of [`Collection::verify`].
#[derive(Debug, Serialize)]
pub struct ConsistencyReport {
    pub collection: String,
    pub repository_notes: usize,
    pub indexed_notes: usize,
    /// Indexed ids with no repository record.
    pub orphaned_in_index: Vec<String>,
    /// Repository records missing from the index.
    pub missing_from_index: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_in_index.is_empty() && self.missing_from_index.is_empty()
    }
}

pub struct Collection {
    name: String,
    index: RwLock<SimilarityIndex>,
    repo: Mutex<NoteRepository>,
}

impl Collection {
    /// Open the collection database at `path` and rebuild its index.
    pub fn open(path: &Path, name: &str) -> Result<Self> {
        let repo = NoteRepository::open(path, name)?;
        Self::from_repository(repo)
    }

    /// Wrap an already-open repository, rebuilding the index from its rows.
    pub fn from_repository(repo: NoteRepository) -> Result<Self> {
        let index = build_index(&repo)?;
        tracing::debug!(
            collection = %repo.collection(),
            notes = index.len(),
            dimension = ?index.dimension(),
            "index rebuilt"
        );
        Ok(Self {
            name: repo.collection().to_string(),
            index: RwLock::new(index),
            repo: Mutex::new(repo),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Persist and index `batch` as one unit. Either every note becomes visible
    /// to readers, or none does.
    pub fn insert_batch(
        &self,
        batch: &[(NewNote, Vec<f32>)],
        embedding_model: Option<&str>,
    ) -> Result<Vec<Note>> {
        let mut index = self.index.write()?;
        let mut repo = self.repo.lock()?;
        let mark = index.mark();

        let tx = repo.begin()?;
        let stored = repository::insert_rows(&tx, &self.name, batch)?;
        if let Some(model) = embedding_model {
            migrations::set_embedding_model(&tx, model)?;
        }

        for note in &stored {
            if let Err(err) = index.add(&note.id, &note.embedding) {
                index.rollback(mark);
                tracing::warn!(collection = %self.name, error = %err, "index add failed, batch rolled back");
                return Err(err);
            }
        }

        if let Err(err) = tx.commit() {
            index.rollback(mark);
            tracing::error!(collection = %self.name, error = %err, "commit failed, batch rolled back");
            return Err(Error::Io {
                message: format!("commit failed: {err}"),
            });
        }

        Ok(stored)
    }

    /// Every note, in insertion order.
    pub fn list(&self) -> Result<Vec<Note>> {
        let _index = self.index.read()?;
        let repo = self.repo.lock()?;
        repo.get_all()
    }

    /// Rank the collection against `embedding` and join the top `k` back to
    /// their records. An indexed id with no record is a [`Error::Consistency`] fault.
    pub fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let index = self.index.read()?;
        let ranked = index.query(embedding, k)?;
        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();

        let repo = self.repo.lock()?;
        let notes = repo.get_by_ids(&ids).map_err(|err| match err {
            Error::NotFound { ids } => {
                tracing::error!(collection = %self.name, ids = ?ids, "index returned ids with no repository record");
                Error::consistency(format!(
                    "collection '{}' indexes notes missing from the repository: {}",
                    self.name,
                    ids.join(", ")
                ))
            }
            other => other,
        })?;

        Ok(notes
            .into_iter()
            .zip(ranked)
            .map(|(note, (_, score))| SearchHit {
                id: note.id,
                title: note.title,
                content: note.content,
                score,
            })
            .collect())
    }

    /// Delete `ids` from repository and index together. Fails with
    /// [`Error::NotFound`] (deleting nothing) if any id is absent.
    pub fn delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut index = self.index.write()?;
        let mut repo = self.repo.lock()?;

        let tx = repo.begin()?;
        let deleted = repository::delete_rows(&tx, ids)?;
        tx.commit()?;

        let removed = index.remove(ids);
        if removed != deleted {
            tracing::error!(collection = %self.name, deleted, removed, "index and repository disagreed on delete");
            return Err(Error::consistency(format!(
                "deleted {deleted} records but {removed} index entries in '{}'",
                self.name
            )));
        }
        Ok(deleted)
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        let index = self.index.read()?;
        let repo = self.repo.lock()?;
        Ok(CollectionStats {
            name: self.name.clone(),
            notes: index.len(),
            dimension: repo.dimension()?.or(index.dimension()),
            embedding_model: repo.embedding_model()?,
        })
    }

    /// Compare index and repository id sets.
    pub fn verify(&self) -> Result<ConsistencyReport> {
        let index = self.index.read()?;
        let repo = self.repo.lock()?;
        let stored: Vec<String> = repo.get_all()?.into_iter().map(|n| n.id).collect();
        let stored_set: std::collections::HashSet<&str> =
            stored.iter().map(String::as_str).collect();

        let orphaned_in_index = index
            .ids()
            .filter(|id| !stored_set.contains(id))
            .map(str::to_string)
            .collect();
        let missing_from_index = stored
            .iter()
            .filter(|id| !index.contains(id))
            .cloned()
            .collect();

        Ok(ConsistencyReport {
            collection: self.name.clone(),
            repository_notes: stored.len(),
            indexed_notes: index.len(),
            orphaned_in_index,
            missing_from_index,
        })
    }

    /// Discard the in-memory index and rebuild it from the repository.
    pub fn rebuild_index(&self) -> Result<()> {
        let mut index = self.index.write()?;
        let repo = self.repo.lock()?;
        *index = build_index(&repo)?;
        tracing::info!(collection = %self.name, notes = index.len(), "index rebuilt from repository");
        Ok(())
    }

    /// Health report for the underlying database file.
    pub fn health(&self) -> Result<db::HealthReport> {
        let _index = self.index.read()?;
        let repo = self.repo.lock()?;
        db::check_database_health(repo.connection())
    }
}

fn build_index(repo: &NoteRepository) -> Result<SimilarityIndex> {
    let mut index = SimilarityIndex::new(repo.collection(), repo.dimension()?);
    for note in repo.get_all()? {
        index.add(&note.id, &note.embedding)?;
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_collection() -> Collection {
        Collection::from_repository(NoteRepository::open_in_memory("mem").unwrap()).unwrap()
    }

    #[test]
    fn batch_is_visible_in_list_and_index() {
        let collection = memory_collection();
        let batch = vec![
            (NewNote::new("a", "alpha"), vec![1.0, 0.0]),
            (NewNote::new("b", "beta"), vec![0.0, 1.0]),
        ];
        let stored = collection.insert_batch(&batch, Some("test-model")).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(collection.list().unwrap().len(), 2);

        let hits = collection.nearest(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].title, "b");

        let stats = collection.stats().unwrap();
        assert_eq!(stats.notes, 2);
        assert_eq!(stats.dimension, Some(2));
        assert_eq!(stats.embedding_model.as_deref(), Some("test-model"));
    }

    #[test]
    fn mismatched_note_rejects_whole_batch() {
        let collection = memory_collection();
        collection
            .insert_batch(&[(NewNote::new("", "seed"), vec![1.0, 0.0])], None)
            .unwrap();

        let batch = vec![
            (NewNote::new("", "ok one"), vec![1.0, 0.0]),
            (NewNote::new("", "ok two"), vec![0.0, 1.0]),
            (NewNote::new("", "bad"), vec![1.0, 0.0, 0.0]),
        ];
        let err = collection.insert_batch(&batch, None).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(collection.list().unwrap().len(), 1);
        assert!(collection.verify().unwrap().is_consistent());
    }

    #[test]
    fn index_failure_rolls_back_repository() {
        let collection = memory_collection();
        // NaN passes the repository checks but is refused by the index
        let batch = vec![
            (NewNote::new("", "fine"), vec![1.0, 0.0]),
            (NewNote::new("", "poison"), vec![f32::NAN, 0.0]),
        ];
        assert!(collection.insert_batch(&batch, None).is_err());
        assert!(collection.list().unwrap().is_empty());
        assert_eq!(collection.stats().unwrap().dimension, None);
        assert!(collection.verify().unwrap().is_consistent());
    }

    #[test]
    fn delete_removes_from_both_sides() {
        let collection = memory_collection();
        let stored = collection
            .insert_batch(
                &[
                    (NewNote::new("", "keep"), vec![1.0, 0.0]),
                    (NewNote::new("", "drop"), vec![0.0, 1.0]),
                ],
                None,
            )
            .unwrap();

        assert_eq!(collection.delete(&[stored[1].id.clone()]).unwrap(), 1);
        let hits = collection.nearest(&[0.0, 1.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "keep");
        assert!(collection.verify().unwrap().is_consistent());
    }

    #[test]
    fn delete_unknown_id_changes_nothing() {
        let collection = memory_collection();
        let stored = collection
            .insert_batch(&[(NewNote::new("", "keep"), vec![1.0])], None)
            .unwrap();
        let err = collection
            .delete(&[stored[0].id.clone(), "ghost".into()])
            .unwrap_err();
        assert_eq!(err.kind(), "not_found_error");
        assert_eq!(collection.list().unwrap().len(), 1);
    }

    #[test]
    fn rebuild_matches_live_index() {
        let collection = memory_collection();
        collection
            .insert_batch(
                &[
                    (NewNote::new("", "one"), vec![1.0, 0.0]),
                    (NewNote::new("", "two"), vec![0.6, 0.8]),
                ],
                None,
            )
            .unwrap();
        let before = collection.nearest(&[1.0, 0.0], 2).unwrap();
        collection.rebuild_index().unwrap();
        let after = collection.nearest(&[1.0, 0.0], 2).unwrap();
        assert_eq!(before, after);
    }
}
