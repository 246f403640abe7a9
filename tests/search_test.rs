mod helpers;

use helpers::{at_distance, notes, test_service, ScriptedProvider};
use tempfile::TempDir;

fn ranked_provider() -> ScriptedProvider {
    ScriptedProvider::new(2)
        .with("query", vec![1.0, 0.0])
        .with("alpha", at_distance(0.1))
        .with("beta", at_distance(0.5))
        .with("gamma", at_distance(0.9))
}

#[tokio::test]
async fn top_k_returns_closest_first() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ranked_provider());

    // inserted out of rank order on purpose
    service
        .ingest(notes(&[("C", "gamma"), ("A", "alpha"), ("B", "beta")]), None)
        .await
        .unwrap();

    let hits = service.search("query", None, Some(2)).await.unwrap();
    let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B"]);
    assert!((hits[0].score - 0.1).abs() < 1e-4);
    assert!((hits[1].score - 0.5).abs() < 1e-4);
}

#[tokio::test]
async fn k_larger_than_collection_returns_everything_sorted() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ranked_provider());
    service
        .ingest(notes(&[("C", "gamma"), ("A", "alpha"), ("B", "beta")]), None)
        .await
        .unwrap();

    let hits = service.search("query", None, Some(50)).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));
}

#[tokio::test]
async fn default_k_applies_when_omitted() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ScriptedProvider::new(8));
    let batch: Vec<(String, String)> = (0..8)
        .map(|i| (format!("t{i}"), format!("note number {i}")))
        .collect();
    let batch: Vec<(&str, &str)> = batch.iter().map(|(t, c)| (t.as_str(), c.as_str())).collect();
    service.ingest(notes(&batch), None).await.unwrap();

    let hits = service.search("note number", None, None).await.unwrap();
    assert_eq!(hits.len(), service.default_k());
}

#[tokio::test]
async fn ties_resolve_in_insertion_order() {
    let tmp = TempDir::new().unwrap();
    let provider = ScriptedProvider::new(2)
        .with("query", vec![1.0, 0.0])
        .with("first", at_distance(0.3))
        .with("second", at_distance(0.3))
        .with("third", at_distance(0.3));
    let (service, _) = test_service(tmp.path(), provider);

    let ids = service
        .ingest(notes(&[("", "first"), ("", "second"), ("", "third")]), None)
        .await
        .unwrap();

    for _ in 0..3 {
        let hits = service.search("query", None, Some(2)).await.unwrap();
        let hit_ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        assert_eq!(hit_ids, ids[..2].to_vec());
    }
}

#[tokio::test]
async fn empty_collection_returns_empty_list() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ScriptedProvider::new(8));

    assert!(service.search("anything", None, Some(3)).await.unwrap().is_empty());
    assert!(service
        .search("anything", Some("never-created"), Some(3))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn search_after_deleting_everything_is_empty() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ScriptedProvider::new(8));
    let ids = service.ingest(notes(&[("", "short lived")]), None).await.unwrap();
    service.delete(ids, None).await.unwrap();

    assert!(service.search("short lived", None, Some(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_query_is_a_validation_error() {
    let tmp = TempDir::new().unwrap();
    let (service, provider) = test_service(tmp.path(), ScriptedProvider::new(8));

    let err = service.search("  ", None, Some(3)).await.unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn zero_k_is_a_validation_error() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ScriptedProvider::new(8));

    let err = service.search("query", None, Some(0)).await.unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn query_embedding_failure_is_reported() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ScriptedProvider::new(8).failing_on("broken"));
    service.ingest(notes(&[("", "stored")]), None).await.unwrap();

    let err = service.search("broken", None, Some(1)).await.unwrap_err();
    assert_eq!(err.kind(), "embedding_error");
}

#[tokio::test]
async fn record_missing_behind_index_is_a_consistency_error() {
    let tmp = TempDir::new().unwrap();
    let provider = ScriptedProvider::new(2)
        .with("query", vec![1.0, 0.0])
        .with("kept", at_distance(0.4))
        .with("vanishing", at_distance(0.1));
    let (service, _) = test_service(tmp.path(), provider);
    let ids = service
        .ingest(notes(&[("", "kept"), ("", "vanishing")]), None)
        .await
        .unwrap();

    // remove the row underneath the open store
    let conn = rusqlite::Connection::open(tmp.path().join("notes.db")).unwrap();
    conn.execute("DELETE FROM notes WHERE id = ?1", [&ids[1]]).unwrap();
    drop(conn);

    let err = service.search("query", None, Some(2)).await.unwrap_err();
    assert_eq!(err.kind(), "consistency_error");

    let collection = service.store().existing("notes").unwrap().unwrap();
    let report = collection.verify().unwrap();
    assert_eq!(report.orphaned_in_index, vec![ids[1].clone()]);

    collection.rebuild_index().unwrap();
    let hits = service.search("query", None, Some(2)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);
}

#[tokio::test]
async fn collections_are_isolated() {
    let tmp = TempDir::new().unwrap();
    let (service, _) = test_service(tmp.path(), ScriptedProvider::new(8));

    service.ingest(notes(&[("", "work item")]), Some("work")).await.unwrap();
    service.ingest(notes(&[("", "home item")]), Some("home")).await.unwrap();

    let hits = service.search("work item", Some("home"), Some(5)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "home item");
}
