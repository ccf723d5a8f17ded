mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{test_embedding, test_repo, FlakyEmbedder};
use mnemos::error::MemoryError;
use mnemos::formation::{form, FormationError, FormationIntent, FormationOutcome, FormationPipeline};
use mnemos::memory::{Category, MemoryStore, NewMemory, SearchOptions};

#[test]
fn embedding_failure_at_write_time_stores_without_vector() {
    let embedder = Arc::new(FlakyEmbedder::new(true));
    let store = MemoryStore::new(test_repo(), Some(embedder.clone()));

    let m = store
        .create(NewMemory::new("written while offline", Category::Fact))
        .unwrap();
    assert!(m.embedding.is_none());

    // Not findable until embedded.
    embedder.set_down(false);
    let options = SearchOptions {
        threshold: 0.0,
        ..Default::default()
    };
    assert!(store.search("written while offline", &options).unwrap().is_empty());

    assert_eq!(store.embed_missing(8).unwrap(), 1);
    let hits = store.search("written while offline", &options).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.id, m.id);
}

#[test]
fn embedding_failure_at_search_time_is_an_error() {
    let embedder = Arc::new(FlakyEmbedder::new(false));
    let store = MemoryStore::new(test_repo(), Some(embedder.clone()));
    store
        .create(NewMemory::new("indexed", Category::Fact))
        .unwrap();

    embedder.set_down(true);
    assert!(matches!(
        store.search("indexed", &SearchOptions::default()),
        Err(MemoryError::Embedding(_))
    ));
}

#[test]
fn dedup_lookup_failure_falls_through_to_create() {
    let embedder = Arc::new(FlakyEmbedder::new(false));
    let store = MemoryStore::new(test_repo(), Some(embedder.clone()));
    let first = form(&store, &FormationIntent::new("repeat me", Category::Fact));
    assert_eq!(first.outcome, FormationOutcome::Created);

    embedder.set_down(true);
    let second = form(&store, &FormationIntent::new("repeat me", Category::Fact));
    assert_eq!(second.outcome, FormationOutcome::Created);
    assert!(second.memory.unwrap().embedding.is_none());
    assert_eq!(store.count(None).unwrap(), 2);
}

#[test]
fn malformed_stored_vector_is_skipped() {
    let store = MemoryStore::new(test_repo(), Some(Arc::new(FlakyEmbedder::new(false))));

    let good = store.create(NewMemory::new("vector test", Category::Fact)).unwrap();
    // Wrong dimension for this embedder.
    store
        .create(NewMemory::new("vector test", Category::Fact).with_embedding(test_embedding(0)[..3].to_vec()))
        .unwrap();

    let options = SearchOptions {
        threshold: -1.0,
        ..Default::default()
    };
    let hits = store.search("vector test", &options).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.id, good.id);
}

#[tokio::test]
async fn full_queue_is_reported_not_dropped() {
    let store = MemoryStore::new(test_repo(), Some(Arc::new(FlakyEmbedder::new(false))));
    let pipeline = FormationPipeline::start(store, 2);

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for i in 0..5 {
        match pipeline.enqueue(format!("burst {i}"), Category::Fact, None, None) {
            Ok(id) => accepted.push(id),
            Err(FormationError::QueueFull { request_id }) => rejected.push(request_id),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    // The worker has not run yet on the single-threaded test runtime.
    assert_eq!(accepted.len(), 2);
    assert_eq!(rejected.len(), 3);

    assert!(pipeline.shutdown(Duration::from_secs(5)).await);
    assert_eq!(pipeline.pending_count(), 0);
}
