mod helpers;

use std::sync::Arc;

use helpers::hashing_store;
use mnemos::db::repository::SqliteRepository;
use mnemos::embedding::hashing::HashingEmbedder;
use mnemos::memory::{Category, ListOptions, MemoryStore, NewMemory, SearchOptions, Status};
use tempfile::TempDir;

#[test]
fn create_and_search_preference() {
    let store = hashing_store();
    let m = store
        .create(NewMemory::new("User prefers tabs over spaces", Category::Preference))
        .unwrap();
    store
        .create(NewMemory::new("Deploys happen on Fridays", Category::Pattern))
        .unwrap();

    let options = SearchOptions {
        threshold: 0.0,
        ..Default::default()
    };
    let results = store.search("tabs spaces", &options).unwrap();

    assert_eq!(results[0].memory.id, m.id);
    assert!(results[0].similarity > 0.0);
    assert_eq!(results[0].memory.category, Category::Preference);
}

#[test]
fn scope_filters_are_exact() {
    let store = hashing_store();
    let coder = store
        .create(NewMemory::new("run clippy before commit", Category::Pattern).agent("coder").path("/repo"))
        .unwrap();
    store
        .create(NewMemory::new("run clippy before commit", Category::Pattern).agent("coder").path("/other"))
        .unwrap();
    store
        .create(NewMemory::new("run clippy before commit", Category::Pattern).agent("reviewer"))
        .unwrap();
    store
        .create(NewMemory::new("run clippy before commit", Category::Pattern))
        .unwrap();

    let scoped = SearchOptions {
        agent_handle: Some("coder".into()),
        path_scope: Some("/repo".into()),
        threshold: 0.5,
        ..Default::default()
    };
    let hits = store.search("run clippy before commit", &scoped).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.id, coder.id);

    let by_agent = SearchOptions {
        agent_handle: Some("coder".into()),
        threshold: 0.5,
        ..Default::default()
    };
    assert_eq!(store.search("run clippy before commit", &by_agent).unwrap().len(), 2);

    let unscoped = SearchOptions {
        threshold: 0.5,
        ..Default::default()
    };
    assert_eq!(store.search("run clippy before commit", &unscoped).unwrap().len(), 4);
}

#[test]
fn memories_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("memory.db");

    let id = {
        let repo = Arc::new(SqliteRepository::open(&db_path).unwrap());
        let embedder = Arc::new(HashingEmbedder::new(384).unwrap());
        let store = MemoryStore::new(repo, Some(embedder));
        let m = store
            .create(
                NewMemory::new("Staging DB is read-only", Category::Fact)
                    .agent("ops")
                    .with_source(Some("session-1".into()), Some("msg-7".into())),
            )
            .unwrap();
        m.id
    };

    let repo = Arc::new(SqliteRepository::open(&db_path).unwrap());
    let embedder = Arc::new(HashingEmbedder::new(384).unwrap());
    let store = MemoryStore::new(repo, Some(embedder));
    let m = store.get(&id).unwrap();
    assert_eq!(m.content, "Staging DB is read-only");
    assert_eq!(m.agent_handle.as_deref(), Some("ops"));
    assert_eq!(m.source_session_id.as_deref(), Some("session-1"));
    assert_eq!(m.source_message_id.as_deref(), Some("msg-7"));
    assert_eq!(m.status, Status::Active);
    assert_eq!(m.embedding.map(|v| v.len()), Some(384));

    let hits = store
        .search("staging db", &SearchOptions { threshold: 0.0, ..Default::default() })
        .unwrap();
    assert_eq!(hits[0].memory.id, id);
}

#[test]
fn list_pages_newest_first() {
    let store = hashing_store();
    let mut ids = Vec::new();
    for content in ["first", "second", "third", "fourth"] {
        ids.push(store.create(NewMemory::new(content, Category::Fact)).unwrap().id);
    }

    let page = store
        .list(&ListOptions {
            limit: 2,
            offset: 1,
            ..Default::default()
        })
        .unwrap();
    let got: Vec<&str> = page.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(got, vec![ids[2].as_str(), ids[1].as_str()]);
}

#[test]
fn prefix_lookup_resolves_uuid() {
    let store = hashing_store();
    let m = store.create(NewMemory::new("lookup me", Category::Fact)).unwrap();
    let found = store.get_by_prefix(&m.id[..13]).unwrap();
    assert_eq!(found.id, m.id);
}
