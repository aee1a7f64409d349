use ragkit_protocol::Chunk;
use ragkit_vector_store::{Precision, VectorStore, VectorStoreConfig};
use std::sync::{Arc, Mutex};

fn chunk(id: &str) -> Chunk {
    Chunk::new(id, format!("content of {id}")).with_embedding(vec![1.0, 0.0, 0.0, 0.0])
}

fn budgeted_store(max_chunks: usize) -> VectorStore {
    // 4 dims * 4 bytes = 16 bytes per chunk.
    VectorStore::new(VectorStoreConfig {
        dimensions: 4,
        precision: Precision::F32,
        max_memory_bytes: Some(max_chunks * 16),
    })
    .unwrap()
}

#[test]
fn evicts_oldest_first_until_within_budget() {
    let mut store = budgeted_store(2);
    store
        .insert(vec![chunk("a"), chunk("b"), chunk("c"), chunk("d")])
        .unwrap();

    assert_eq!(store.len(), 2);
    assert!(!store.contains("a"));
    assert!(!store.contains("b"));
    assert!(store.contains("c"));
    assert!(store.contains("d"));
    assert!(store.memory_usage() <= 32);
}

#[test]
fn eviction_hook_fires_once_per_batch_with_all_ids() {
    let calls: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let hook_calls = Arc::clone(&calls);

    let mut store = budgeted_store(1);
    store.set_eviction_hook(Box::new(move |ids| {
        hook_calls.lock().unwrap().push(ids.to_vec());
    }));

    store
        .insert(vec![chunk("a"), chunk("b"), chunk("c")])
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "one hook invocation per batch");
    assert_eq!(calls[0], vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn upsert_refreshes_fifo_position() {
    let mut store = budgeted_store(2);
    store.insert(vec![chunk("a"), chunk("b")]).unwrap();

    // Re-upserting "a" moves it to the back of the queue, so "b" is now oldest.
    store.upsert(vec![chunk("a")]).unwrap();
    store.insert(vec![chunk("c")]).unwrap();

    assert!(store.contains("a"));
    assert!(!store.contains("b"));
    assert!(store.contains("c"));
}

#[test]
fn no_budget_means_no_eviction() {
    let mut store = VectorStore::new(VectorStoreConfig {
        dimensions: 4,
        precision: Precision::F32,
        max_memory_bytes: None,
    })
    .unwrap();

    let chunks: Vec<Chunk> = (0..100).map(|i| chunk(&format!("c{i}"))).collect();
    store.insert(chunks).unwrap();
    assert_eq!(store.len(), 100);
}
