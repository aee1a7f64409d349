use crate::arena::{Precision, VectorArena};
use crate::error::{Result, VectorStoreError};
use ragkit_protocol::Chunk;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Called once per mutating batch with every id evicted by the memory budget.
pub type EvictionHook = Box<dyn Fn(&[String]) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Embedding dimensionality. Every stored vector must match.
    pub dimensions: usize,
    pub precision: Precision,
    /// Byte budget for packed vector data. `None` disables eviction.
    pub max_memory_bytes: Option<usize>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            dimensions: 1536,
            precision: Precision::F32,
            max_memory_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchOptions {
    pub top_k: usize,
    pub min_score: Option<f32>,
    /// Return stored vectors alongside scores.
    pub include_vectors: bool,
}

impl VectorSearchOptions {
    #[must_use]
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }
}

/// A scored hit from [`VectorStore::search`].
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    pub id: String,
    pub chunk: Arc<Chunk>,
    /// Raw cosine similarity in `[-1, 1]`.
    pub score: f32,
    /// Stored vector, widened back to `f32`, when requested.
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    pub used_bytes: usize,
    pub max_bytes: Option<usize>,
    pub chunk_count: usize,
    pub bytes_per_chunk: usize,
    /// Fraction of the budget in use; 0 when no budget is configured.
    pub percent_used: f32,
}

struct Entry {
    slot: usize,
    chunk: Arc<Chunk>,
}

/// In-memory dense-vector index with FIFO eviction.
///
/// Mutation assumes a single writer; concurrent reads during a write must
/// be serialized by the host.
pub struct VectorStore {
    config: VectorStoreConfig,
    arena: VectorArena,
    entries: HashMap<String, Entry>,
    /// Ids in insertion order; stale ids (deleted/replaced) are skipped on pop.
    insertion_order: VecDeque<String>,
    free_slots: Vec<usize>,
    eviction_hook: Option<EvictionHook>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("config", &self.config)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self> {
        if config.dimensions == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "dimensions must be greater than zero".to_string(),
            ));
        }
        let arena = VectorArena::new(config.dimensions, config.precision);
        Ok(Self {
            config,
            arena,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            free_slots: Vec::new(),
            eviction_hook: None,
        })
    }

    /// Register a hook invoked once per mutating batch with all evicted ids.
    pub fn set_eviction_hook(&mut self, hook: EvictionHook) {
        self.eviction_hook = Some(hook);
    }

    /// Insert a batch of chunks.
    ///
    /// Validation runs over the whole batch before any mutation; a single
    /// bad embedding fails the entire call. Inserting an id that already
    /// exists replaces its vector without double-counting memory.
    pub fn insert(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        self.upsert(chunks)
    }

    /// Insert-or-replace a batch of chunks. Same validation as [`insert`].
    ///
    /// [`insert`]: VectorStore::insert
    pub fn upsert(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        for chunk in &chunks {
            let embedding = chunk
                .embedding
                .as_ref()
                .ok_or_else(|| VectorStoreError::MissingEmbedding(chunk.id.clone()))?;
            if embedding.len() != self.config.dimensions {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.config.dimensions,
                    actual: embedding.len(),
                });
            }
        }

        let batch = chunks.len();
        for chunk in chunks {
            self.store_one(chunk);
        }
        log::debug!("stored {batch} chunks, {} total", self.entries.len());

        self.enforce_budget();
        Ok(())
    }

    fn store_one(&mut self, chunk: Chunk) {
        // The embedding was validated by the caller.
        let vector = chunk.embedding.clone().unwrap_or_default();
        let id = chunk.id.clone();

        if let Some(entry) = self.entries.get_mut(&id) {
            // Replacement reuses the existing slot: no memory change, but
            // the id moves to the back of the FIFO queue.
            let slot = entry.slot;
            entry.chunk = Arc::new(chunk);
            self.arena.write(slot, &vector);
            self.insertion_order.retain(|queued| queued != &id);
            self.insertion_order.push_back(id);
            return;
        }

        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.arena.write(slot, &vector);
                slot
            }
            None => self.arena.push(&vector),
        };
        self.entries.insert(
            id.clone(),
            Entry {
                slot,
                chunk: Arc::new(chunk),
            },
        );
        self.insertion_order.push_back(id);
    }

    /// Evict oldest-inserted chunks until usage fits the budget.
    fn enforce_budget(&mut self) {
        let Some(budget) = self.config.max_memory_bytes else {
            return;
        };

        let mut evicted: Vec<String> = Vec::new();
        while self.memory_usage() > budget {
            let Some(id) = self.insertion_order.pop_front() else {
                break;
            };
            let Some(entry) = self.entries.remove(&id) else {
                // Stale queue entry from an earlier delete.
                continue;
            };
            self.free_slots.push(entry.slot);
            evicted.push(id);
        }

        if evicted.is_empty() {
            return;
        }
        log::info!(
            "evicted {} chunks to fit {budget} byte budget",
            evicted.len()
        );
        if let Some(hook) = &self.eviction_hook {
            hook(&evicted);
        }
    }

    /// Cosine-similarity search over every stored vector.
    ///
    /// Results are the top K by score descending; equal scores keep
    /// insertion order. An empty store returns an empty batch.
    pub fn search(
        &self,
        query: &[f32],
        options: &VectorSearchOptions,
    ) -> Result<Vec<VectorSearchResult>> {
        if query.len() != self.config.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: query.len(),
            });
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();

        // Walk ids in insertion order so the stable sort below breaks score
        // ties by insertion order.
        let mut scored: Vec<VectorSearchResult> = self
            .insertion_order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| (id, entry)))
            .map(|(id, entry)| {
                let score = self.arena.cosine(entry.slot, query, query_norm);
                let vector = options.include_vectors.then(|| self.arena.read(entry.slot));
                VectorSearchResult {
                    id: id.clone(),
                    chunk: Arc::clone(&entry.chunk),
                    score,
                    vector,
                }
            })
            .collect();

        if let Some(min_score) = options.min_score {
            scored.retain(|result| result.score >= min_score);
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(options.top_k);

        log::debug!("vector search returned {} results", scored.len());
        Ok(scored)
    }

    /// Remove chunks by id, releasing their memory. Returns how many existed.
    pub fn delete(&mut self, ids: &[String]) -> usize {
        let mut removed = 0;
        for id in ids {
            if let Some(entry) = self.entries.remove(id) {
                self.free_slots.push(entry.slot);
                removed += 1;
            }
        }
        if removed > 0 {
            self.insertion_order
                .retain(|id| self.entries.contains_key(id));
            log::debug!("deleted {removed} chunks");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
        self.free_slots.clear();
        self.arena.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Bytes of packed vector data currently in use by live chunks.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.entries.len() * self.bytes_per_chunk()
    }

    #[must_use]
    pub fn memory_stats(&self) -> MemoryStats {
        let used_bytes = self.memory_usage();
        #[allow(clippy::cast_precision_loss)]
        let percent_used = match self.config.max_memory_bytes {
            Some(max) if max > 0 => used_bytes as f32 / max as f32,
            _ => 0.0,
        };
        MemoryStats {
            used_bytes,
            max_bytes: self.config.max_memory_bytes,
            chunk_count: self.entries.len(),
            bytes_per_chunk: self.bytes_per_chunk(),
            percent_used,
        }
    }

    fn bytes_per_chunk(&self) -> usize {
        self.config.dimensions * self.config.precision.bytes_per_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::new(id, format!("content of {id}")).with_embedding(embedding)
    }

    fn store(dimensions: usize) -> VectorStore {
        VectorStore::new(VectorStoreConfig {
            dimensions,
            ..VectorStoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_zero_dimensions() {
        let err = VectorStore::new(VectorStoreConfig {
            dimensions: 0,
            ..VectorStoreConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[test]
    fn insert_validates_before_mutating() {
        let mut store = store(3);
        let err = store
            .insert(vec![
                chunk("ok", vec![1.0, 0.0, 0.0]),
                chunk("bad", vec![1.0, 0.0]),
            ])
            .unwrap_err();
        assert_eq!(err.code(), "DIMENSION_MISMATCH");
        // Whole batch rejected, including the valid chunk.
        assert!(store.is_empty());
    }

    #[test]
    fn search_rejects_dimension_mismatch() {
        let mut store = store(3);
        store.insert(vec![chunk("a", vec![1.0, 0.0, 0.0])]).unwrap();
        let err = store
            .search(&[1.0, 0.0], &VectorSearchOptions::top_k(5))
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn empty_store_returns_empty_results() {
        let store = store(3);
        let results = store
            .search(&[1.0, 0.0, 0.0], &VectorSearchOptions::top_k(5))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn search_ranks_by_cosine_descending() {
        let mut store = store(2);
        store
            .insert(vec![
                chunk("orthogonal", vec![0.0, 1.0]),
                chunk("aligned", vec![2.0, 0.0]),
                chunk("diagonal", vec![1.0, 1.0]),
            ])
            .unwrap();

        let results = store
            .search(&[1.0, 0.0], &VectorSearchOptions::top_k(3))
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["aligned", "diagonal", "orthogonal"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut store = store(2);
        store
            .insert(vec![
                chunk("first", vec![1.0, 0.0]),
                chunk("second", vec![2.0, 0.0]),
                chunk("third", vec![0.5, 0.0]),
            ])
            .unwrap();

        let results = store
            .search(&[1.0, 0.0], &VectorSearchOptions::top_k(3))
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn min_score_filters_and_include_vectors_round_trips() {
        let mut store = store(2);
        store
            .insert(vec![
                chunk("hit", vec![1.0, 0.0]),
                chunk("miss", vec![0.0, 1.0]),
            ])
            .unwrap();

        let results = store
            .search(
                &[1.0, 0.0],
                &VectorSearchOptions {
                    top_k: 5,
                    min_score: Some(0.5),
                    include_vectors: true,
                },
            )
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].vector.as_deref(), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn memory_accounting_is_exact() {
        let mut store = VectorStore::new(VectorStoreConfig {
            dimensions: 1536,
            precision: Precision::F32,
            max_memory_bytes: None,
        })
        .unwrap();

        let chunks: Vec<Chunk> = (0..1000)
            .map(|i| chunk(&format!("c{i}"), vec![0.5; 1536]))
            .collect();
        store.insert(chunks).unwrap();

        assert_eq!(store.memory_usage(), 1000 * 1536 * 4);

        let mut f64_store = VectorStore::new(VectorStoreConfig {
            dimensions: 1536,
            precision: Precision::F64,
            max_memory_bytes: None,
        })
        .unwrap();
        f64_store
            .insert((0..1000).map(|i| chunk(&format!("c{i}"), vec![0.5; 1536])).collect())
            .unwrap();
        assert_eq!(f64_store.memory_usage(), 1000 * 1536 * 8);
    }

    #[test]
    fn upsert_does_not_double_count_memory() {
        let mut store = store(4);
        store.insert(vec![chunk("a", vec![1.0; 4])]).unwrap();
        let before = store.memory_usage();

        store.upsert(vec![chunk("a", vec![2.0; 4])]).unwrap();
        assert_eq!(store.memory_usage(), before);
        assert_eq!(store.len(), 1);

        let results = store
            .search(&[1.0; 4], &VectorSearchOptions {
                top_k: 1,
                min_score: None,
                include_vectors: true,
            })
            .unwrap();
        assert_eq!(results[0].vector.as_deref(), Some(&[2.0; 4][..]));
    }

    #[test]
    fn delete_and_clear_release_memory() {
        let mut store = store(4);
        store
            .insert(vec![chunk("a", vec![1.0; 4]), chunk("b", vec![1.0; 4])])
            .unwrap();
        assert_eq!(store.delete(&["a".to_string(), "ghost".to_string()]), 1);
        assert_eq!(store.memory_usage(), 16);

        store.clear();
        assert_eq!(store.memory_usage(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn memory_stats_reports_budget_fraction() {
        let mut store = VectorStore::new(VectorStoreConfig {
            dimensions: 4,
            precision: Precision::F32,
            max_memory_bytes: Some(64),
        })
        .unwrap();
        store.insert(vec![chunk("a", vec![1.0; 4])]).unwrap();

        let stats = store.memory_stats();
        assert_eq!(stats.used_bytes, 16);
        assert_eq!(stats.bytes_per_chunk, 16);
        assert_eq!(stats.chunk_count, 1);
        assert!((stats.percent_used - 0.25).abs() < 1e-6);
    }
}
