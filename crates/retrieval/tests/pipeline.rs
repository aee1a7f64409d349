//! End-to-end retrieval tests over an in-memory corpus: dense + sparse
//! branches, the graph signal, rank fusion, confidence and reranking.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use ragkit_graph::GraphStore;
use ragkit_lexical::{Bm25Config, Bm25Index};
use ragkit_protocol::{Chunk, Metadata, QueryOptions};
use ragkit_retrieval::fusion::{self, DEFAULT_RRF_K};
use ragkit_retrieval::{
    rerank, ConfidenceScorer, DenseRetriever, EmbeddingProvider, GraphHybridConfig,
    GraphHybridRetriever, HybridConfig, HybridRetriever, ProviderError, RerankOptions, Retriever,
    RetrieverError, SparseRetriever, TermOverlapStrategy,
};
use ragkit_vector_store::{VectorStore, VectorStoreConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DIMS: usize = 4;

/// Keyword-keyed stub: maps query topics onto fixed axes of a tiny
/// embedding space so similarity is fully predictable.
struct StubProvider;

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let text = text.to_lowercase();
        if text.contains("async") || text.contains("tokio") {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        } else if text.contains("postgres") || text.contains("database") {
            Ok(vec![0.0, 1.0, 0.0, 0.0])
        } else {
            Ok(vec![0.0, 0.0, 0.0, 1.0])
        }
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

fn chunk(id: &str, content: &str, embedding: [f32; DIMS], node: Option<&str>) -> Chunk {
    let mut chunk = Chunk::new(id, content).with_embedding(embedding.to_vec());
    if let Some(node) = node {
        chunk = chunk.with_meta("node_id", node);
    }
    chunk
}

fn corpus() -> Vec<Chunk> {
    vec![
        chunk(
            "tokio-guide",
            "tokio async runtime tasks and executors",
            [1.0, 0.0, 0.0, 0.0],
            Some("n-tokio"),
        ),
        chunk(
            "async-book",
            "async await and futures in rust",
            [0.9, 0.1, 0.0, 0.0],
            Some("n-async"),
        ),
        chunk(
            "pg-tuning",
            "postgres database tuning and indexes",
            [0.0, 1.0, 0.0, 0.0],
            Some("n-postgres"),
        ),
        chunk(
            "orphan",
            "miscellaneous notes about nothing in particular",
            [0.0, 0.0, 1.0, 0.0],
            None,
        ),
    ]
}

fn dense_retriever() -> DenseRetriever {
    let mut store = VectorStore::new(VectorStoreConfig {
        dimensions: DIMS,
        ..VectorStoreConfig::default()
    })
    .unwrap();
    store.insert(corpus()).unwrap();
    DenseRetriever::new(Arc::new(StubProvider), Arc::new(store))
}

fn sparse_retriever() -> SparseRetriever {
    let mut index = Bm25Index::new(Bm25Config::default()).unwrap();
    index.build_index(&corpus());
    SparseRetriever::new(Arc::new(index))
}

fn hybrid() -> HybridRetriever {
    HybridRetriever::new(dense_retriever(), sparse_retriever(), HybridConfig::default()).unwrap()
}

fn graph() -> GraphStore {
    let mut graph = GraphStore::new();
    graph.upsert_node("n-tokio", Metadata::new());
    graph.upsert_node("n-async", Metadata::new());
    graph.upsert_node("n-postgres", Metadata::new());
    graph.add_edge("n-tokio", "n-async", 0.9, None).unwrap();
    graph
}

#[tokio::test]
async fn hybrid_ranks_topical_chunks_first() {
    let retriever = hybrid();
    let results = retriever
        .retrieve_hybrid(
            "rust async runtime",
            &QueryOptions::top_k(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    // Both signals agree on the async docs.
    assert!(["tokio-guide", "async-book"].contains(&results[0].id.as_str()));
    for window in results.windows(2) {
        assert!(window[0].scores.fused >= window[1].scores.fused);
    }
    for result in &results {
        assert!((0.0..=1.0).contains(&result.scores.fused));
        assert_eq!(result.scores.graph, None);
    }
}

#[tokio::test]
async fn hybrid_rejects_blank_query() {
    let err = hybrid()
        .retrieve_hybrid("   ", &QueryOptions::top_k(3), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EMPTY_QUERY");
}

#[tokio::test]
async fn cancelled_token_aborts_without_partial_results() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = hybrid()
        .retrieve_hybrid("rust async runtime", &QueryOptions::top_k(3), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieverError::Cancelled));
}

#[tokio::test]
async fn graph_hybrid_cross_pollinates_connected_chunks() {
    let retriever = GraphHybridRetriever::new(
        hybrid(),
        Arc::new(graph()),
        GraphHybridConfig::default(),
    )
    .unwrap();

    let results = retriever
        .retrieve_hybrid(
            "rust async runtime",
            &QueryOptions::top_k(4),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let tokio_guide = results.iter().find(|r| r.id == "tokio-guide").unwrap();
    let async_book = results.iter().find(|r| r.id == "async-book").unwrap();
    // n-tokio and n-async are linked, so each boosts the other.
    assert!(tokio_guide.scores.graph.unwrap() > 0.0);
    assert!(async_book.scores.graph.unwrap() > 0.0);

    if let Some(orphan) = results.iter().find(|r| r.id == "orphan") {
        assert_eq!(orphan.scores.graph, Some(0.0));
    }
}

#[tokio::test]
async fn graph_hybrid_tolerates_empty_graph() {
    let retriever = GraphHybridRetriever::new(
        hybrid(),
        Arc::new(GraphStore::new()),
        GraphHybridConfig::default(),
    )
    .unwrap();

    let results = retriever
        .retrieve_hybrid(
            "rust async runtime",
            &QueryOptions::top_k(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.scores.graph, Some(0.0));
    }
}

#[tokio::test]
async fn fusion_and_confidence_over_branch_rankings() {
    let retriever = GraphHybridRetriever::new(
        hybrid(),
        Arc::new(graph()),
        GraphHybridConfig::default(),
    )
    .unwrap();

    let options = QueryOptions::top_k(4);
    let lists = retriever
        .ranked_lists("rust async runtime", &options, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(lists.len(), 3);

    let fused = fusion::fuse(&lists, DEFAULT_RRF_K);
    assert!(!fused.is_empty());
    for result in &fused {
        assert_eq!(result.contributions.len(), 3);
        assert!((0.0..=1.0).contains(&result.score));
    }

    let pool_size = fused.len();
    let scorer = ConfidenceScorer::default();
    let top = scorer.score(&fused[0], lists.len(), pool_size);
    let bottom = scorer.score(fused.last().unwrap(), lists.len(), pool_size);

    // The top result is seen by more signals than the off-topic tail.
    assert!(top.factors.signal_count >= bottom.factors.signal_count);
    assert!(top.overall >= bottom.overall);
    assert!(top.signals.vector_similarity.is_some());
}

#[tokio::test]
async fn rerank_tail_refines_hybrid_output() {
    let retriever = hybrid();
    let results = retriever
        .retrieve(
            "rust async runtime",
            &QueryOptions::top_k(4),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let reranked = rerank(
        &TermOverlapStrategy,
        "rust async runtime",
        &results,
        &RerankOptions {
            top_k: Some(2),
            min_score: None,
        },
    )
    .await
    .unwrap();

    assert!(reranked.len() <= 2);
    assert_eq!(reranked[0].new_rank, 1);
    assert!(reranked[0].rerank_score >= reranked.last().unwrap().rerank_score);
}
