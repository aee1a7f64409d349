use crate::error::{Result, RetrieverError};
use crate::provider::EmbeddingProvider;
use async_trait::async_trait;
use ragkit_lexical::Bm25Index;
use ragkit_protocol::{score, QueryOptions, RankedList, RetrievalResult};
use ragkit_vector_store::{VectorSearchOptions, VectorStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Common contract for every retrieval signal source.
///
/// Implementations fail fast with [`RetrieverError::EmptyQuery`] on blank
/// input and with [`RetrieverError::Cancelled`] when the token fires,
/// never returning partial results.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    async fn retrieve(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>>;

    /// Retrieve and wrap as a [`RankedList`] for rank fusion.
    async fn retrieve_ranked(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<RankedList> {
        let results = self.retrieve(query, options, cancel).await?;
        Ok(RankedList::from_results(self.name(), &results))
    }
}

/// Dense vector similarity: embeds the query and searches the vector store.
pub struct DenseRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
}

impl DenseRetriever {
    #[must_use]
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<VectorStore>) -> Self {
        Self { provider, store }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    fn name(&self) -> &str {
        ragkit_protocol::SIGNAL_DENSE
    }

    async fn retrieve(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }

        let embedding = tokio::select! {
            () = cancel.cancelled() => return Err(RetrieverError::Cancelled),
            embedded = self.provider.embed(query) => embedded?,
        };

        let hits = self.store.search(
            &embedding,
            &VectorSearchOptions {
                top_k: options.top_k,
                min_score: None,
                include_vectors: false,
            },
        )?;

        // Raw cosine is in [-1, 1]; normalize the batch so this signal
        // speaks the shared [0, 1] scale.
        let mut scores: Vec<f32> = hits.iter().map(|hit| hit.score).collect();
        score::min_max_normalize(&mut scores);

        let mut results: Vec<RetrievalResult> = hits
            .into_iter()
            .zip(scores)
            .map(|(hit, normalized)| RetrievalResult::new(hit.chunk, normalized))
            .collect();
        if let Some(min_score) = options.min_score {
            results.retain(|result| result.score >= min_score);
        }

        log::debug!("dense retrieve: {} results", results.len());
        Ok(results)
    }
}

/// Lexical BM25 signal: delegates directly to the index.
pub struct SparseRetriever {
    index: Arc<Bm25Index>,
}

impl SparseRetriever {
    #[must_use]
    pub fn new(index: Arc<Bm25Index>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    fn name(&self) -> &str {
        ragkit_protocol::SIGNAL_SPARSE
    }

    async fn retrieve(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }
        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        let results = self.index.retrieve(query, options)?;
        log::debug!("sparse retrieve: {} results", results.len());
        Ok(results)
    }
}
