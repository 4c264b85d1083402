//! Retrieval-augmented question answering.
//!
//! ```text
//! question ─┬─ explicit context ──────────────────────────┐
//!           └─ embed ─▶ search top-k ─▶ join hit texts ───┴─▶ prompt ─▶ completion
//! ```
//!
//! [`RagService::try_answer`] reports which stage failed;
//! [`RagService::answer`] turns every failure into a fixed user-facing string.

use std::sync::Arc;
use std::time::Duration;

use crate::db::vectorstore::VectorIndex;
use crate::llm::CompletionClient;
use crate::types::{
    preview, EmbeddingError, GenerationError, RetrievalError, RetrievalHit, Source,
};

use super::embeddings::Embedder;

/// Separator placed between retrieved chunk texts.
pub const CONTEXT_DELIMITER: &str = "\n---\n";

pub const NO_CONTEXT_MESSAGE: &str =
    "I couldn't find any relevant information in the documentation to answer your question.";
pub const EMBEDDING_FAILURE_MESSAGE: &str = "Error: Could not process the query.";
pub const RETRIEVAL_FAILURE_MESSAGE: &str =
    "Error: Could not retrieve context from the knowledge base.";
pub const GENERATION_FAILURE_MESSAGE: &str = "Error: Could not generate a response.";

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_SUBJECT: &str = "SpecKit Plus";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a question could not be answered.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no context available for the question")]
    NoContext,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl QueryError {
    /// Stable message shown to the caller instead of the underlying error.
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryError::NoContext => NO_CONTEXT_MESSAGE,
            QueryError::Embedding(_) => EMBEDDING_FAILURE_MESSAGE,
            QueryError::Retrieval(_) => RETRIEVAL_FAILURE_MESSAGE,
            QueryError::Generation(_) => GENERATION_FAILURE_MESSAGE,
        }
    }
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Empty when the caller supplied the context.
    pub sources: Vec<Source>,
}

/// Join hit texts in ranked order.
pub fn assemble_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|hit| hit.payload.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

pub fn system_instructions(subject: &str) -> String {
    format!(
        "You are a helpful and precise assistant for the {} documentation.",
        subject
    )
}

pub fn build_prompt(subject: &str, context: &str, question: &str) -> String {
    format!(
        "You are an expert assistant for the {subject} documentation.\n\
         Please answer the user's question based on the following context from the project's book.\n\
         Your answer should be clear, concise, and directly address the question.\n\
         If the context does not contain the answer, state that you couldn't find a definitive answer in the provided documentation.\n\
         \n\
         Context from the book:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         User's question:\n\
         {question}\n"
    )
}

/// Answers questions against one collection.
pub struct RagService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn CompletionClient>,
    collection: String,
    top_k: usize,
    subject: String,
    timeout: Duration,
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn CompletionClient>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            collection: collection.into(),
            top_k: DEFAULT_TOP_K,
            subject: DEFAULT_SUBJECT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Number of chunks retrieved per question (at least 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Name of the documented project used in the prompt.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Upper bound for each embedding, search and completion call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Embed `question` and return the top-k hits, most similar first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalHit>, QueryError> {
        let secs = self.timeout.as_secs();

        let vector = tokio::time::timeout(self.timeout, self.embedder.embed(question))
            .await
            .map_err(|_| EmbeddingError::Timeout {
                input: preview(question),
                secs,
            })??;

        let hits = tokio::time::timeout(
            self.timeout,
            self.index.search(&self.collection, &vector, self.top_k),
        )
        .await
        .map_err(|_| RetrievalError::Timeout(secs))??;

        tracing::debug!(
            collection = %self.collection,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "Retrieved context"
        );

        Ok(hits)
    }

    /// Answer `question`, reporting the failing stage on error.
    ///
    /// A supplied `explicit_context` is used verbatim and the index is not
    /// queried; a blank one counts as no context.
    pub async fn try_answer(
        &self,
        question: &str,
        explicit_context: Option<&str>,
    ) -> Result<Answer, QueryError> {
        let (context, sources) = match explicit_context {
            Some(context) => (context.to_string(), Vec::new()),
            None => {
                let hits = self.retrieve(question).await?;
                (
                    assemble_context(&hits),
                    hits.iter().map(Source::from).collect(),
                )
            }
        };

        if context.trim().is_empty() {
            return Err(QueryError::NoContext);
        }

        let prompt = build_prompt(&self.subject, &context, question);
        let system = system_instructions(&self.subject);

        let text = tokio::time::timeout(self.timeout, self.llm.complete(&system, &prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout.as_secs()))??;

        Ok(Answer { text, sources })
    }

    /// Like [`try_answer`](Self::try_answer), but failures become the fixed
    /// user-facing message and are logged.
    pub async fn answer_with_sources(
        &self,
        question: &str,
        explicit_context: Option<&str>,
    ) -> Answer {
        match self.try_answer(question, explicit_context).await {
            Ok(answer) => answer,
            Err(QueryError::NoContext) => {
                tracing::info!(question = %preview(question), "No context found");
                Answer {
                    text: NO_CONTEXT_MESSAGE.to_string(),
                    sources: Vec::new(),
                }
            }
            Err(e) => {
                tracing::error!(question = %preview(question), error = %e, "Query failed");
                Answer {
                    text: e.user_message().to_string(),
                    sources: Vec::new(),
                }
            }
        }
    }

    /// Answer `question`; always returns a string.
    pub async fn answer(&self, question: &str, explicit_context: Option<&str>) -> String {
        self.answer_with_sources(question, explicit_context).await.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vectorstore::MockVectorIndex;
    use crate::llm::client::MockCompletionClient;
    use crate::rag::embeddings::MockEmbedder;
    use crate::types::ChunkPayload;

    fn hit(text: &str, score: f32) -> RetrievalHit {
        RetrievalHit {
            payload: ChunkPayload {
                source: "book".into(),
                chapter: "chapter".into(),
                section: "Section".into(),
                text: text.into(),
            },
            score,
        }
    }

    fn embedder_ok() -> MockEmbedder {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|_| Ok(vec![0.5; 4]));
        embedder
    }

    fn service(embedder: MockEmbedder, index: MockVectorIndex, llm: MockCompletionClient) -> RagService {
        RagService::new(Arc::new(embedder), Arc::new(index), Arc::new(llm), "book_docs")
    }

    #[test]
    fn test_assemble_context_keeps_rank_order() {
        let hits = vec![hit("A", 0.9), hit("B", 0.8), hit("C", 0.7)];
        assert_eq!(assemble_context(&hits), "A\n---\nB\n---\nC");
        assert_eq!(assemble_context(&[]), "");
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_prompt("SpecKit Plus", "The sky is blue.", "What color is the sky?");

        assert!(prompt.starts_with("You are an expert assistant for the SpecKit Plus documentation."));
        assert!(prompt.contains("Context from the book:\n---\nThe sky is blue.\n---\n"));
        assert!(prompt.contains("User's question:\nWhat color is the sky?"));
        assert_eq!(
            system_instructions("SpecKit Plus"),
            "You are a helpful and precise assistant for the SpecKit Plus documentation."
        );
    }

    #[tokio::test]
    async fn test_explicit_context_skips_retrieval() {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().never();
        let mut index = MockVectorIndex::new();
        index.expect_search().never();
        let mut llm = MockCompletionClient::new();
        llm.expect_complete()
            .withf(|_, prompt| prompt.contains("---\nThe sky is blue.\n---"))
            .times(1)
            .returning(|_, _| Ok("Blue.".to_string()));

        let answer = service(embedder, index, llm)
            .try_answer("What color is the sky?", Some("The sky is blue."))
            .await
            .unwrap();

        assert_eq!(answer.text, "Blue.");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_blank_explicit_context_is_no_context() {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().never();
        let mut index = MockVectorIndex::new();
        index.expect_search().never();
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().never();

        let svc = service(embedder, index, llm);
        assert!(matches!(
            svc.try_answer("q", Some("   \n")).await,
            Err(QueryError::NoContext)
        ));
        assert_eq!(svc.answer("q", Some("")).await, NO_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn test_no_hits_never_calls_llm() {
        let mut index = MockVectorIndex::new();
        index
            .expect_search()
            .withf(|collection, _, limit| collection == "book_docs" && *limit == 3)
            .returning(|_, _, _| Ok(vec![]));
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().never();

        let answer = service(embedder_ok(), index, llm).answer("anything?", None).await;
        assert_eq!(answer, NO_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn test_retrieved_answer_carries_sources() {
        let mut index = MockVectorIndex::new();
        index
            .expect_search()
            .returning(|_, _, _| Ok(vec![hit("A", 0.9), hit("B", 0.4)]));
        let mut llm = MockCompletionClient::new();
        llm.expect_complete()
            .withf(|_, prompt| prompt.contains("A\n---\nB"))
            .returning(|_, _| Ok("answer".to_string()));

        let answer = service(embedder_ok(), index, llm)
            .try_answer("q", None)
            .await
            .unwrap();

        assert_eq!(answer.text, "answer");
        assert_eq!(answer.sources.len(), 2);
        assert!((answer.sources[0].relevance_score - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_stage_failures_map_to_messages() {
        // Embedding
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .returning(|_| Err(EmbeddingError::Unavailable("model not loaded".into())));
        let mut index = MockVectorIndex::new();
        index.expect_search().never();
        let svc = service(embedder, index, MockCompletionClient::new());
        assert_eq!(svc.answer("q", None).await, EMBEDDING_FAILURE_MESSAGE);

        // Retrieval
        let mut index = MockVectorIndex::new();
        index
            .expect_search()
            .returning(|_, _, _| Err(RetrievalError::Backend("connection refused".into())));
        let svc = service(embedder_ok(), index, MockCompletionClient::new());
        assert_eq!(svc.answer("q", None).await, RETRIEVAL_FAILURE_MESSAGE);

        // Generation
        let mut index = MockVectorIndex::new();
        index.expect_search().returning(|_, _, _| Ok(vec![hit("A", 0.9)]));
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_, _| {
            Err(GenerationError::Provider {
                provider: "OpenAI".into(),
                reason: "rate limited".into(),
            })
        });
        let svc = service(embedder_ok(), index, llm);
        assert_eq!(svc.answer("q", None).await, GENERATION_FAILURE_MESSAGE);
    }

    #[test]
    fn test_builder_clamps_top_k() {
        let svc = service(MockEmbedder::new(), MockVectorIndex::new(), MockCompletionClient::new())
            .with_top_k(0)
            .with_subject("Widgets")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(svc.top_k, 1);
        assert_eq!(svc.subject, "Widgets");
        assert_eq!(svc.timeout, Duration::from_secs(5));
        assert_eq!(svc.collection(), "book_docs");
    }
}
