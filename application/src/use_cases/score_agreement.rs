//! Agreement scoring use case
//!
//! Embeds every usable branch text with one embedding-capable adapter and
//! scores each unordered pair by cosine similarity. Scoring is best effort:
//! every failure mode degrades to an empty score list.

use crate::ports::provider::ProviderAdapter;
use ensemble_domain::{AgreementScore, pairwise_scores, usable_entries};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the scorer produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AgreementOutcome {
    /// Scores for every pair of usable texts.
    Scored(Vec<AgreementScore>),
    /// Fewer than two usable texts; a normal outcome.
    InsufficientData,
    /// No adapter in the run can embed.
    NoEmbeddingProvider,
    /// The embedding call failed or returned something unusable.
    Failed(String),
}

impl AgreementOutcome {
    pub fn scores(&self) -> &[AgreementScore] {
        match self {
            AgreementOutcome::Scored(scores) => scores,
            _ => &[],
        }
    }

    /// The message clients receive when scoring was unavailable.
    pub fn error_message(&self) -> Option<String> {
        match self {
            AgreementOutcome::NoEmbeddingProvider => {
                Some("No embedding provider available".to_string())
            }
            AgreementOutcome::Failed(reason) => {
                Some(format!("Failed to calculate agreement: {reason}"))
            }
            _ => None,
        }
    }
}

pub struct AgreementScorer;

impl AgreementScorer {
    /// Pick the adapter used for embeddings.
    ///
    /// Prefers the provider ranked best by `ProviderKind::embedding_preference`,
    /// then the earliest candidate. Any instance works since embedding calls
    /// are stateless.
    pub fn select_embedder(
        candidates: &[Arc<dyn ProviderAdapter>],
    ) -> Option<Arc<dyn ProviderAdapter>> {
        candidates
            .iter()
            .filter(|adapter| adapter.supports_embeddings())
            .min_by_key(|adapter| adapter.kind().embedding_preference().unwrap_or(u8::MAX))
            .cloned()
    }

    /// Score every pair of non-blank texts in `texts` (id, text), in input
    /// order. Failed branches must already be left out by the caller.
    pub async fn score(
        texts: &[(String, String)],
        embedder: Option<&dyn ProviderAdapter>,
    ) -> AgreementOutcome {
        let usable = usable_entries(texts);
        if usable.len() < 2 {
            debug!(usable = usable.len(), "Not enough responses to score agreement");
            return AgreementOutcome::InsufficientData;
        }

        let Some(embedder) = embedder else {
            return AgreementOutcome::NoEmbeddingProvider;
        };

        let inputs: Vec<String> = usable.iter().map(|(_, text)| text.to_string()).collect();
        let vectors = match embedder.embed(&inputs).await {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!(provider = %embedder.kind(), "Embedding request failed: {}", e);
                return AgreementOutcome::Failed(e.to_string());
            }
        };

        if vectors.is_empty() {
            return AgreementOutcome::NoEmbeddingProvider;
        }
        if vectors.len() != usable.len() {
            warn!(
                expected = usable.len(),
                received = vectors.len(),
                "Embedding count mismatch"
            );
            return AgreementOutcome::Failed(format!(
                "expected {} embeddings, received {}",
                usable.len(),
                vectors.len()
            ));
        }

        let embeddings: Vec<(&str, Vec<f32>)> = usable
            .iter()
            .map(|(id, _)| *id)
            .zip(vectors)
            .collect();

        AgreementOutcome::Scored(pairwise_scores(&embeddings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::provider::ProviderError;
    use async_trait::async_trait;
    use ensemble_domain::ProviderKind;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ==================== Test Mocks ====================

    /// Embeds by looking each text up in a fixed table.
    struct TableEmbedder {
        kind: ProviderKind,
        table: HashMap<String, Vec<f32>>,
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    impl TableEmbedder {
        fn new(kind: ProviderKind, table: &[(&str, Vec<f32>)]) -> Self {
            Self {
                kind,
                table: table
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(ProviderKind::OpenAi, &[])
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for TableEmbedder {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn generate(&self, _prompt: &str, _model: &str) -> Result<String, ProviderError> {
            Ok(String::new())
        }

        fn supports_embeddings(&self) -> bool {
            self.kind.supports_embeddings()
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            if self.fail {
                return Err(ProviderError::Http {
                    provider: "openai".to_string(),
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_default())
                .collect())
        }
    }

    fn texts(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect()
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_scores_known_vectors() {
        let embedder = TableEmbedder::new(
            ProviderKind::OpenAi,
            &[
                ("one", vec![1.0, 0.0]),
                ("two", vec![0.0, 1.0]),
                ("three", vec![0.8, 0.6]),
            ],
        );
        let input = texts(&[("o", "one"), ("g", "two"), ("a", "three")]);

        let outcome = AgreementScorer::score(&input, Some(&embedder)).await;
        let scores = outcome.scores();
        assert_eq!(scores.len(), 3);
        let get = |a: &str, b: &str| scores.iter().find(|s| s.involves(a, b)).unwrap().score;
        assert!(get("o", "g").abs() < 1e-6);
        assert!((get("g", "a") - 0.6).abs() < 1e-6);
        assert!((get("a", "o") - 0.8).abs() < 1e-6);

        // one batched call
        assert_eq!(embedder.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_excluded_from_pairs() {
        let embedder = TableEmbedder::new(
            ProviderKind::OpenAi,
            &[("x", vec![1.0, 0.0]), ("y", vec![1.0, 1.0])],
        );
        let input = texts(&[("a", ""), ("b", "x"), ("c", "y")]);

        let outcome = AgreementScorer::score(&input, Some(&embedder)).await;
        let scores = outcome.scores();
        assert_eq!(scores.len(), 1);
        assert!(scores.iter().all(|s| s.id_a != "a" && s.id_b != "a"));
    }

    #[tokio::test]
    async fn test_all_blank_is_empty_without_calling_embedder() {
        let embedder = TableEmbedder::new(ProviderKind::OpenAi, &[]);
        let input = texts(&[("a", ""), ("b", "  "), ("c", "\n")]);

        let outcome = AgreementScorer::score(&input, Some(&embedder)).await;
        assert_eq!(outcome, AgreementOutcome::InsufficientData);
        assert!(outcome.scores().is_empty());
        assert!(outcome.error_message().is_none());
        assert!(embedder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_embedder_is_signalled() {
        let input = texts(&[("a", "x"), ("b", "y")]);
        let outcome = AgreementScorer::score(&input, None).await;
        assert_eq!(outcome, AgreementOutcome::NoEmbeddingProvider);
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("No embedding provider available")
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_empty() {
        let embedder = TableEmbedder::failing();
        let input = texts(&[("a", "x"), ("b", "y")]);
        let outcome = AgreementScorer::score(&input, Some(&embedder)).await;
        assert!(matches!(outcome, AgreementOutcome::Failed(_)));
        assert!(outcome.scores().is_empty());
    }

    struct NoEmbeddings;

    #[async_trait]
    impl ProviderAdapter for NoEmbeddings {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Anthropic
        }

        async fn generate(&self, _prompt: &str, _model: &str) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_empty_embedding_result_means_unavailable() {
        let input = texts(&[("a", "x"), ("b", "y")]);
        let outcome = AgreementScorer::score(&input, Some(&NoEmbeddings)).await;
        assert_eq!(outcome, AgreementOutcome::NoEmbeddingProvider);
    }

    #[tokio::test]
    async fn test_empty_vectors_score_zero() {
        let embedder = TableEmbedder::new(ProviderKind::OpenAi, &[]);
        let input = texts(&[("a", "x"), ("b", "y")]);
        let outcome = AgreementScorer::score(&input, Some(&embedder)).await;
        assert_eq!(outcome.scores().len(), 1);
        assert_eq!(outcome.scores()[0].score, 0.0);
    }

    #[test]
    fn test_select_embedder_prefers_openai() {
        let candidates: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(TableEmbedder::new(ProviderKind::Anthropic, &[])),
            Arc::new(TableEmbedder::new(ProviderKind::Google, &[])),
            Arc::new(TableEmbedder::new(ProviderKind::OpenAi, &[])),
        ];
        let chosen = AgreementScorer::select_embedder(&candidates).unwrap();
        assert_eq!(chosen.kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_select_embedder_none_without_capability() {
        let candidates: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(TableEmbedder::new(ProviderKind::Anthropic, &[])),
            Arc::new(TableEmbedder::new(ProviderKind::Grok, &[])),
        ];
        assert!(AgreementScorer::select_embedder(&candidates).is_none());
    }
}
