//! Query classification.
//!
//! Not every query needs the documents: greetings, capability questions,
//! and general knowledge can be answered directly, skipping planning and
//! page analysis entirely. The classifier makes that call with one cheap
//! text request. Parsing failures fail open toward document analysis —
//! wrongly running the pipeline wastes tokens, wrongly skipping it loses
//! the answer.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::jsonx;
use crate::prompts::CLASSIFICATION_PROMPT;
use crate::providers::{Provider, ProviderMessage};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Decision made by the classifier.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Whether the query requires document analysis.
    pub needs_documents: bool,

    /// The model's one-line justification.
    pub reasoning: String,

    /// Reply to return directly when documents are not needed.
    pub direct_answer: Option<String>,
}

impl Classification {
    /// The text to answer with when no documents are needed. Falls back to
    /// the reasoning when the model omitted a direct answer.
    pub fn direct_reply(&self) -> &str {
        self.direct_answer
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.reasoning)
    }
}

#[derive(Debug, Deserialize)]
struct ClassificationReply {
    needs_documents: bool,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    direct_answer: Option<String>,
}

/// Decides whether a query needs document analysis.
pub struct QueryClassifier {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

impl QueryClassifier {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Classify one (already reformulated) query.
    pub async fn classify(&self, query: &str) -> Result<Classification> {
        let request = vec![
            ProviderMessage::system(CLASSIFICATION_PROMPT),
            ProviderMessage::user(query.to_string()),
        ];
        let raw = self
            .provider
            .process_text(
                &request,
                self.config.max_tokens_text,
                self.config.temperatures.classification,
            )
            .await?;

        match jsonx::parse_object::<ClassificationReply>(&raw) {
            Ok(reply) => Ok(Classification {
                needs_documents: reply.needs_documents,
                reasoning: reply.reasoning,
                direct_answer: reply.direct_answer,
            }),
            Err(err) => {
                debug!(error = %err, "classification reply unparseable, defaulting to document analysis");
                Ok(Classification {
                    needs_documents: true,
                    reasoning: "classification output unparseable".to_string(),
                    direct_answer: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{StubProvider, StubReply};

    fn classifier(stub: StubProvider) -> QueryClassifier {
        QueryClassifier::new(Arc::new(stub), AgentConfig::default())
    }

    #[tokio::test]
    async fn test_direct_answer_path() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"{"needs_documents": false, "reasoning": "greeting", "direct_answer": "I analyze documents."}"#,
        )]);

        let cls = classifier(stub)
            .classify("Hello, what can you do?")
            .await
            .unwrap();
        assert!(!cls.needs_documents);
        assert_eq!(cls.direct_reply(), "I analyze documents.");
    }

    #[tokio::test]
    async fn test_needs_documents_path() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"{"needs_documents": true, "reasoning": "asks about stored report contents"}"#,
        )]);

        let cls = classifier(stub)
            .classify("What were Q3 revenues?")
            .await
            .unwrap();
        assert!(cls.needs_documents);
        assert!(cls.direct_answer.is_none());
    }

    #[tokio::test]
    async fn test_parse_failure_fails_open() {
        let stub = StubProvider::new(vec![StubReply::text("I think you need the documents")]);

        let cls = classifier(stub).classify("anything").await.unwrap();
        assert!(cls.needs_documents);
    }

    #[tokio::test]
    async fn test_direct_reply_falls_back_to_reasoning() {
        let cls = Classification {
            needs_documents: false,
            reasoning: "This is a greeting.".to_string(),
            direct_answer: Some("  ".to_string()),
        };
        assert_eq!(cls.direct_reply(), "This is a greeting.");
    }

    #[tokio::test]
    async fn test_uses_classification_temperature() {
        let stub = Arc::new(StubProvider::new(vec![StubReply::text(
            r#"{"needs_documents": true, "reasoning": "r"}"#,
        )]));
        let c = QueryClassifier::new(stub.clone(), AgentConfig::default());
        c.classify("q").await.unwrap();

        let calls = stub.calls();
        assert!(!calls[0].multimodal);
        assert!((calls[0].temperature - 0.1).abs() < f32::EPSILON);
    }
}
