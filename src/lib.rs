//! # Docsight — vision-first document QA agent
//!
//! Docsight answers natural-language questions about user-supplied
//! documents by treating each document page as an image and delegating
//! understanding to a multimodal LLM. There is no embedding index and no
//! vector store: the same model that answers the question also chooses
//! which page images are relevant.
//!
//! ## Pipeline
//!
//! 1. **Context processing** — long conversation histories are compressed
//!    into a short summary plus the most recent verbatim turns.
//! 2. **Reformulation** — follow-up queries are rewritten into standalone
//!    form using that context.
//! 3. **Classification** — queries that don't need the documents get a
//!    direct answer, skipping everything below.
//! 4. **Planning** — the query becomes a small plan of focused tasks, each
//!    bound to exactly one document.
//! 5. **Selection + analysis** — per task, the model picks the relevant
//!    page images and analyzes them.
//! 6. **Replanning** — after every task the planner may tighten, prune, or
//!    extend the remaining plan based on what was just learned.
//! 7. **Synthesis** — the completed analyses become one final answer.
//!
//! Tasks run strictly sequentially; that's what makes step 6 meaningful.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use docsight::{Agent, AgentConfig, Document, ImageSource, InMemoryStorage, Page};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(InMemoryStorage::new(vec![
//!         Document::new("q3", "Q3 Report")
//!             .with_summary("Q3 financial results")
//!             .with_pages(vec![
//!                 Page::new(1, ImageSource::path("pages/q3-001.jpg")),
//!                 Page::new(2, ImageSource::path("pages/q3-002.jpg")),
//!             ]),
//!     ]));
//!
//!     // Reads OPENAI_API_KEY (or the configured vendor's key) from the
//!     // environment.
//!     let agent = Agent::from_env(storage, AgentConfig::default())?;
//!
//!     let result = agent.process_query("What were Q3 revenues?", &[]).await?;
//!     println!("{}", result.answer);
//!     for page in &result.pages {
//!         println!("used page {}", page.page_number);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **agent**: orchestrator loop, cancellation, abort semantics
//! - **planner**: initial plan creation and adaptive revision
//! - **select** / **execute**: per-task vision page selection and analysis
//! - **classify** / **reformulate** / **context**: query preprocessing
//! - **synthesize**: final answer assembly
//! - **providers**: OpenAI / Anthropic / OpenRouter transports plus a
//!   scripted stub for tests
//! - **storage**: the read-only document contract and an in-memory store
//! - **config** / **error** / **retry** / **jsonx** / **prompts**: the
//!   supporting cast

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Agent orchestrator: the top-level control flow for one query.
mod agent;

/// Query classification: does this query need the documents at all?
mod classify;

/// Configuration record and builder.
mod config;

/// Conversation-context compression.
mod context;

/// Error types and the crate-wide `Result` alias.
mod error;

/// Per-task multimodal analysis.
mod execute;

/// Task planning and adaptive plan revision.
mod planner;

/// Query reformulation against conversation context.
mod reformulate;

/// Vision-first page selection.
mod select;

/// Document storage contract and in-memory implementation.
mod storage;

/// Final answer synthesis.
mod synthesize;

/// Core data model: documents, pages, tasks, plans, results.
mod types;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

/// Tolerant JSON extraction from model output. Public so embedders driving
/// their own prompts can reuse the fence-stripping balanced-value scan.
pub mod jsonx;

/// Prompt constants, one per pipeline stage.
pub mod prompts;

/// MLLM provider trait, concrete vendors, and the scripted test stub.
pub mod providers;

/// Retry utilities with exponential backoff and jitter.
pub mod retry;

// --- Agent ---

pub use agent::{Agent, CancelToken};

// --- Configuration ---

pub use config::{AgentConfig, AgentConfigBuilder, ProviderKind, StageTemperatures};

// --- Error Handling ---

pub use error::{Error, ErrorKind, Result};

// --- Pipeline Components ---

pub use classify::{Classification, QueryClassifier};
pub use context::{ContextProcessor, ProcessedContext};
pub use execute::TaskExecutor;
pub use planner::TaskPlanner;
pub use reformulate::QueryReformulator;
pub use select::PageSelector;
pub use synthesize::ResponseSynthesizer;

// --- Providers and Storage ---

pub use providers::{Provider, ProviderMessage};
pub use storage::{InMemoryStorage, Storage};

// --- Core Types ---

pub use types::{
    AgentTask, ConversationMessage, ConversationRole, Document, DocumentInfo, ImageSource, Page,
    QueryOutcome, QueryResult, TaskPlan, TaskResult, TaskStatus,
};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// The most commonly used types and traits in one import:
/// `use docsight::prelude::*;`
pub mod prelude {
    pub use crate::{
        Agent, AgentConfig, AgentTask, CancelToken, ConversationMessage, Document, DocumentInfo,
        Error, ImageSource, InMemoryStorage, Page, Provider, ProviderKind, QueryOutcome,
        QueryResult, Result, Storage, TaskPlan, TaskResult, TaskStatus,
    };
}
