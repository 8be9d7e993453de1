//! Core type definitions for the docsight agent.
//!
//! The data model splits into three groups:
//!
//! # Conversation
//!
//! - [`ConversationMessage`]: one turn of caller-supplied chat history
//! - [`ConversationRole`]: who sent it (User, Assistant)
//!
//! # Documents
//!
//! - [`DocumentInfo`]: the `{id, name, summary}` catalog row shown to the
//!   planner when it assigns tasks to documents
//! - [`Document`]: a full document with its ordered page images
//! - [`Page`]: one rasterized page, referenced by an [`ImageSource`] handle
//! - [`ImageSource`]: opaque image handle a provider can resolve (file path,
//!   remote URL, or raw bytes)
//!
//! Documents and pages are owned by the storage collaborator; the agent only
//! ever holds read-only clones for the duration of a query.
//!
//! # Plans and results
//!
//! - [`AgentTask`]: a focused sub-question bound to exactly one document
//! - [`TaskStatus`]: pending → in_progress → {completed, failed}, monotonic
//! - [`TaskPlan`]: the ordered task list plus the iteration counter
//! - [`TaskResult`]: selected pages + analysis text for one finished task
//! - [`QueryResult`]: everything returned to the caller
//!
//! # Example
//!
//! ```
//! use docsight::{Document, Page, ImageSource};
//!
//! let doc = Document::new("q3", "Q3 Report")
//!     .with_summary("Q3 financial results")
//!     .with_pages(vec![
//!         Page::new(1, ImageSource::path("pages/q3-001.jpg")),
//!         Page::new(2, ImageSource::path("pages/q3-002.jpg")),
//!     ]);
//!
//! assert_eq!(doc.pages.len(), 2);
//! assert_eq!(doc.pages[1].page_number, 2);
//! ```

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

// ============================================================================
// CONVERSATION
// ============================================================================

/// Who sent a conversation message.
///
/// Serializes to lowercase (`"user"`, `"assistant"`) so callers can persist
/// histories in the same shape most chat APIs use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    /// Input from the human or calling application.
    User,
    /// A previous reply from the agent.
    Assistant,
}

/// One message of caller-supplied conversation history.
///
/// Histories are immutable during a query: the context processor reads them,
/// it never writes them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who sent the message.
    pub role: ConversationRole,

    /// The message text. Well-formed histories have non-empty content.
    pub content: String,

    /// When the message was created.
    #[serde(default = "SystemTime::now", skip)]
    pub timestamp: SystemTime,
}

impl ConversationMessage {
    /// Creates a user message timestamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Creates an assistant message timestamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
            timestamp: SystemTime::now(),
        }
    }
}

// ============================================================================
// DOCUMENTS AND PAGES
// ============================================================================

/// Opaque handle to a page image that a provider can resolve.
///
/// The agent never decodes images itself; providers turn the handle into the
/// vendor-specific inline form (base64 data URL, `source` block, …) at call
/// time.
///
/// # Example
///
/// ```
/// use docsight::ImageSource;
///
/// let from_disk = ImageSource::path("pages/report-004.png");
/// let from_web = ImageSource::url("https://example.com/page.jpg");
/// let in_memory = ImageSource::bytes(vec![0xFF, 0xD8, 0xFF], "image/jpeg");
///
/// assert_eq!(from_disk.media_type(), "image/png");
/// assert_eq!(from_web.media_type(), "image/jpeg");
/// assert_eq!(in_memory.media_type(), "image/jpeg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// A file on local disk, read lazily when a provider serializes it.
    Path { path: PathBuf },

    /// A remote image fetched over HTTP(S) when serialized.
    Url { url: String },

    /// Raw encoded image bytes already in memory.
    Bytes { data: Vec<u8>, media_type: String },
}

impl ImageSource {
    /// Handle for an image file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ImageSource::Path { path: path.into() }
    }

    /// Handle for a remote image URL.
    pub fn url(url: impl Into<String>) -> Self {
        ImageSource::Url { url: url.into() }
    }

    /// Handle for raw encoded bytes (e.g. a freshly rasterized page).
    pub fn bytes(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        ImageSource::Bytes {
            data,
            media_type: media_type.into(),
        }
    }

    /// Best-effort media type for this handle.
    ///
    /// Path and URL variants infer from the extension; unknown extensions
    /// default to JPEG, which is what page rasterizers emit in practice.
    pub fn media_type(&self) -> &str {
        fn from_ext(name: &str) -> &'static str {
            let lower = name.to_ascii_lowercase();
            if lower.ends_with(".png") {
                "image/png"
            } else if lower.ends_with(".webp") {
                "image/webp"
            } else if lower.ends_with(".gif") {
                "image/gif"
            } else {
                "image/jpeg"
            }
        }

        match self {
            ImageSource::Path { path } => from_ext(&path.to_string_lossy()),
            ImageSource::Url { url } => from_ext(url),
            ImageSource::Bytes { media_type, .. } => media_type,
        }
    }
}

/// Catalog row describing one stored document.
///
/// This is what the planner sees when deciding which documents a query
/// needs; the summary is produced once at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Stable id, unique within storage.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Short description of the document's contents, if one was produced.
    pub summary: Option<String>,
}

impl DocumentInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// One rasterized page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number, unique within its document.
    pub page_number: u32,

    /// Image handle the provider resolves when the page is sent to a model.
    pub image: ImageSource,

    /// Optional per-page summary produced at ingestion, shown to the page
    /// selector alongside the image.
    pub summary: Option<String>,
}

impl Page {
    pub fn new(page_number: u32, image: ImageSource) -> Self {
        Self {
            page_number,
            image,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// A stored document: identity plus its ordered pages.
///
/// Read-only to the agent; created by the document-processing collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable id, unique within storage.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Optional document summary produced at ingestion.
    pub summary: Option<String>,

    /// Pages in order, numbered 1..=N.
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            summary: None,
            pages: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_pages(mut self, pages: Vec<Page>) -> Self {
        self.pages = pages;
        self
    }

    /// The catalog row for this document.
    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            summary: self.summary.clone(),
        }
    }
}

// ============================================================================
// TASKS AND PLANS
// ============================================================================

/// Lifecycle state of an [`AgentTask`].
///
/// Transitions are monotonic: pending → in_progress → {completed, failed}.
/// [`TaskStatus::can_advance_to`] encodes the allowed edges; the agent loop
/// only ever moves forward along them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether moving from `self` to `next` follows the monotonic lifecycle.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed)
        )
    }

    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A focused sub-question bound to exactly one document.
///
/// Tasks are created by the planner (always `Pending`) and mutated only by
/// the agent loop as they execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Short task name, used in plan updates and synthesis.
    pub name: String,

    /// What the task should find out.
    pub description: String,

    /// The single document this task analyzes.
    pub document_id: String,

    /// Current lifecycle state.
    pub status: TaskStatus,

    /// Analysis text once completed.
    pub result: Option<String>,

    /// Why the task failed, when it did.
    pub failure: Option<ErrorKind>,
}

impl AgentTask {
    /// Creates a pending task.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            document_id: document_id.into(),
            status: TaskStatus::Pending,
            result: None,
            failure: None,
        }
    }

    /// Advances the task status along the monotonic lifecycle.
    ///
    /// Illegal transitions are a programming error in the agent loop, so
    /// they panic in debug builds and are ignored in release builds.
    pub fn advance(&mut self, next: TaskStatus) {
        debug_assert!(
            self.status.can_advance_to(next),
            "illegal task transition {:?} -> {:?}",
            self.status,
            next
        );
        if self.status.can_advance_to(next) {
            self.status = next;
        }
    }
}

/// The ordered task list for a single query plus the iteration counter.
///
/// Owned exclusively by the agent for the query's lifetime; the planner
/// operates on it as a pure `(plan, result) → plan'` transformation between
/// task executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    /// Tasks in execution order.
    pub tasks: Vec<AgentTask>,

    /// Completed (or failed) task cycles so far.
    pub iterations: u32,
}

impl TaskPlan {
    pub fn new(tasks: Vec<AgentTask>) -> Self {
        Self {
            tasks,
            iterations: 0,
        }
    }

    /// Index of the first pending task, if any.
    pub fn next_pending(&self) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| t.status == TaskStatus::Pending)
    }

    /// Number of tasks still pending.
    pub fn pending_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .count()
    }

    /// Tasks that completed successfully, in plan order.
    pub fn completed(&self) -> impl Iterator<Item = &AgentTask> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
    }

    /// Tasks that failed, in plan order.
    pub fn failed(&self) -> impl Iterator<Item = &AgentTask> {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Failed)
    }

    /// Drops every pending task. Used when the planner reports the
    /// completed work is sufficient.
    pub fn drop_pending(&mut self) {
        self.tasks.retain(|t| t.status != TaskStatus::Pending);
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// The outcome of one executed task: the pages the selector chose and the
/// analysis the executor obtained from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Name of the task this result belongs to.
    pub task_name: String,

    /// The task's assigned document. Every page below belongs to it.
    pub document_id: String,

    /// Pages the vision selector picked, in selection order.
    pub pages: Vec<Page>,

    /// The model's analysis of those pages.
    pub analysis: String,
}

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Full pipeline ran and synthesis produced the answer.
    Answered,
    /// The classifier decided no documents were needed.
    DirectAnswer,
    /// The caller canceled mid-query; the result holds whatever completed.
    Canceled,
    /// A pipeline-fatal error aborted the query (e.g. bad credentials).
    Failed,
}

/// Everything returned to the caller for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query exactly as the caller posed it.
    pub query: String,

    /// Final answer text. For aborted queries this is a machine-readable
    /// failure string such as `[error:auth] …`.
    pub answer: String,

    /// Union of all task page selections, first-occurrence order preserved
    /// across completed tasks.
    pub pages: Vec<Page>,

    /// Per-task results for completed tasks, in plan order.
    pub task_results: Vec<TaskResult>,

    /// State of every task at the end of the query, including failed and
    /// still-pending ones.
    pub tasks: Vec<AgentTask>,

    /// Task cycles used.
    pub iterations: u32,

    /// Wall-clock time the query took.
    #[serde(skip)]
    pub elapsed: Duration,

    /// How the query ended.
    pub outcome: QueryOutcome,
}
