//! # Configuration for the docsight agent
//!
//! [`AgentConfig`] is a plain record of every knob the pipeline reads:
//! provider selection, model overrides, plan/iteration caps, conversation
//! compression thresholds, timeouts, retry budget, and per-stage sampling
//! temperatures. Construct it through [`AgentConfig::builder()`] so required
//! invariants are validated once, up front, instead of failing mid-query.
//!
//! ## Examples
//!
//! ```rust
//! use docsight::{AgentConfig, ProviderKind};
//!
//! // Everything defaulted
//! let config = AgentConfig::default();
//! assert_eq!(config.max_agent_iterations, 5);
//!
//! // Tuned for a small deployment
//! let config = AgentConfig::builder()
//!     .provider(ProviderKind::Anthropic)
//!     .max_pages_per_task(4)
//!     .request_timeout_seconds(30)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.provider, ProviderKind::Anthropic);
//! ```

use crate::error::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// PROVIDER KIND
// ============================================================================

/// Which MLLM vendor the agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI chat-completions API (default).
    #[default]
    OpenAi,

    /// Anthropic messages API.
    Anthropic,

    /// OpenRouter's OpenAI-compatible gateway.
    OpenRouter,
}

impl ProviderKind {
    /// Environment variable holding this vendor's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    /// Case-insensitive parse of a provider name.
    ///
    /// ```
    /// use docsight::ProviderKind;
    /// use std::str::FromStr;
    ///
    /// assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    /// assert_eq!("open-router".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
    /// assert!("groq".parse::<ProviderKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" | "open_ai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openrouter" | "open-router" | "open_router" => Ok(ProviderKind::OpenRouter),
            other => Err(Error::config(format!(
                "Unknown provider: {} (supported: openai, anthropic, openrouter)",
                other
            ))),
        }
    }
}

// ============================================================================
// STAGE TEMPERATURES
// ============================================================================

/// Sampling temperature per pipeline stage.
///
/// Deterministic-leaning stages (classification, reformulation, page
/// selection, context summary) run cold; analysis and synthesis get a
/// little room to phrase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTemperatures {
    pub classification: f32,
    pub reformulation: f32,
    pub planning: f32,
    pub selection: f32,
    pub analysis: f32,
    pub synthesis: f32,
    pub summary: f32,
}

impl Default for StageTemperatures {
    fn default() -> Self {
        Self {
            classification: 0.1,
            reformulation: 0.1,
            planning: 0.2,
            selection: 0.1,
            analysis: 0.3,
            synthesis: 0.4,
            summary: 0.2,
        }
    }
}

impl StageTemperatures {
    fn validate(&self) -> Result<()> {
        let all = [
            ("classification", self.classification),
            ("reformulation", self.reformulation),
            ("planning", self.planning),
            ("selection", self.selection),
            ("analysis", self.analysis),
            ("synthesis", self.synthesis),
            ("summary", self.summary),
        ];
        for (stage, temp) in all {
            if !(0.0..=2.0).contains(&temp) {
                return Err(Error::config(format!(
                    "{} temperature must be between 0.0 and 2.0, got {}",
                    stage, temp
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// AGENT CONFIG
// ============================================================================

/// Configuration for the agent pipeline.
///
/// Fields are public and plain: the config is read-only once built, and no
/// global mutable state hides behind it. Defaults match a mid-size
/// deployment; see each field.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Which vendor to call.
    pub provider: ProviderKind,

    /// Text model override. `None` uses the provider's default.
    pub text_model: Option<String>,

    /// Vision model override. `None` uses the provider's default.
    pub vision_model: Option<String>,

    /// Hard cap on task cycles per query. Hitting it is a successful
    /// termination; synthesis runs over whatever completed.
    pub max_agent_iterations: u32,

    /// Most pages the selector may hand the executor per task.
    pub max_pages_per_task: usize,

    /// Most tasks a plan may hold at any time.
    pub max_tasks_per_plan: usize,

    /// User-turn count above which conversation history gets compressed.
    pub max_conversation_turns: usize,

    /// How many older turns the context processor summarizes.
    pub turns_to_summarize: usize,

    /// How many recent turns stay verbatim.
    pub turns_to_keep_full: usize,

    /// Per-request timeout applied to every provider call.
    pub request_timeout_seconds: u64,

    /// Retry budget for rate-limited/transient provider failures.
    pub retry_attempts: u32,

    /// Whether stored page summaries are included in selection prompts
    /// (only pages that actually have one emit a summary line).
    pub include_page_summaries_in_selection: bool,

    /// Token cap for short text stages (classification, reformulation,
    /// planning, summary).
    pub max_tokens_text: u32,

    /// Token cap for analysis and synthesis responses.
    pub max_tokens_analysis: u32,

    /// Per-stage sampling temperatures.
    pub temperatures: StageTemperatures,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            text_model: None,
            vision_model: None,
            max_agent_iterations: 5,
            max_pages_per_task: 6,
            max_tasks_per_plan: 4,
            max_conversation_turns: 8,
            turns_to_summarize: 5,
            turns_to_keep_full: 3,
            request_timeout_seconds: 60,
            retry_attempts: 3,
            include_page_summaries_in_selection: true,
            max_tokens_text: 1024,
            max_tokens_analysis: 2048,
            temperatures: StageTemperatures::default(),
        }
    }
}

impl AgentConfig {
    /// Creates a builder seeded with the defaults.
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.max_agent_iterations == 0 {
            return Err(Error::config("max_agent_iterations must be at least 1"));
        }
        if self.max_pages_per_task == 0 {
            return Err(Error::config("max_pages_per_task must be at least 1"));
        }
        if self.max_tasks_per_plan == 0 {
            return Err(Error::config("max_tasks_per_plan must be at least 1"));
        }
        if self.turns_to_keep_full > self.max_conversation_turns {
            return Err(Error::config(
                "turns_to_keep_full cannot exceed max_conversation_turns",
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(Error::config("request_timeout_seconds must be at least 1"));
        }
        self.temperatures.validate()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for [`AgentConfig`] with validation in [`build()`](Self::build).
///
/// Every setter has a default, so `AgentConfig::builder().build()` is always
/// valid; setters exist to override individual knobs.
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    /// Sets the provider vendor.
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = provider;
        self
    }

    /// Overrides the text model name.
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = Some(model.into());
        self
    }

    /// Overrides the vision model name.
    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    /// Caps task cycles per query.
    pub fn max_agent_iterations(mut self, n: u32) -> Self {
        self.config.max_agent_iterations = n;
        self
    }

    /// Caps pages per task.
    pub fn max_pages_per_task(mut self, n: usize) -> Self {
        self.config.max_pages_per_task = n;
        self
    }

    /// Caps tasks per plan.
    pub fn max_tasks_per_plan(mut self, n: usize) -> Self {
        self.config.max_tasks_per_plan = n;
        self
    }

    /// User-turn count that triggers history compression.
    pub fn max_conversation_turns(mut self, n: usize) -> Self {
        self.config.max_conversation_turns = n;
        self
    }

    /// Older turns to summarize when compressing.
    pub fn turns_to_summarize(mut self, n: usize) -> Self {
        self.config.turns_to_summarize = n;
        self
    }

    /// Recent turns kept verbatim when compressing.
    pub fn turns_to_keep_full(mut self, n: usize) -> Self {
        self.config.turns_to_keep_full = n;
        self
    }

    /// Per-request timeout in seconds.
    pub fn request_timeout_seconds(mut self, secs: u64) -> Self {
        self.config.request_timeout_seconds = secs;
        self
    }

    /// Retry budget for transient provider failures.
    pub fn retry_attempts(mut self, n: u32) -> Self {
        self.config.retry_attempts = n;
        self
    }

    /// Whether stored page summaries accompany images in selection prompts.
    pub fn include_page_summaries_in_selection(mut self, include: bool) -> Self {
        self.config.include_page_summaries_in_selection = include;
        self
    }

    /// Token cap for short text stages.
    pub fn max_tokens_text(mut self, n: u32) -> Self {
        self.config.max_tokens_text = n;
        self
    }

    /// Token cap for analysis/synthesis responses.
    pub fn max_tokens_analysis(mut self, n: u32) -> Self {
        self.config.max_tokens_analysis = n;
        self
    }

    /// Replaces all stage temperatures at once.
    pub fn temperatures(mut self, temps: StageTemperatures) -> Self {
        self.config.temperatures = temps;
        self
    }

    /// Validates and returns the final config.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a cap is zero, the turn split is
    /// inconsistent, or a temperature falls outside `0.0..=2.0`.
    pub fn build(self) -> Result<AgentConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
