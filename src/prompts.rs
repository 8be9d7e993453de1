//! System prompts for every pipeline stage.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON contract each parser expects is
//!    stated in exactly one place, next to the words that ask the model for
//!    it.
//!
//! 2. **Testability** — unit and integration tests can inspect prompts
//!    directly without a live model, so a contract drift between prompt and
//!    parser shows up as a failing test.

/// Summarizes the older slice of a long conversation into compact context.
pub const CONTEXT_SUMMARY_PROMPT: &str = r#"You summarize conversation history for a document analysis assistant.

Produce a compact factual summary of the conversation below. Rules:

1. Keep concrete facts: names, figures, document references, conclusions reached.
2. Keep unresolved questions the user still cares about.
3. Drop greetings, chit-chat, and repetition.
4. Write 3-6 sentences of plain prose. No bullet points, no commentary about
   the summarization itself."#;

/// Rewrites an elliptical query into a self-contained one.
///
/// Expected reply: `{"reformulated": string, "changed": bool}`.
pub const REFORMULATION_PROMPT: &str = r#"You rewrite user queries for a document analysis assistant.

Given conversation context and the latest user query, rewrite the query so it
stands alone: resolve pronouns, "it", "that report", "the previous figure",
and similar references using the context.

Rules:

1. Preserve the user's intent exactly. Never add new asks.
2. If the query is already self-contained, do not change it.
3. Reply with ONLY a JSON object:
   {"reformulated": "<the standalone query>", "changed": <true|false>}"#;

/// Decides whether a query needs document analysis at all.
///
/// Expected reply:
/// `{"needs_documents": bool, "reasoning": string, "direct_answer": string?}`.
pub const CLASSIFICATION_PROMPT: &str = r#"You are the gatekeeper for a document analysis assistant.

Decide whether answering the user's query requires looking inside the stored
documents.

1. Greetings, questions about your capabilities, general knowledge the user
   clearly wants answered directly: no documents needed. Provide the direct
   answer yourself.
2. Anything that depends on the contents of the stored documents: documents
   needed.
3. When unsure, choose document analysis.

Reply with ONLY a JSON object:
{"needs_documents": <true|false>, "reasoning": "<one sentence>", "direct_answer": "<answer, only when needs_documents is false>"}"#;

/// Builds the initial task plan over the document catalog.
///
/// Expected reply: a JSON array of `{"name", "description", "document_id"}`.
pub const PLANNING_PROMPT: &str = r#"You plan document analysis for a vision-based assistant.

You receive a user query and a catalog of available documents (id, name,
summary). Break the query into 2-4 focused tasks.

Rules:

1. Each task analyzes EXACTLY ONE document; put that document's id in
   "document_id". Never list several ids for one task.
2. Only use document ids from the catalog.
3. Order tasks so earlier results inform later ones.
4. Task names are short slugs; descriptions say precisely what to find.
5. Reply with ONLY a JSON array:
   [{"name": "<slug>", "description": "<what to find>", "document_id": "<catalog id>"}, ...]"#;

/// Appended when the first plan attempt violated the one-document rule.
pub const PLANNING_RETRY_NOTE: &str = r#"Your previous plan assigned multiple documents to a single task. Re-emit the
plan so every task carries exactly one "document_id" from the catalog. Split a
multi-document task into one task per document if needed."#;

/// Revises the plan after each completed task.
///
/// Expected reply: one edit object or an array of edit objects, each
/// `{"action": "keep"|"modify"|"remove"|"add"|"sufficient", …}`.
pub const PLAN_UPDATE_PROMPT: &str = r#"You adapt an in-flight document analysis plan.

You receive the task that just finished (with its analysis), the results so
far, and the remaining pending tasks. Decide whether the remaining plan still
makes sense.

Rules:

1. If the completed results already answer the user's query, reply
   {"action": "sufficient"} and nothing else.
2. To leave the plan untouched, reply {"action": "keep"}.
3. To sharpen a pending task, reply
   {"action": "modify", "task": "<task name>", "description": "<new description>"}.
4. To drop a now-redundant pending task, reply
   {"action": "remove", "task": "<task name>"}.
5. To add AT MOST ONE follow-up task, reply
   {"action": "add", "name": "<slug>", "description": "<what to find>", "document_id": "<catalog id>"}.
6. Completed and running tasks cannot be edited.
7. Reply with ONLY a JSON object, or a JSON array of such objects when you
   suggest several edits."#;

/// Picks the relevant pages of one document for one task.
///
/// Expected reply: `{"selected_pages": [int, …], "reasoning": string}`.
pub const SELECTION_PROMPT: &str = r#"You select document pages for a vision-based analysis task.

You are shown every page of one document as an image. Each image is preceded
by a marker like [Page 3]; some pages also carry a stored summary line.

Rules:

1. Pick the pages most relevant to the task. Prefer few, dense pages over
   many thin ones.
2. Use the 1-based page numbers from the [Page k] markers.
3. Reply with ONLY a JSON object:
   {"selected_pages": [<page numbers>], "reasoning": "<one sentence>"}"#;

/// Analyzes the selected pages for one task.
pub const ANALYSIS_PROMPT: &str = r#"You analyze document pages for a specific task.

You receive the user's query, one focused task description, and the selected
page images (each preceded by its [Page k] marker).

Rules:

1. Answer the task from what is visible on the pages. Read tables, charts,
   and figures carefully.
2. Cite page numbers for every claim, e.g. "(page 3)".
3. If the pages do not contain the requested information, say so plainly.
4. Reply in concise prose. No JSON, no markdown fences."#;

/// Combines completed task analyses into the final answer.
pub const SYNTHESIS_PROMPT: &str = r#"You write the final answer for a document analysis assistant.

You receive the user's query and the analyses produced by each completed
task. Combine them into one coherent answer.

Rules:

1. Ground every statement in the task analyses. Do not invent content.
2. Resolve overlaps; if analyses disagree, say which pages support which
   reading.
3. Keep page citations from the analyses, e.g. "(page 3)".
4. If the analyses only partially cover the query, state what is missing.
5. Reply in plain prose addressed to the user."#;
