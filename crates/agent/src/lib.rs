//! Assistant runtime - the language-model side of a chat turn
//!
//! This crate wraps the deterministic flow engine from `kitfinder-core` with
//! the conversational layer that:
//! - Runs the flow turn for the user's session
//! - Frames the structured flow result as context for a language model
//! - Falls back to a deterministic template reply when no model is configured
//!   or the model call fails
//!
//! # Key Types
//!
//! - `AssistantRuntime` - Main orchestrator (see `runtime` module)
//! - `LlmClient` - Pluggable trait for Ollama/OpenAI-compatible backends
//! - `PromptBuilder` - Offline / empty / live-data prompt framing
//!
//! # Safety Principle
//!
//! The language model only phrases answers. Model, year, type and product
//! choices always come from the flow engine and the catalog.

pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod template;

pub use llm::{build_llm_client, HttpLlmClient, LlmClient};
pub use prompt::PromptBuilder;
pub use runtime::{AssistantReply, AssistantRuntime};
pub use template::TemplateResponder;
