//! LLM client module.
//!
//! Defines the conversation data types exchanged with the model and the
//! [`LlmClient`] trait the agent loop talks to. [`GeminiClient`] is the
//! production implementation.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while talking to the model service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

/// A tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// The outcome of a tool invocation, bound back to the tool's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// One piece of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A model turn holding a single text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenation of all text parts, or `None` if the turn carries no text.
    pub fn text(&self) -> Option<String> {
        let mut out: Option<String> = None;
        for part in &self.parts {
            if let Part::Text(text) = part {
                out.get_or_insert_with(String::new).push_str(text);
            }
        }
        out
    }

    /// Function calls in this turn, in order.
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }
}

/// A tool made available to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the parameters object.
    pub parameters: Value,
}

/// Token accounting reported by the model service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

/// Everything the model needs for one request.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub contents: &'a [Content],
    pub system_instruction: &'a str,
    pub tools: &'a [FunctionDeclaration],
}

/// The model's answer to one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Candidate turns, in the order returned.
    pub candidates: Vec<Content>,
    pub usage: Option<UsageMetadata>,
}

impl ModelResponse {
    /// Every function call across all candidates, in order.
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.candidates
            .iter()
            .flat_map(|c| c.function_calls())
            .cloned()
            .collect()
    }

    /// Text of the first candidate that carries any.
    pub fn text(&self) -> Option<String> {
        self.candidates.iter().find_map(Content::text)
    }
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the full conversation and return the model's response.
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse, LlmError>;
}
