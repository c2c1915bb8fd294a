//! # sandbox-agent
//!
//! A minimal coding agent confined to one working directory.
//!
//! This library provides:
//! - A tool-based agent loop driven by an LLM
//! - Four sandboxed tools: list directory, read file, write file, run script
//! - A Gemini `generateContent` client
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Seed the conversation with the user prompt
//! 2. Call the model with the system prompt and tool declarations
//! 3. Run every requested tool call inside the sandbox
//! 4. Feed the results back, repeat until the model answers in text
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sandbox_agent::{agent::Agent, conversation::Conversation, llm::GeminiClient};
//! use sandbox_agent::tools::{Sandbox, ScriptRunner, Toolbox};
//!
//! let tools = Toolbox::new(Sandbox::new("./calculator")?, ScriptRunner::default());
//! let agent = Agent::new(Arc::new(GeminiClient::new(api_key, "gemini-2.0-flash-001")), tools);
//! let run = agent.run(Conversation::from_prompt("fix the bug in main.py")).await?;
//! ```

pub mod agent;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod tools;

pub use config::Config;
