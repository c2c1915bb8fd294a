//! Agent module - the core autonomous agent logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed the conversation with the user prompt
//! 2. Call the model with the system prompt and tool declarations
//! 3. If the model requests tool calls, run them all and feed the results back
//! 4. Repeat until the model answers in text or max iterations are reached

mod agent_loop;
mod prompt;

pub use agent_loop::{
    Agent, AgentError, AgentEvent, AgentOutcome, AgentRun, DEFAULT_MAX_ITERATIONS,
};
pub use prompt::build_system_prompt;
