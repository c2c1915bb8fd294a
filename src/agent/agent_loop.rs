//! Core agent loop implementation.

use std::sync::Arc;

use thiserror::Error;

use crate::conversation::Conversation;
use crate::llm::{Content, FunctionCall, GenerateRequest, LlmClient, LlmError, Role, UsageMetadata};
use crate::tools::{ToolResult, Toolbox};

use super::prompt::build_system_prompt;

/// Default cap on request/dispatch rounds.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Failures that abort a run. Tool failures never end up here.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug)]
pub enum AgentEvent<'a> {
    Iteration(usize),
    Usage(&'a UsageMetadata),
    ToolCall(&'a FunctionCall),
    ToolResult(&'a ToolResult),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The model answered without requesting tools.
    Completed { text: Option<String> },
    /// Every allowed round requested tools.
    IterationLimit { max_iterations: usize },
}

/// The result of [`Agent::run`], carrying the conversation back to the caller.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub outcome: AgentOutcome,
    pub conversation: Conversation,
    /// Number of model requests issued.
    pub iterations: usize,
    /// Token usage summed over all requests.
    pub usage: UsageMetadata,
}

/// The autonomous agent.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: Toolbox,
    max_iterations: usize,
}

impl Agent {
    /// Create an agent with the default iteration cap.
    pub fn new(llm: Arc<dyn LlmClient>, tools: Toolbox) -> Self {
        Self {
            llm,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Override the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the loop until the model stops calling tools or the cap is hit.
    pub async fn run(&self, conversation: Conversation) -> Result<AgentRun, AgentError> {
        self.run_with_events(conversation, |_| {}).await
    }

    /// Like [`Agent::run`], reporting progress through `on_event`.
    pub async fn run_with_events<F>(
        &self,
        mut conversation: Conversation,
        mut on_event: F,
    ) -> Result<AgentRun, AgentError>
    where
        F: FnMut(AgentEvent<'_>),
    {
        let system_prompt = build_system_prompt(&self.tools);
        let declarations = self.tools.declarations();
        let mut total = UsageMetadata::default();

        for iteration in 1..=self.max_iterations {
            tracing::debug!("Agent iteration {}", iteration);
            on_event(AgentEvent::Iteration(iteration));

            let response = self
                .llm
                .generate(GenerateRequest {
                    contents: conversation.turns(),
                    system_instruction: &system_prompt,
                    tools: &declarations,
                })
                .await?;

            if let Some(usage) = &response.usage {
                total.prompt_token_count += usage.prompt_token_count;
                total.candidates_token_count += usage.candidates_token_count;
                total.total_token_count += usage.total_token_count;
                on_event(AgentEvent::Usage(usage));
            }

            let calls = response.function_calls();
            let text = response.text();
            conversation.extend(response.candidates);

            // No tool calls - this is the final response
            if calls.is_empty() {
                return Ok(AgentRun {
                    outcome: AgentOutcome::Completed { text },
                    conversation,
                    iterations: iteration,
                    usage: total,
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                tracing::info!("Calling tool: {}", call.name);
                on_event(AgentEvent::ToolCall(call));

                let result = self.tools.dispatch(call).await;

                on_event(AgentEvent::ToolResult(&result));
                results.push(result);
            }

            if results.len() != calls.len() {
                return Err(AgentError::Protocol(format!(
                    "{} tool calls produced {} results",
                    calls.len(),
                    results.len()
                )));
            }

            conversation.push(Content {
                role: Role::Tool,
                parts: results.iter().map(ToolResult::to_part).collect(),
            });
        }

        tracing::debug!("Max iterations ({}) reached", self.max_iterations);
        Ok(AgentRun {
            outcome: AgentOutcome::IterationLimit {
                max_iterations: self.max_iterations,
            },
            conversation,
            iterations: self.max_iterations,
            usage: total,
        })
    }
}
