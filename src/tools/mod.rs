//! Tools module - the four sandboxed operations available to the model.
//!
//! Tool calls are parsed into a closed [`ToolCall`] enum at the dispatch
//! boundary. Every tool returns `Result<String, ToolError>`; the
//! [`Toolbox`] turns either side into a [`ToolResult`] for the model.

mod files;
mod sandbox;
mod script;

pub use files::{ListDirectory, ReadFile, WriteFile, MAX_READ_CHARS};
pub use sandbox::Sandbox;
pub use script::{RunScript, ScriptRunner};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm::{FunctionCall, FunctionDeclaration, FunctionResponse, Part};

/// Failures a tool reports back to the model as text.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Cannot {action} \"{path}\" as it is outside the permitted working directory")]
    OutsideSandbox { action: &'static str, path: String },

    #[error("\"{0}\" is not a directory")]
    NotADirectory(String),

    #[error("File not found or is not a regular file: \"{0}\"")]
    NotAFile(String),

    #[error("File \"{0}\" not found.")]
    ScriptNotFound(String),

    #[error("\"{path}\" is not a {language} file.")]
    NotAScript { path: String, language: String },

    #[error("Timed out executing \"{path}\" after {secs} seconds")]
    Timeout { path: String, secs: f64 },

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("failed to {action} \"{path}\": {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListDirectory(ListDirectory),
    ReadFile(ReadFile),
    WriteFile(WriteFile),
    RunScript(RunScript),
    Unknown(String),
}

impl ToolCall {
    /// Parse a model function call into typed arguments.
    pub fn parse(call: &FunctionCall) -> Result<Self, ToolError> {
        let args = Value::Object(call.args.clone());
        Ok(match call.name.as_str() {
            ListDirectory::NAME => Self::ListDirectory(parse_args(ListDirectory::NAME, args)?),
            ReadFile::NAME => Self::ReadFile(parse_args(ReadFile::NAME, args)?),
            WriteFile::NAME => Self::WriteFile(parse_args(WriteFile::NAME, args)?),
            RunScript::NAME => Self::RunScript(parse_args(RunScript::NAME, args)?),
            other => Self::Unknown(other.to_string()),
        })
    }
}

fn parse_args<T: DeserializeOwned>(tool: &'static str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool,
        reason: e.to_string(),
    })
}

/// The outcome of one tool call, bound to the tool's name.
#[derive(Debug)]
pub struct ToolResult {
    pub name: String,
    pub outcome: Result<String, ToolError>,
}

impl ToolResult {
    /// Whether the tool failed.
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// The text shown to the model.
    pub fn text(&self) -> String {
        match &self.outcome {
            Ok(output) => output.clone(),
            Err(e) => format!("Error: {e}"),
        }
    }

    /// The function response part sent back to the model.
    pub fn to_part(&self) -> Part {
        let key = if self.is_error() { "error" } else { "result" };
        Part::FunctionResponse(FunctionResponse {
            name: self.name.clone(),
            response: json!({ key: self.text() }),
        })
    }
}

/// The tool set bound to one sandbox.
#[derive(Debug, Clone)]
pub struct Toolbox {
    sandbox: Sandbox,
    scripts: ScriptRunner,
}

impl Toolbox {
    /// Bind the tools to a sandbox and script runner.
    pub fn new(sandbox: Sandbox, scripts: ScriptRunner) -> Self {
        Self { sandbox, scripts }
    }

    /// Declarations sent to the model with every request.
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        vec![
            ListDirectory::declaration(),
            ReadFile::declaration(),
            RunScript::declaration(&self.scripts),
            WriteFile::declaration(),
        ]
    }

    /// Parse and run a model function call. Never fails; errors are part of
    /// the result.
    pub async fn dispatch(&self, call: &FunctionCall) -> ToolResult {
        let outcome = match ToolCall::parse(call) {
            Ok(parsed) => self.execute(parsed).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::warn!("Tool {} failed: {}", call.name, e);
        }
        ToolResult {
            name: call.name.clone(),
            outcome,
        }
    }

    /// Run an already parsed tool call.
    pub async fn execute(&self, call: ToolCall) -> Result<String, ToolError> {
        match call {
            ToolCall::ListDirectory(tool) => tool.execute(&self.sandbox).await,
            ToolCall::ReadFile(tool) => tool.execute(&self.sandbox).await,
            ToolCall::WriteFile(tool) => tool.execute(&self.sandbox).await,
            ToolCall::RunScript(tool) => tool.execute(&self.sandbox, &self.scripts).await,
            ToolCall::Unknown(name) => Err(ToolError::UnknownFunction(name)),
        }
    }
}
