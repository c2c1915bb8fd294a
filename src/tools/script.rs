//! Script execution tool.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;

use super::{Sandbox, ToolError};
use crate::llm::FunctionDeclaration;

/// How scripts are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRunner {
    /// Program the script path is passed to.
    pub interpreter: String,
    /// Required file name suffix, including the dot.
    pub extension: String,
    /// Human-readable language name used in messages.
    pub language: String,
    pub timeout: Duration,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            extension: ".py".to_string(),
            language: "Python".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Execute a script inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunScript {
    pub file_path: String,
}

impl RunScript {
    pub const NAME: &'static str = "run_python_file";

    /// Declaration advertised to the model for the configured language.
    pub fn declaration(runner: &ScriptRunner) -> FunctionDeclaration {
        FunctionDeclaration {
            name: Self::NAME.to_string(),
            description: format!(
                "Executes a {} file located in the working directory and returns its standard output and standard error.",
                runner.language
            ),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "file_path": {
                        "type": "STRING",
                        "description": format!(
                            "Path to the {} file to execute, relative to the working directory.",
                            runner.language
                        )
                    }
                }
            }),
        }
    }

    /// Run the script and format its output.
    pub async fn execute(
        &self,
        sandbox: &Sandbox,
        runner: &ScriptRunner,
    ) -> Result<String, ToolError> {
        let path = sandbox
            .resolve(Some(&self.file_path))
            .ok_or_else(|| ToolError::OutsideSandbox {
                action: "execute",
                path: self.file_path.clone(),
            })?;

        if tokio::fs::metadata(&path).await.is_err() {
            return Err(ToolError::ScriptNotFound(self.file_path.clone()));
        }

        // Checked on the requested name; the resolved path may be a symlink target.
        let has_extension = Path::new(&self.file_path)
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(runner.extension.as_str()))
            .unwrap_or(false);
        if !has_extension {
            return Err(ToolError::NotAScript {
                path: self.file_path.clone(),
                language: runner.language.clone(),
            });
        }

        tracing::info!("Executing script: {}", path.display());

        let output = tokio::time::timeout(
            runner.timeout,
            Command::new(&runner.interpreter)
                .arg(&path)
                .current_dir(sandbox.root())
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ToolError::Timeout {
            path: self.file_path.clone(),
            secs: runner.timeout.as_secs_f64(),
        })?
        .map_err(|source| ToolError::Io {
            action: "execute",
            path: self.file_path.clone(),
            source,
        })?;

        Ok(format_output(
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
            output.status,
        ))
    }
}

fn format_output(stdout: &str, stderr: &str, status: ExitStatus) -> String {
    let stdout = stdout.trim();
    let stderr = stderr.trim();

    let mut result = if stdout.is_empty() && stderr.is_empty() {
        "No output produced.".to_string()
    } else {
        format!("STDOUT: {stdout}\nSTDERR: {stderr}")
    };

    if !status.success() {
        match status.code() {
            Some(code) => result.push_str(&format!("\nProcess exited with code {code}")),
            None => result.push_str("\nProcess terminated by a signal"),
        }
    }

    result
}
