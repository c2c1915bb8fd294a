//! System prompt for the agent.

use crate::tools::Toolbox;

/// Build the system instruction with tool descriptions.
pub fn build_system_prompt(tools: &Toolbox) -> String {
    let tool_descriptions = tools
        .declarations()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful AI coding agent.

When a user asks a question or makes a request, make a function call plan. You can perform the following operations:

{tool_descriptions}

## Rules

1. All paths you provide must be relative to the working directory. Paths outside it are rejected.
2. Do not pass the working directory in your function calls; it is injected automatically.
3. Read a file before changing it, unless you are creating it from scratch.
4. If a function returns an error, read it carefully and adjust your plan.

When you are finished, answer the user in plain text without calling any function."#,
        tool_descriptions = tool_descriptions
    )
}
