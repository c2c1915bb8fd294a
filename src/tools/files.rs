//! File system tools: list, read and write inside the sandbox.

use serde::Deserialize;
use serde_json::json;

use super::{Sandbox, ToolError};
use crate::llm::FunctionDeclaration;

/// Reads return at most this many characters.
pub const MAX_READ_CHARS: usize = 10_000;

/// List the entries of a directory with their sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListDirectory {
    #[serde(default)]
    pub directory: Option<String>,
}

impl ListDirectory {
    pub const NAME: &'static str = "get_files_info";

    /// Declaration advertised to the model.
    pub fn declaration() -> FunctionDeclaration {
        FunctionDeclaration {
            name: Self::NAME.to_string(),
            description: "Lists files in the specified directory along with their sizes, constrained to the working directory.".to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "directory": {
                        "type": "STRING",
                        "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                    }
                }
            }),
        }
    }

    /// List the directory, one line per entry.
    pub async fn execute(&self, sandbox: &Sandbox) -> Result<String, ToolError> {
        let display = self.directory.clone().unwrap_or_else(|| ".".to_string());
        let dir = sandbox
            .resolve(self.directory.as_deref())
            .ok_or_else(|| ToolError::OutsideSandbox {
                action: "list",
                path: display.clone(),
            })?;

        if !tokio::fs::metadata(&dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ToolError::NotADirectory(display));
        }

        let io_err = |source| ToolError::Io {
            action: "list",
            path: display.clone(),
            source,
        };

        let mut lines = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            // Follows symlinks; a dangling link reports the link itself.
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(_) => entry.metadata().await.map_err(io_err)?,
            };
            lines.push(format!(
                "- {}: file_size={} bytes, is_dir={}",
                entry.file_name().to_string_lossy(),
                metadata.len(),
                if metadata.is_dir() { "True" } else { "False" }
            ));
        }

        Ok(lines.join("\n"))
    }
}

/// Read a text file, truncated to [`MAX_READ_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadFile {
    pub file_path: String,
}

impl ReadFile {
    pub const NAME: &'static str = "get_file_content";

    /// Declaration advertised to the model.
    pub fn declaration() -> FunctionDeclaration {
        FunctionDeclaration {
            name: Self::NAME.to_string(),
            description: format!(
                "Reads and returns the content of a specified file within the working directory. Output is truncated after {MAX_READ_CHARS} characters."
            ),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "file_path": {
                        "type": "STRING",
                        "description": "Path to the file to read, relative to the working directory."
                    }
                }
            }),
        }
    }

    /// Read the file, truncating long content.
    pub async fn execute(&self, sandbox: &Sandbox) -> Result<String, ToolError> {
        let path = sandbox
            .resolve(Some(&self.file_path))
            .ok_or_else(|| ToolError::OutsideSandbox {
                action: "read",
                path: self.file_path.clone(),
            })?;

        if !tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(ToolError::NotAFile(self.file_path.clone()));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ToolError::Io {
                action: "read",
                path: self.file_path.clone(),
                source,
            })?;

        Ok(truncate_chars(content, &self.file_path))
    }
}

fn truncate_chars(mut content: String, file_path: &str) -> String {
    match content.char_indices().nth(MAX_READ_CHARS) {
        Some((cut, _)) => {
            content.truncate(cut);
            content.push_str(&format!(
                "[...File \"{file_path}\" truncated at {MAX_READ_CHARS} characters]"
            ));
            content
        }
        None => content,
    }
}

/// Create or overwrite a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteFile {
    pub file_path: String,
    pub content: String,
}

impl WriteFile {
    pub const NAME: &'static str = "write_file";

    /// Declaration advertised to the model.
    pub fn declaration() -> FunctionDeclaration {
        FunctionDeclaration {
            name: Self::NAME.to_string(),
            description: "Writes content to a file within the working directory, creating parent directories as needed and overwriting any existing file.".to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "file_path": {
                        "type": "STRING",
                        "description": "Path to the file to write to, relative to the working directory."
                    },
                    "content": {
                        "type": "STRING",
                        "description": "The content to write into the file."
                    }
                }
            }),
        }
    }

    /// Write the file, creating parent directories.
    pub async fn execute(&self, sandbox: &Sandbox) -> Result<String, ToolError> {
        let path = sandbox
            .resolve(Some(&self.file_path))
            .ok_or_else(|| ToolError::OutsideSandbox {
                action: "write to",
                path: self.file_path.clone(),
            })?;

        let io_err = |source| ToolError::Io {
            action: "write to",
            path: self.file_path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, &self.content)
            .await
            .map_err(io_err)?;

        Ok(format!(
            "Successfully wrote to \"{}\" ({} characters written)",
            self.file_path,
            self.content.chars().count()
        ))
    }
}
