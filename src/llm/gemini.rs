//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateRequest, LlmClient,
    LlmError, ModelResponse, Part, Role, UsageMetadata,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client for the given model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn generate_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model = self.model.trim();
        if model.starts_with("models/") {
            format!("{base}/{model}:generateContent")
        } else {
            format!("{base}/models/{model}:generateContent")
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse, LlmError> {
        let body = WireRequest::from_request(request);

        tracing::debug!(
            model = %self.model,
            turns = request.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let wire: WireResponse = serde_json::from_slice(&bytes)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(wire.into_response())
    }
}

// Wire format. Gemini parts are objects carrying exactly one payload key.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent>,
    system_instruction: WireContent,
    tools: [WireTool<'a>; 1],
}

impl<'a> WireRequest<'a> {
    fn from_request(request: GenerateRequest<'a>) -> Self {
        Self {
            contents: request.contents.iter().map(WireContent::from).collect(),
            system_instruction: WireContent {
                role: None,
                parts: vec![WirePart::text(request.system_instruction)],
            },
            tools: [WireTool {
                function_declarations: request.tools,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl WirePart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn into_part(self) -> Option<Part> {
        if let Some(call) = self.function_call {
            return Some(Part::FunctionCall(call));
        }
        if let Some(response) = self.function_response {
            return Some(Part::FunctionResponse(response));
        }
        if self.thought == Some(true) {
            return None;
        }
        self.text.map(Part::Text)
    }
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart::text(text),
            Part::FunctionCall(call) => WirePart {
                function_call: Some(call.clone()),
                ..WirePart::default()
            },
            Part::FunctionResponse(response) => WirePart {
                function_response: Some(response.clone()),
                ..WirePart::default()
            },
        }
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        // Function responses travel in user-role turns on the wire.
        let role = match content.role {
            Role::User | Role::Tool => "user",
            Role::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: content.parts.iter().map(WirePart::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
}

impl WireResponse {
    fn into_response(self) -> ModelResponse {
        let candidates = self
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .map(|content| Content {
                role: Role::Model,
                parts: content
                    .parts
                    .into_iter()
                    .filter_map(WirePart::into_part)
                    .collect(),
            })
            .collect();

        ModelResponse {
            candidates,
            usage: self.usage_metadata,
        }
    }
}
