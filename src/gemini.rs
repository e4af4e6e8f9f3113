//! Blocking client for the Gemini `generateContent` endpoint.
//!
//! The wire format here is entirely dictated by the external API: a
//! `contents` array of role/parts entries, generation parameters, and a
//! safety-settings block. Requests run on a worker thread, so blocking
//! I/O is fine.

use crate::config::Config;
use crate::session::{Message, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Safety categories sent with every request.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Error envelope the API returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    /// No usable API key in the environment or config file.
    MissingKey,
    /// Transport-level failure (DNS, refused connection, timeout).
    Network(String),
    /// The API answered with a non-2xx status.
    Http { status: u16, message: String },
    /// 2xx response without any candidate text.
    Empty,
    /// Response body that does not parse as the expected shape.
    Malformed(String),
}

impl ApiError {
    /// The transcript-facing message for this error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::MissingKey => format!(
                "API key error: set {} or add api_key to your config file.",
                crate::config::API_KEY_ENV_VAR
            ),
            ApiError::Network(_) => {
                "Network error: unable to reach the Gemini API. Check your connection.".to_string()
            }
            ApiError::Http { status, message } => {
                let lower = message.to_lowercase();
                if *status == 401 || *status == 403 || lower.contains("unauthorized") {
                    "Authentication error: invalid API key. Check your credentials.".to_string()
                } else if *status == 429 {
                    "Rate limit: too many requests. Wait a moment and try again.".to_string()
                } else if lower.contains("quota") || lower.contains("limit") {
                    "Quota exceeded: API quota limit reached. Try again later.".to_string()
                } else {
                    format!("Error: {message}")
                }
            }
            ApiError::Empty => "Error: no response generated from the AI.".to_string(),
            ApiError::Malformed(msg) => format!("Error: unexpected API response ({msg})."),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::MissingKey => write!(f, "API key not configured"),
            ApiError::Network(msg) => write!(f, "Network error: {msg}"),
            ApiError::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            ApiError::Empty => write!(f, "No response generated"),
            ApiError::Malformed(msg) => write!(f, "Malformed response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

pub struct GeminiClient {
    agent: ureq::Agent,
    api_base: String,
    model: String,
    api_key: String,
    generation: WireGenerationConfig,
}

impl GeminiClient {
    /// Build a client from the config, resolving the API key. Fails with
    /// `MissingKey` when no key is configured.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let api_key = config.resolved_api_key().ok_or(ApiError::MissingKey)?;
        Ok(Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            generation: WireGenerationConfig {
                temperature: config.generation.temperature,
                top_k: config.generation.top_k,
                top_p: config.generation.top_p,
                max_output_tokens: config.generation.max_output_tokens,
            },
        })
    }

    /// Send `prompt` with optional conversation context and return the
    /// reply text.
    pub fn generate(&self, prompt: &str, history: &[Message]) -> Result<String, ApiError> {
        let request = GenerateRequest {
            contents: build_contents(prompt, history),
            generation_config: self.generation.clone(),
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let body = serde_json::to_string(&request).map_err(|e| ApiError::Malformed(e.to_string()))?;

        tracing::debug!(model = %self.model, history = history.len(), "Sending generate request");

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body);

        match response {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .map_err(|e| ApiError::Network(e.to_string()))?;
                extract_reply(&text)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                let message = serde_json::from_str::<ErrorResponse>(&text)
                    .ok()
                    .and_then(|e| e.error)
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| format!("API request failed with status {status}"));
                tracing::warn!(status, %message, "Generate request failed");
                Err(ApiError::Http { status, message })
            }
            Err(ureq::Error::Transport(t)) => {
                tracing::warn!("Transport error talking to the API: {t}");
                Err(ApiError::Network(t.to_string()))
            }
        }
    }
}

/// Assemble the `contents` array: map the context window to role/parts
/// entries and append the prompt as a final user entry; with no context,
/// send a single role-less entry.
fn build_contents(prompt: &str, history: &[Message]) -> Vec<Content> {
    if history.is_empty() {
        return vec![Content {
            role: None,
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }];
    }

    let mut contents: Vec<Content> = history
        .iter()
        .map(|msg| Content {
            role: Some(match msg.role {
                Role::User => "user",
                Role::Assistant => "model",
            }),
            parts: vec![Part {
                text: msg.content.clone(),
            }],
        })
        .collect();
    contents.push(Content {
        role: Some("user"),
        parts: vec![Part {
            text: prompt.to_string(),
        }],
    });
    contents
}

fn extract_reply(body: &str) -> Result<String, ApiError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Empty)
}
