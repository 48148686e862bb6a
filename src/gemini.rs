use crate::{config::AppConfig, error::GeminiError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, error};

/// Anything that can turn a prompt into a text completion.
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str, timeout: Duration) -> Result<String, GeminiError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.gemini_api_key.clone(), config.gemini_api_base.clone())
    }

    fn is_demo(&self) -> bool {
        self.api_key == crate::config::DEMO_API_KEY
    }

    async fn perform_api_call(&self, model: &str, prompt: &str) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, model, self.api_key);
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let payload = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "responseMimeType": "application/json"
            }
        });

        let response = self.client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| GeminiError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ Gemini API text generation failed with status {}: {}", status, response_text);
            return Err(GeminiError::Http(format!("HTTP {}: {}", status, response_text)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("Failed to parse response: {}", e)))?;

        extract_first_text(&parsed).ok_or(GeminiError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerationClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str, timeout: Duration) -> Result<String, GeminiError> {
        if self.is_demo() {
            info!("Using demo mode - skipping Gemini call");
            return Err(GeminiError::DemoMode);
        }

        info!("Generating text with Gemini model {} (timeout {:?})", model, timeout);
        match tokio::time::timeout(timeout, self.perform_api_call(model, prompt)).await {
            Ok(result) => {
                if let Ok(text) = &result {
                    info!("📥 Gemini returned {} chars", text.len());
                }
                result
            }
            Err(_) => Err(GeminiError::Timeout(timeout)),
        }
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde::de::IgnoredAny),
}

fn extract_first_text(resp: &GeminiResponse) -> Option<String> {
    resp.candidates
        .first()?
        .content
        .parts
        .iter()
        .find_map(|p| match p {
            Part::Text { text } if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Always fails, as a dead network or exhausted quota would.
    pub struct FailingClient;

    #[async_trait]
    impl TextGenerationClient for FailingClient {
        async fn generate(&self, _model: &str, _prompt: &str, _timeout: Duration) -> Result<String, GeminiError> {
            Err(GeminiError::Http("connection refused".into()))
        }
    }

    /// Returns a fixed completion and remembers the prompts it was given.
    pub struct CannedClient {
        reply: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        pub fn new(reply: impl Into<String>) -> Self {
            Self { reply: reply.into(), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl TextGenerationClient for CannedClient {
        async fn generate(&self, _model: &str, prompt: &str, _timeout: Duration) -> Result<String, GeminiError> {
            self.prompts.lock().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    /// Base URL of a local server that accepts connections and never answers.
    pub async fn silent_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }
}
