use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Anything that can turn a prompt into raw model text.
///
/// The recovery pipeline only ever sees the returned string; retries and
/// timeouts are the implementor's business.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, system_message: Option<&str>, prompt: &str) -> Result<String>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    OpenAI,
    Gemini,
}

impl LLMProviderType {
    /// Parse a provider name; unknown names fall back to OpenAI.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => LLMProviderType::Gemini,
            "openai" | "chatgpt" | "gpt" => LLMProviderType::OpenAI,
            _ => {
                info!("Unknown LLM provider '{}', defaulting to OpenAI", name);
                LLMProviderType::OpenAI
            }
        }
    }
}

/// Enum-based LLM provider implementation
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Gemini(GeminiProvider),
}

#[async_trait]
impl ModelClient for LLMProvider {
    async fn complete(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        match self {
            LLMProvider::OpenAI(provider) => provider.make_request(system_message, prompt).await,
            LLMProvider::Gemini(provider) => provider.make_request(system_message, prompt).await,
        }
    }

    fn provider_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(_) => "OpenAI",
            LLMProvider::Gemini(_) => "Gemini",
        }
    }

    fn model_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => &provider.model,
            LLMProvider::Gemini(provider) => &provider.model,
        }
    }
}

/// OpenAI chat-completions provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<LLMMessage>,
    response_format: OpenAIResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: LLMMessage,
}

impl OpenAIProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }

    pub async fn make_request(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys_msg) = system_message {
            messages.push(LLMMessage {
                role: "system".to_string(),
                content: sys_msg.to_string(),
            });
        }
        messages.push(LLMMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages,
            response_format: OpenAIResponseFormat { kind: "json_object" },
        };

        info!(
            provider = "OpenAI",
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = "OpenAI",
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(anyhow!("OpenAI API request failed ({}): {}", status, error_text));
        }

        let openai_response: OpenAIResponse = response.json().await?;
        let content = openai_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("No choices in OpenAI response"))?;

        info!(
            provider = "OpenAI",
            response_length = content.len(),
            "Successfully received LLM response"
        );

        Ok(content)
    }
}

/// Gemini generateContent provider
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model: model.unwrap_or_else(|| "gemini-2.0-flash".to_string()),
        }
    }

    pub async fn make_request(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        let full_prompt = match system_message {
            Some(sys_msg) => format!("{}\n\n{}", sys_msg, prompt),
            None => prompt.to_string(),
        };

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                // Lessons run long; a low cap is the usual cause of truncated JSON.
                max_output_tokens: 4096,
                response_mime_type: "application/json",
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        info!(
            provider = "Gemini",
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = "Gemini",
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(anyhow!("Gemini API request failed ({}): {}", status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let content = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No candidates in Gemini response"))?
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        info!(
            provider = "Gemini",
            response_length = content.len(),
            "Successfully received LLM response"
        );

        Ok(content)
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> LLMProvider {
        match provider_type {
            LLMProviderType::OpenAI => LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, model)),
            LLMProviderType::Gemini => LLMProvider::Gemini(GeminiProvider::new(api_key, base_url, model)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let openai = LLMProviderFactory::create_provider(LLMProviderType::OpenAI, "sk-test".to_string(), None, None);
        assert_eq!(openai.provider_name(), "OpenAI");
        assert_eq!(openai.model_name(), "gpt-4o-mini");

        let gemini = LLMProviderFactory::create_provider(
            LLMProviderType::Gemini,
            "AIza-test".to_string(),
            None,
            Some("gemini-1.5-pro".to_string()),
        );
        assert_eq!(gemini.provider_name(), "Gemini");
        assert_eq!(gemini.model_name(), "gemini-1.5-pro");
    }

    #[test]
    fn test_openai_request_asks_for_json_object() {
        let body = OpenAIRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![],
            response_format: OpenAIResponseFormat { kind: "json_object" },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_provider_name_parsing() {
        assert_eq!(LLMProviderType::from_name("Google"), LLMProviderType::Gemini);
        assert_eq!(LLMProviderType::from_name(" gpt "), LLMProviderType::OpenAI);
        assert_eq!(LLMProviderType::from_name("claude"), LLMProviderType::OpenAI);
    }
}
