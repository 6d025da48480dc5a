//! Gemini generative-AI client (`generateContent` REST endpoint)
//!
//! Answers are cached in the cache store under the SHA-256 of the request
//! contents, so repeating a conversation turn costs no API call.

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};
use crate::i18n::{current_locale, t};

const SOURCE: &str = "gemini";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Sampling settings sent with every request
const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<ChatRole>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn to_contents(history: &[ChatMessage], prompt: &str) -> Vec<Content> {
    history
        .iter()
        .cloned()
        .chain(std::iter::once(ChatMessage::user(prompt)))
        .map(|message| Content {
            role: Some(message.role),
            parts: vec![Part { text: message.text }],
        })
        .collect()
}

/// Cache key of a conversation: SHA-256 over model and turns
pub fn cache_key(model: &str, history: &[ChatMessage], prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    for message in history.iter().chain(std::iter::once(&ChatMessage::user(prompt))) {
        hasher.update([message.role as u8]);
        hasher.update(message.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("gemini-{:x}", hasher.finalize())
}

/// Answer a prompt given the previous turns
///
/// # Errors
///
/// Returns `AppError::Configuration` if no API key is configured, the
/// interceptor's error if the request fails, and `AppError::DataProcessing`
/// if the answer is blocked or empty.
pub async fn chat(ctx: &AppContext, history: &[ChatMessage], prompt: &str) -> Result<String> {
    let gemini = &ctx.config().gemini;
    let Some(api_key) = gemini.api_key.as_deref() else {
        return Err(AppError::configuration(
            Some("GEMINI_API_KEY"),
            t!("sources.gemini_key_missing").to_string(),
        ));
    };
    if prompt.trim().is_empty() {
        return Err(AppError::validation(Some("prompt"), "prompt is empty"));
    }

    let key = cache_key(&gemini.model, history, prompt);
    if let Some(answer) = ctx.cache().get::<String>(&key) {
        return Ok(answer);
    }

    let url = join_url(
        &gemini.base_url,
        &format!("models/{}:generateContent", gemini.model),
    );
    let key_value = HeaderValue::from_str(api_key).map_err(|_| {
        AppError::configuration(Some("GEMINI_API_KEY"), "API key is not a valid header value")
    })?;
    let options = ctx
        .client()
        .options()
        .service(SOURCE)
        .direct()
        .header(HeaderName::from_static(API_KEY_HEADER), key_value);

    let body = GenerateRequest {
        contents: to_contents(history, prompt),
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    };

    let response: GenerateResponse = ctx.client().post(&url, &body, options).await?;
    let answer = extract_answer(response)?;
    tracing::debug!(model = %gemini.model, chars = answer.len(), "Gemini answer received");

    ctx.cache().set(&key, &answer);
    Ok(answer)
}

fn extract_answer(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AppError::data_processing(format!("Prompt blocked: {reason}")));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::data_processing("Gemini returned an empty answer"));
    }
    Ok(text.trim().to_string())
}

/// Prompt asking for a short country overview in the active locale
pub fn summary_prompt(country: &Country) -> String {
    let language = if current_locale() == "tr" {
        "Turkish"
    } else {
        "English"
    };
    format!(
        "Write a short, neutral overview of {} ({}) covering its political situation, \
         economy and notable recent developments. Answer in {language} in at most \
         three paragraphs.",
        country.en, country.cca3
    )
}

/// Generated overview of a country
pub async fn country_summary(ctx: &AppContext, country: &Country) -> SourceOutcome<String> {
    if ctx.config().gemini.api_key.is_none() {
        return SourceOutcome::unavailable(t!("sources.gemini_key_missing"));
    }
    settle(SOURCE, chat(ctx, &[], &summary_prompt(country)).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: to_contents(&[ChatMessage::user("Hi"), ChatMessage::model("Hello")], "GDP?"),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "GDP?");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_extract_answer() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Ankara "},{"text":"is the capital."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_answer(response).unwrap(), "Ankara is the capital.");
    }

    #[test]
    fn test_blocked_prompt() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = extract_answer(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_cache_key_depends_on_history() {
        let a = cache_key("m", &[], "hello");
        let b = cache_key("m", &[ChatMessage::model("x")], "hello");
        assert_ne!(a, b);
        assert_eq!(a, cache_key("m", &[], "hello"));
        assert!(a.starts_with("gemini-"));
    }
}
