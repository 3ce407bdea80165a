use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use diascribe_config::LanguageModelSettings;
use diascribe_transcription::{DirectTranscriber, LanguageModel};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible chat completion client.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(api_key: Option<String>, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn from_settings(settings: &LanguageModelSettings) -> Self {
        Self::new(
            settings.api_key.clone(),
            settings.base_url.clone(),
            settings.model.clone(),
        )
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

fn first_choice(response: ChatResponse) -> anyhow::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow!("Chat completion returned no content"))
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Language model API key not configured"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Chat completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Chat completion error {}: {}", status, body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion")?;
        let content = first_choice(parsed)?;
        debug!(model = %self.model, chars = content.len(), "Chat completion received");
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible `/audio/transcriptions` client. Answers each upload
/// with plain text and no speaker labels.
#[derive(Debug, Clone)]
pub struct OpenAiWhisper {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    language: Option<String>,
}

impl OpenAiWhisper {
    pub fn new(api_key: Option<String>, base_url: String, model: String, language: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            language: language.filter(|l| !l.is_empty()),
        }
    }

    /// Shares the chat model's credentials. `locale` is the speech locale,
    /// e.g. `uk-UA`.
    pub fn from_settings(settings: &LanguageModelSettings, locale: &str) -> Self {
        Self::new(
            settings.api_key.clone(),
            settings.base_url.clone(),
            settings.transcription_model.clone(),
            language_of(locale),
        )
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// ISO-639-1 language code of a BCP-47 locale.
fn language_of(locale: &str) -> Option<String> {
    let language = locale.split(['-', '_']).next()?.trim().to_ascii_lowercase();
    (language.len() == 2).then_some(language)
}

#[async_trait]
impl DirectTranscriber for OpenAiWhisper {
    async fn transcribe(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Transcription API key not configured"))?;

        let size = bytes.len();
        let file = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let mut form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "text");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Transcription request for {} failed", file_name))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Transcription error {}: {}", status, body);
        }

        let text = response
            .text()
            .await
            .context("Failed to read transcription")?;
        debug!(model = %self.model, file = %file_name, size, chars = text.len(), "Transcription received");
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}
