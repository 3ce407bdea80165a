use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub storage: StorageSettings,
    pub speech: SpeechSettings,
    pub language_model: LanguageModelSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub account_url: String,
    /// Shared access signature appended to every blob request, without the leading `?`.
    pub sas_token: Option<String>,
    pub container_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechSettings {
    pub region: String,
    pub subscription_key: String,
    pub api_version: String,
    pub model_id: Option<String>,
    pub locale: String,
    pub speaker_count_min: u32,
    pub speaker_count_max: u32,
    pub punctuation_mode: String,
    pub profanity_filter_mode: String,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LanguageModelSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Token budget for the whole relabeling prompt.
    pub context_window: usize,
    pub max_completion_tokens: u32,
    pub temperature: f32,
    pub tokenizer_path: Option<String>,
    /// Model for the undiarized single-upload transcription service.
    pub transcription_model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    pub max_chunk_bytes: u64,
    pub audit_dir: String,
    pub chunk_dir: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("DIASCRIBE"),
            )
            .set_default(
                "storage.account_url",
                "https://speechtotextblobstorage.blob.core.windows.net",
            )?
            .set_default("storage.sas_token", None::<String>)?
            .set_default("storage.container_prefix", "diascribe")?
            .set_default("speech.region", "westeurope")?
            .set_default("speech.subscription_key", "")?
            .set_default("speech.api_version", "v3.2")?
            .set_default("speech.model_id", None::<String>)?
            .set_default("speech.locale", "uk-UA")?
            .set_default("speech.speaker_count_min", 1)?
            .set_default("speech.speaker_count_max", 3)?
            .set_default("speech.punctuation_mode", "DictatedAndAutomatic")?
            .set_default("speech.profanity_filter_mode", "Masked")?
            .set_default("speech.poll_interval_secs", 5)?
            .set_default("language_model.api_key", None::<String>)?
            .set_default("language_model.base_url", "https://api.openai.com/v1")?
            .set_default("language_model.model", "gpt-3.5-turbo")?
            .set_default("language_model.context_window", 4096)?
            .set_default("language_model.max_completion_tokens", 1000)?
            .set_default("language_model.temperature", 0.5)?
            .set_default("language_model.tokenizer_path", None::<String>)?
            .set_default("language_model.transcription_model", "whisper-1")?
            .set_default("pipeline.max_chunk_bytes", 25 * 1024 * 1024)?
            .set_default("pipeline.audit_dir", "transcripts")?
            .set_default("pipeline.chunk_dir", None::<String>)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
