use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use diascribe_config::SpeechSettings;
use diascribe_transcription::{
    BackendResult, DiarizationConfig, JobStatus, ResultFile, ResultKind, TranscriptionBackend,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Azure Speech batch transcription (speechtotext REST API).
pub struct AzureSpeechBackend {
    client: Client,
    endpoint: String,
    subscription_key: String,
    model_id: Option<String>,
}

impl AzureSpeechBackend {
    pub fn new(
        region: &str,
        api_version: &str,
        subscription_key: String,
        model_id: Option<String>,
    ) -> Self {
        Self::with_endpoint(
            format!(
                "https://{}.api.cognitive.microsoft.com/speechtotext/{}",
                region, api_version
            ),
            subscription_key,
            model_id,
        )
    }

    pub fn with_endpoint(
        endpoint: String,
        subscription_key: String,
        model_id: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_key,
            model_id: model_id.filter(|m| !m.is_empty()),
        }
    }

    pub fn from_settings(settings: &SpeechSettings) -> Self {
        Self::new(
            &settings.region,
            &settings.api_version,
            settings.subscription_key.clone(),
            settings.model_id.clone(),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(SUBSCRIPTION_HEADER, &self.subscription_key)
    }

    fn definition(&self, sources: &[String], config: &DiarizationConfig) -> Value {
        let mut body = json!({
            "contentUrls": sources,
            "locale": config.locale,
            "displayName": "Transcription",
            "description": "Diarized batch transcription",
            "properties": {
                "wordLevelTimestampsEnabled": false,
                "displayFormWordLevelTimestampsEnabled": false,
                "diarizationEnabled": true,
                "diarization": {
                    "speakers": {
                        "minCount": config.speaker_count_min,
                        "maxCount": config.speaker_count_max,
                    }
                },
                "punctuationMode": config.punctuation_mode,
                "profanityFilterMode": config.profanity_filter_mode,
            }
        });
        if let Some(model_id) = &self.model_id {
            body["model"] = json!({ "self": format!("{}/models/base/{}", self.endpoint, model_id) });
        }
        body
    }
}

async fn ensure_success(response: Response, what: &str) -> anyhow::Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    bail!("{} error {}: {}", what, status, body)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptionStatusBody {
    status: String,
    #[serde(default)]
    properties: Option<StatusProperties>,
}

#[derive(Debug, Deserialize)]
struct StatusProperties {
    error: Option<StatusError>,
}

#[derive(Debug, Deserialize)]
struct StatusError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilesPage {
    #[serde(default)]
    values: Vec<FileEntry>,
    #[serde(rename = "@nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    kind: String,
    name: String,
    links: FileLinks,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileLinks {
    content_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultBody {
    source: Option<String>,
    #[serde(default)]
    combined_recognized_phrases: Vec<CombinedPhrase>,
    #[serde(default)]
    recognized_phrases: Vec<RecognizedPhrase>,
}

#[derive(Debug, Deserialize)]
struct CombinedPhrase {
    #[serde(default)]
    display: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognizedPhrase {
    speaker: Option<u32>,
    #[serde(default)]
    offset_in_ticks: f64,
    #[serde(default)]
    n_best: Vec<NBest>,
}

#[derive(Debug, Deserialize)]
struct NBest {
    #[serde(default)]
    display: String,
}

/// Job id is the last path segment of the job URL.
fn job_id_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_status(body: &str) -> anyhow::Result<JobStatus> {
    let parsed: TranscriptionStatusBody =
        serde_json::from_str(body).context("Invalid transcription status response")?;

    Ok(match parsed.status.as_str() {
        "NotStarted" => JobStatus::Submitted,
        "Running" => JobStatus::Running,
        "Succeeded" => JobStatus::Succeeded,
        "Failed" => {
            let reason = parsed
                .properties
                .and_then(|p| p.error)
                .and_then(|e| e.message.or(e.code))
                .unwrap_or_else(|| "unknown error".to_string());
            JobStatus::Failed { reason }
        }
        other => bail!("Unknown transcription status: {}", other),
    })
}

fn parse_files_page(body: &str) -> anyhow::Result<(Vec<ResultFile>, Option<String>)> {
    let page: FilesPage = serde_json::from_str(body).context("Invalid files response")?;
    let files = page
        .values
        .into_iter()
        .map(|f| ResultFile {
            kind: match f.kind.as_str() {
                "Transcription" => ResultKind::Transcription,
                "TranscriptionReport" => ResultKind::Report,
                other => ResultKind::Other(other.to_string()),
            },
            name: f.name,
            content_url: f.links.content_url,
        })
        .collect();
    Ok((files, page.next_link))
}

fn parse_result(body: &str) -> anyhow::Result<BackendResult> {
    let mut parsed: ResultBody =
        serde_json::from_str(body).context("Invalid transcription result")?;

    parsed
        .recognized_phrases
        .sort_by(|a, b| a.offset_in_ticks.total_cmp(&b.offset_in_ticks));

    let display_text = parsed
        .combined_recognized_phrases
        .into_iter()
        .next()
        .map(|c| c.display)
        .unwrap_or_default();

    let phrases = parsed
        .recognized_phrases
        .into_iter()
        .map(|p| {
            let speaker = p.speaker.map(|s| s.to_string()).unwrap_or_else(|| "0".to_string());
            let text = p.n_best.into_iter().next().map(|n| n.display).unwrap_or_default();
            (speaker, text)
        })
        .collect();

    Ok(BackendResult {
        source: parsed.source,
        display_text,
        phrases,
    })
}

#[async_trait]
impl TranscriptionBackend for AzureSpeechBackend {
    async fn submit(&self, sources: &[String], config: &DiarizationConfig) -> anyhow::Result<String> {
        let url = format!("{}/transcriptions", self.endpoint);
        let response = self
            .authorized(self.client.post(&url))
            .json(&self.definition(sources, config))
            .send()
            .await
            .context("Transcription create request failed")?;
        let response = ensure_success(response, "Transcription create").await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(job_id_from_url);

        let job_id = match location {
            Some(id) => id,
            None => {
                let body: Value = response.json().await.context("Invalid create response")?;
                body.get("self")
                    .and_then(Value::as_str)
                    .and_then(job_id_from_url)
                    .ok_or_else(|| anyhow!("Create response carried no job location"))?
            }
        };

        info!(%job_id, sources = sources.len(), "Transcription job created");
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> anyhow::Result<JobStatus> {
        let url = format!("{}/transcriptions/{}", self.endpoint, job_id);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("Transcription status request failed")?;
        let body = ensure_success(response, "Transcription status")
            .await?
            .text()
            .await?;
        parse_status(&body)
    }

    async fn list_result_files(&self, job_id: &str) -> anyhow::Result<Vec<ResultFile>> {
        let mut files = Vec::new();
        let mut next = Some(format!("{}/transcriptions/{}/files", self.endpoint, job_id));

        while let Some(url) = next {
            let response = self
                .authorized(self.client.get(&url))
                .send()
                .await
                .context("File listing request failed")?;
            let body = ensure_success(response, "File listing").await?.text().await?;
            let (page, next_link) = parse_files_page(&body)?;
            files.extend(page);
            next = next_link;
        }

        debug!(%job_id, files = files.len(), "Listed result files");
        Ok(files)
    }

    async fn fetch_result(&self, file: &ResultFile) -> anyhow::Result<BackendResult> {
        // contentUrl is pre-signed; no subscription key.
        let response = self
            .client
            .get(&file.content_url)
            .send()
            .await
            .with_context(|| format!("Download of {} failed", file.name))?;
        let body = ensure_success(response, "Result download").await?.text().await?;
        parse_result(&body)
    }

    fn name(&self) -> &str {
        "azure-speech"
    }
}
