use anyhow::{Context, bail};
use async_trait::async_trait;
use diascribe_config::StorageSettings;
use diascribe_transcription::ObjectStorage;
use reqwest::Client;
use tracing::debug;

const STORAGE_API_VERSION: &str = "2021-08-06";

/// Azure Blob Storage staging area, authorised with an optional SAS token.
pub struct AzureBlobStorage {
    client: Client,
    account_url: String,
    sas_token: Option<String>,
}

impl AzureBlobStorage {
    pub fn new(account_url: String, sas_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            account_url: account_url.trim_end_matches('/').to_string(),
            sas_token: sas_token
                .map(|t| t.trim_start_matches('?').to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.account_url.clone(), settings.sas_token.clone())
    }

    fn container_url(&self, container: &str) -> String {
        match &self.sas_token {
            Some(sas) => format!("{}/{}?restype=container&{}", self.account_url, container, sas),
            None => format!("{}/{}?restype=container", self.account_url, container),
        }
    }

    /// Blob URL, carrying the SAS token so the speech service can read it.
    pub fn blob_url(&self, container: &str, name: &str) -> String {
        let base = format!(
            "{}/{}/{}",
            self.account_url,
            container,
            urlencoding::encode(name)
        );
        match &self.sas_token {
            Some(sas) => format!("{}?{}", base, sas),
            None => base,
        }
    }
}

#[async_trait]
impl ObjectStorage for AzureBlobStorage {
    async fn create_container(&self, name: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .put(self.container_url(name))
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("content-length", "0")
            .send()
            .await
            .context("Container create request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Container create error {}: {}", status, body);
        }

        debug!(container = %name, "Blob container created");
        Ok(name.to_string())
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<String> {
        let url = self.blob_url(container, name);
        let size = bytes.len();
        let response = self
            .client
            .put(&url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Upload of {} failed", name))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Blob upload error {}: {}", status, body);
        }

        debug!(%container, blob = %name, size, "Blob uploaded");
        Ok(url)
    }

    async fn delete_container(&self, name: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .delete(self.container_url(name))
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await
            .context("Container delete request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Container delete error {}: {}", status, body);
        }

        debug!(container = %name, "Blob container deleted");
        Ok(())
    }
}
