use std::path::Path;

use reqwest::multipart;
use reqwest::{Client, Response, StatusCode, Url};
use tokio::io::AsyncWriteExt;

use crate::config::{ClientConfig, ConfigError};
use crate::models::job::{ErrorDetail, JobId, RestorationJob, ServiceInfo, StatusReport};
use crate::models::workflow::InputCandidate;

/// Multipart field the backend reads the image from.
const UPLOAD_FIELD: &str = "file";

/// Client for the restoration backend's `/api` surface.
#[derive(Debug, Clone)]
pub struct RestorationClient {
    http: Client,
    api_base: Url,
}

impl RestorationClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http: Client::new(),
            api_base: config.api_base()?,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.api_base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Reference to the restored artifact. No request is made.
    pub fn download_url(&self, job_id: &JobId) -> Result<Url, ApiError> {
        self.endpoint(&format!("download/{}", job_id.as_str()))
    }

    /// GET / — service banner, used as a reachability probe.
    pub async fn service_info(&self) -> Result<ServiceInfo, ApiError> {
        let response = self.http.get(self.endpoint("")?).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// POST /upload — submit one image for restoration.
    pub async fn upload(&self, input: &InputCandidate) -> Result<RestorationJob, ApiError> {
        let part = multipart::Part::bytes(input.bytes.to_vec())
            .file_name(input.file_name.clone())
            .mime_str(&input.media_type)?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// GET /restoration/{id}
    pub async fn restoration_status(&self, job_id: &JobId) -> Result<StatusReport, ApiError> {
        let url = self.endpoint(&format!("restoration/{}", job_id.as_str()))?;
        let response = self.http.get(url).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// GET /restorations — most recent jobs known to the backend.
    pub async fn list_restorations(&self) -> Result<Vec<RestorationJob>, ApiError> {
        let response = self.http.get(self.endpoint("restorations")?).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// GET /download/{id} — stream the restored artifact into `dest`.
    /// Returns the number of bytes written.
    pub async fn download_to(&self, job_id: &JobId, dest: &Path) -> Result<u64, ApiError> {
        let response = self.http.get(self.download_url(job_id)?).send().await?;
        let mut response = ensure_success(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// Pass 2xx responses through; turn anything else into `ApiError::Status`,
/// keeping the backend's `detail` when the body carries one.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorDetail>(&body)
        .ok()
        .map(|e| e.detail);

    Err(ApiError::Status { status, detail })
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The backend-provided error detail, if the response carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}
