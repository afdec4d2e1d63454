use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque restoration job identifier, assigned by the backend on upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a restoration job as reported by the backend.
///
/// Only `completed` and `failed` are meaningful to the client; any other
/// reported value is kept verbatim and treated as still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending(String),
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending(_))
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending(raw) => raw,
            JobStatus::Completed => "completed".to_string(),
            JobStatus::Failed => "failed".to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending(raw) => f.write_str(raw),
            JobStatus::Completed => f.write_str("completed"),
            JobStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Read-only projection of a backend restoration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorationJob {
    pub id: JobId,
    #[serde(default = "default_status")]
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub restored_filename: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Seconds the backend spent restoring the image.
    #[serde(default)]
    pub processing_time: Option<f64>,
}

// The upload response is only guaranteed to carry `id`.
fn default_status() -> JobStatus {
    JobStatus::Pending("processing".to_string())
}

/// Body of `GET /restoration/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Body of `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
}
