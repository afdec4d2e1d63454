use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use reqwest::Url;
use strum::{Display, EnumString};

use crate::models::job::JobId;
use crate::models::error::WorkflowError;

/// Client-side phase of a restoration workflow.
///
/// ```text
/// Idle ──[submit]──► Uploading ──[job id]──► Processing ──[completed]──► Completed
///                        │                        └────[failed/transport]──► Failed
///                        └──[upload error]──────────────────────────────► Failed
/// Completed | Failed ──[reset]──► Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Client-synthesized progress percentage. Not reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Progress(u8);

impl Progress {
    pub const UPLOADING: Progress = Progress(20);
    pub const ACCEPTED: Progress = Progress(50);
    pub const PENDING_CEILING: Progress = Progress(90);
    pub const DONE: Progress = Progress(100);

    const PENDING_STEP: u8 = 10;

    pub fn value(self) -> u8 {
        self.0
    }

    /// One more pending poll: +10, saturating at the pending ceiling.
    /// Never lowers a value that is already above the ceiling.
    pub fn advance(self) -> Progress {
        if self >= Self::PENDING_CEILING {
            return self;
        }
        Progress(
            self.0
                .saturating_add(Self::PENDING_STEP)
                .min(Self::PENDING_CEILING.0),
        )
    }
}

/// A user-chosen file offered to the workflow.
#[derive(Debug, Clone)]
pub struct InputCandidate {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl InputCandidate {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into().trim().to_string(),
            bytes: bytes.into(),
        }
    }

    /// Read a file and declare its media type from the content's magic bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| InputError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown.jpg".to_string());

        Ok(Self::new(file_name, sniff_media_type(&bytes), bytes))
    }

    /// Whether the declared media type names an image (`image/*`).
    pub fn is_image(&self) -> bool {
        is_image_media_type(&self.media_type)
    }
}

pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Media type inferred from content, `application/octet-stream` when unrecognised.
pub fn sniff_media_type(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Locally held display reference for the original image.
///
/// Shares the selected bytes; dropping the last handle releases them.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    media_type: String,
    bytes: Arc<[u8]>,
}

impl PreviewHandle {
    pub fn for_input(input: &InputCandidate) -> Self {
        Self {
            media_type: input.media_type.clone(),
            bytes: Arc::clone(&input.bytes),
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Reference to the restored artifact for a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultHandle {
    pub job_id: JobId,
    pub download_url: Url,
}

/// Snapshot of everything the client knows about the current restoration.
#[derive(Debug, Clone, Default)]
pub struct ClientWorkflowState {
    pub selected_input: Option<InputCandidate>,
    pub preview: Option<PreviewHandle>,
    pub job_id: Option<JobId>,
    pub phase: Phase,
    pub progress: Progress,
    pub result: Option<ResultHandle>,
    pub error: Option<WorkflowError>,
}

impl ClientWorkflowState {
    /// Message to show for a failed workflow.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.user_message())
    }

    /// Checks the cross-field invariants; used by tests after every operation.
    pub fn is_consistent(&self) -> bool {
        let result_matches_phase = self.result.is_some() == (self.phase == Phase::Completed);
        let job_matches_phase = match self.phase {
            Phase::Idle | Phase::Uploading => self.job_id.is_none(),
            Phase::Processing | Phase::Completed => self.job_id.is_some(),
            // A rejected upload fails before the backend ever assigned an id.
            Phase::Failed => {
                self.job_id.is_some() || matches!(self.error, Some(WorkflowError::UploadFailed(_)))
            }
        };
        let progress_in_range = self.progress <= Progress::DONE
            && (self.progress == Progress::DONE) == (self.phase == Phase::Completed);
        result_matches_phase && job_matches_phase && progress_in_range
    }
}
