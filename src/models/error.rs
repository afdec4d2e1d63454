pub(crate) const INVALID_INPUT_MESSAGE: &str = "Please select an image file";
pub(crate) const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload photo";
pub(crate) const STATUS_CHECK_FAILED_MESSAGE: &str = "Failed to check restoration status";
pub(crate) const RESTORATION_FAILED_MESSAGE: &str = "Photo restoration failed";

/// Every way a restoration workflow can fail. All of them end the current job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Selected file is not an image (declared media type '{media_type}')")]
    InvalidInputKind { media_type: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Status check failed: {0}")]
    StatusCheckFailed(String),

    #[error("Restoration failed: {}", .0.as_deref().unwrap_or("no details from backend"))]
    RestorationFailed(Option<String>),
}

impl WorkflowError {
    /// The message shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::InvalidInputKind { .. } => INVALID_INPUT_MESSAGE.to_string(),
            WorkflowError::UploadFailed(message) => message.clone(),
            WorkflowError::StatusCheckFailed(_) => STATUS_CHECK_FAILED_MESSAGE.to_string(),
            WorkflowError::RestorationFailed(message) => message
                .clone()
                .unwrap_or_else(|| RESTORATION_FAILED_MESSAGE.to_string()),
        }
    }
}
