//! Heirloom photo restoration client
//!
//! Uploads a photograph to the restoration backend, polls the job until it
//! completes or fails, and exposes the result for download. The workflow
//! controller owns all client-side state and is independent of any UI.

pub mod config;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::ClientConfig;
pub use models::error::WorkflowError;
pub use models::workflow::{ClientWorkflowState, InputCandidate, Phase, Progress};
pub use services::api::{ApiError, RestorationClient};
pub use services::workflow::WorkflowController;
