//! Restoration workflow controller.
//!
//! Owns the client-side state for a single restoration job and is the only
//! writer of it. Network results from the poll loop arrive as [`PollEvent`]s
//! and are applied here, after a staleness check against the active ticket.

use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::models::error::{WorkflowError, UPLOAD_FAILED_MESSAGE};
use crate::models::job::JobId;
use crate::models::notification::Notification;
use crate::models::workflow::{
    ClientWorkflowState, InputCandidate, Phase, PreviewHandle, Progress, ResultHandle,
};
use crate::services::api::{ApiError, RestorationClient};
use crate::services::poller::{PollEvent, PollOutcome, PollTask, PollTicket};

const UPLOAD_ACCEPTED_MESSAGE: &str = "Photo uploaded successfully! Processing...";
const RESTORATION_COMPLETED_MESSAGE: &str = "Photo restoration completed!";

pub struct WorkflowController {
    client: RestorationClient,
    poll_interval: Duration,
    state: ClientWorkflowState,
    generation: u64,
    poller: Option<PollTask>,
    events_tx: mpsc::UnboundedSender<PollEvent>,
    events_rx: mpsc::UnboundedReceiver<PollEvent>,
    notifications: VecDeque<Notification>,
    snapshots: watch::Sender<ClientWorkflowState>,
    processing_since: Option<Instant>,
}

impl WorkflowController {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        config.check()?;
        Ok(Self::with_client(
            RestorationClient::new(config)?,
            config.poll_interval(),
        ))
    }

    pub fn with_client(client: RestorationClient, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(ClientWorkflowState::default());

        Self {
            client,
            poll_interval,
            state: ClientWorkflowState::default(),
            generation: 0,
            poller: None,
            events_tx,
            events_rx,
            notifications: VecDeque::new(),
            snapshots,
            processing_since: None,
        }
    }

    pub fn state(&self) -> &ClientWorkflowState {
        &self.state
    }

    pub fn client(&self) -> &RestorationClient {
        &self.client
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ClientWorkflowState> {
        self.snapshots.subscribe()
    }

    /// Whether a poll loop is currently tracking a job.
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Ticket of the active poll loop. Only results carrying it are applied.
    pub fn active_ticket(&self) -> Option<&PollTicket> {
        self.poller.as_ref().map(PollTask::ticket)
    }

    /// Offer a file to the workflow.
    ///
    /// Non-image candidates are rejected and leave the state untouched. An image
    /// replaces any previous selection and preview, supersedes whatever job was
    /// being tracked, and returns the workflow to `Idle`.
    pub fn select_input(&mut self, candidate: InputCandidate) -> Result<(), WorkflowError> {
        if !candidate.is_image() {
            let err = WorkflowError::InvalidInputKind {
                media_type: candidate.media_type.clone(),
            };
            tracing::warn!(
                file_name = %candidate.file_name,
                media_type = %candidate.media_type,
                "Rejected non-image selection"
            );
            self.notify(Notification::error(err.user_message()));
            return Err(err);
        }

        tracing::info!(
            file_name = %candidate.file_name,
            media_type = %candidate.media_type,
            size_bytes = candidate.bytes.len(),
            "Selected input image"
        );

        self.supersede();
        let preview = PreviewHandle::for_input(&candidate);
        self.state = ClientWorkflowState {
            selected_input: Some(candidate),
            preview: Some(preview),
            ..ClientWorkflowState::default()
        };
        self.publish();
        Ok(())
    }

    /// Upload the selected image and start polling for its restoration.
    ///
    /// Does nothing unless an input is selected and the workflow is `Idle`.
    /// An upload failure moves the workflow to `Failed` and is also returned.
    pub async fn submit(&mut self) -> Result<(), WorkflowError> {
        if self.state.phase != Phase::Idle || self.state.selected_input.is_none() {
            tracing::debug!(phase = %self.state.phase, "Submit ignored");
            return Ok(());
        }
        let Some(input) = self.state.selected_input.take() else {
            return Ok(());
        };

        self.state.phase = Phase::Uploading;
        self.state.progress = Progress::UPLOADING;
        self.publish();

        metrics::counter!("restoration_uploads_total").increment(1);
        tracing::info!(file_name = %input.file_name, "Uploading photo for restoration");

        match self.client.upload(&input).await {
            Ok(job) => {
                tracing::info!(
                    job_id = %job.id,
                    reported_status = %job.status,
                    "Upload accepted"
                );
                self.begin_processing(job.id);
                self.notify(Notification::success(UPLOAD_ACCEPTED_MESSAGE));
                Ok(())
            }
            Err(e) => {
                metrics::counter!("restoration_upload_failures_total").increment(1);
                tracing::error!(error = %e, "Upload failed");

                let message = e
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string());
                let err = WorkflowError::UploadFailed(message);
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn begin_processing(&mut self, job_id: JobId) {
        self.generation += 1;
        let ticket = PollTicket {
            job_id: job_id.clone(),
            generation: self.generation,
        };

        self.state.job_id = Some(job_id);
        self.state.phase = Phase::Processing;
        self.state.progress = Progress::ACCEPTED;
        self.processing_since = Some(Instant::now());
        self.poller = Some(PollTask::spawn(
            self.client.clone(),
            ticket,
            self.poll_interval,
            self.events_tx.clone(),
        ));
        self.publish();
    }

    /// Wait for the next result from the active poll loop and apply it.
    ///
    /// Stale results are discarded while waiting. Returns `false` without
    /// waiting when no poll loop is active.
    pub async fn step(&mut self) -> bool {
        while self.poller.is_some() {
            let Some(event) = self.events_rx.recv().await else {
                return false;
            };
            if self.apply_poll_event(event) {
                return true;
            }
        }
        false
    }

    /// Apply every poll result that has already arrived, without waiting.
    /// Returns how many were applied.
    pub fn drain_ready_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply_poll_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply poll results until the workflow leaves `Processing`.
    pub async fn settle(&mut self) -> &ClientWorkflowState {
        while self.state.phase == Phase::Processing && self.step().await {}
        &self.state
    }

    /// Apply one poll result. Results whose ticket does not match the active
    /// poll loop are dropped and leave the state untouched.
    pub fn apply_poll_event(&mut self, event: PollEvent) -> bool {
        let is_current = self.active_ticket() == Some(&event.ticket)
            && self.state.phase == Phase::Processing
            && self.state.job_id.as_ref() == Some(&event.ticket.job_id);

        if !is_current {
            metrics::counter!("restoration_stale_events_total").increment(1);
            tracing::debug!(
                job_id = %event.ticket.job_id,
                generation = event.ticket.generation,
                "Discarding stale poll result"
            );
            return false;
        }

        let job_id = event.ticket.job_id;
        match event.outcome {
            PollOutcome::Pending { reported } => {
                self.state.progress = self.state.progress.advance();
                tracing::debug!(
                    job_id = %job_id,
                    reported_status = %reported,
                    progress = self.state.progress.value(),
                    "Restoration still pending"
                );
                self.publish();
            }
            PollOutcome::Completed => self.complete(job_id),
            PollOutcome::Failed { error_message } => {
                metrics::counter!("restoration_jobs_failed").increment(1);
                tracing::warn!(job_id = %job_id, error = ?error_message, "Backend reported restoration failure");
                self.fail(WorkflowError::RestorationFailed(error_message));
            }
            PollOutcome::TransportError { message } => {
                metrics::counter!("restoration_jobs_failed").increment(1);
                self.fail(WorkflowError::StatusCheckFailed(message));
            }
        }
        true
    }

    fn complete(&mut self, job_id: JobId) {
        let download_url = match self.client.download_url(&job_id) {
            Ok(url) => url,
            Err(e) => {
                self.fail(WorkflowError::StatusCheckFailed(e.to_string()));
                return;
            }
        };

        metrics::counter!("restoration_jobs_completed").increment(1);
        if let Some(started) = self.processing_since.take() {
            metrics::histogram!("restoration_wait_seconds").record(started.elapsed().as_secs_f64());
        }
        tracing::info!(job_id = %job_id, %download_url, "Restoration completed");

        self.poller = None;
        self.state.phase = Phase::Completed;
        self.state.progress = Progress::DONE;
        self.state.result = Some(ResultHandle {
            job_id,
            download_url,
        });
        self.publish();
        self.notify(Notification::success(RESTORATION_COMPLETED_MESSAGE));
    }

    fn fail(&mut self, err: WorkflowError) {
        tracing::error!(job_id = ?self.state.job_id, error = %err, "Restoration workflow failed");

        self.poller = None;
        self.processing_since = None;
        self.state.phase = Phase::Failed;
        self.state.result = None;
        self.notify(Notification::error(err.user_message()));
        self.state.error = Some(err);
        self.publish();
    }

    /// Return to a fresh `Idle` state, releasing preview and result handles.
    /// Any poll still running for the previous job is cancelled and its
    /// late results are ignored.
    pub fn reset(&mut self) {
        tracing::info!(phase = %self.state.phase, job_id = ?self.state.job_id, "Resetting workflow");
        self.supersede();
        self.state = ClientWorkflowState::default();
        self.publish();
    }

    fn supersede(&mut self) {
        self.generation += 1;
        self.poller = None;
        self.processing_since = None;
    }

    /// Reference to the restored artifact, present only once the job completed.
    pub fn download_result(&self) -> Option<&ResultHandle> {
        self.state.result.as_ref()
    }

    /// Save the restored artifact to `dest`. Returns `Ok(None)` when there is
    /// no completed result; otherwise the number of bytes written.
    pub async fn save_result(&self, dest: impl AsRef<Path>) -> Result<Option<u64>, ApiError> {
        let Some(result) = self.download_result() else {
            return Ok(None);
        };
        let written = self.client.download_to(&result.job_id, dest.as_ref()).await?;
        tracing::info!(
            job_id = %result.job_id,
            dest = %dest.as_ref().display(),
            bytes = written,
            "Saved restored photo"
        );
        Ok(Some(written))
    }

    fn notify(&mut self, notification: Notification) {
        tracing::info!(level = %notification.level, notice = %notification.message, "Notification");
        self.notifications.push_back(notification);
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Dismiss one notification. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        self.notifications.len() != before
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}
