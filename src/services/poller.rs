use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::models::job::{JobId, JobStatus};
use crate::services::api::RestorationClient;

/// Identifies one poll loop. A new ticket is issued for every accepted upload,
/// so results from a superseded loop never match the controller's current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    pub job_id: JobId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Backend reported a non-terminal status (kept verbatim for logging).
    Pending { reported: String },
    Completed,
    Failed { error_message: Option<String> },
    /// The status request itself failed.
    TransportError { message: String },
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEvent {
    pub ticket: PollTicket,
    pub outcome: PollOutcome,
}

/// Handle to a running poll loop. Dropping it aborts the loop.
#[derive(Debug)]
pub struct PollTask {
    ticket: PollTicket,
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Start polling `GET /restoration/{id}` for the ticket's job.
    ///
    /// The first fetch goes out immediately; each following fetch is issued
    /// `interval` after the previous one resolved, so at most one status
    /// request per job is ever in flight.
    pub fn spawn(
        client: RestorationClient,
        ticket: PollTicket,
        interval: Duration,
        events: UnboundedSender<PollEvent>,
    ) -> Self {
        let handle = tokio::spawn(run(client, ticket.clone(), interval, events));
        Self { ticket, handle }
    }

    pub fn ticket(&self) -> &PollTicket {
        &self.ticket
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    client: RestorationClient,
    ticket: PollTicket,
    interval: Duration,
    events: UnboundedSender<PollEvent>,
) {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        metrics::counter!("restoration_status_checks_total").increment(1);

        let outcome = match client.restoration_status(&ticket.job_id).await {
            Ok(report) => match report.status {
                JobStatus::Completed => PollOutcome::Completed,
                JobStatus::Failed => PollOutcome::Failed {
                    error_message: report.error_message,
                },
                JobStatus::Pending(reported) => PollOutcome::Pending { reported },
            },
            Err(e) => {
                tracing::warn!(job_id = %ticket.job_id, error = %e, "Status check failed");
                PollOutcome::TransportError {
                    message: e.to_string(),
                }
            }
        };

        tracing::debug!(
            job_id = %ticket.job_id,
            attempt,
            outcome = ?outcome,
            "Status check resolved"
        );

        let terminal = outcome.is_terminal();
        let event = PollEvent {
            ticket: ticket.clone(),
            outcome,
        };

        // Controller gone: nobody left to apply results.
        if events.send(event).is_err() || terminal {
            return;
        }

        sleep(interval).await;
    }
}
