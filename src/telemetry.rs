use tracing_subscriber::EnvFilter;

/// Install the JSON tracing subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();
}

/// Register descriptions for the metrics the workflow emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "restoration_uploads_total",
        "Total photos submitted for restoration"
    );
    metrics::describe_counter!(
        "restoration_upload_failures_total",
        "Uploads rejected by the backend or lost in transport"
    );
    metrics::describe_counter!(
        "restoration_status_checks_total",
        "Status requests issued by poll loops"
    );
    metrics::describe_counter!(
        "restoration_jobs_completed",
        "Restoration jobs confirmed completed"
    );
    metrics::describe_counter!(
        "restoration_jobs_failed",
        "Restoration jobs that ended in failure after upload"
    );
    metrics::describe_counter!(
        "restoration_stale_events_total",
        "Poll results discarded because their job was superseded"
    );
    metrics::describe_histogram!(
        "restoration_wait_seconds",
        "Time from upload acceptance to confirmed completion"
    );
}
