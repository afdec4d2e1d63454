use std::path::PathBuf;
use std::process::ExitCode;

use heirloom_restore::{
    config::ClientConfig, models::notification::NotificationLevel, telemetry, InputCandidate,
    Phase, WorkflowController,
};
use metrics_exporter_prometheus::PrometheusBuilder;

const USAGE: &str = "usage: heirloom-restore <image-path> [output-path]";

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(image_path) = args.next() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let output_path = args.next();

    let config = ClientConfig::from_env().expect("Failed to load configuration from environment");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    telemetry::describe_metrics();

    let mut controller =
        WorkflowController::new(&config).expect("Failed to initialize restoration client");

    match controller.client().service_info().await {
        Ok(info) => tracing::info!(backend = %config.backend_url, banner = %info.message, "Backend reachable"),
        Err(e) => tracing::warn!(backend = %config.backend_url, error = %e, "Backend probe failed"),
    }

    let candidate = match InputCandidate::from_path(&image_path).await {
        Ok(candidate) => candidate,
        Err(e) => {
            tracing::error!(error = %e, "Could not read input image");
            return ExitCode::FAILURE;
        }
    };

    if controller.select_input(candidate).is_err() {
        report_notifications(&mut controller);
        return ExitCode::FAILURE;
    }

    // Upload failures are reflected in state and notifications.
    let _ = controller.submit().await;
    report_notifications(&mut controller);

    while controller.state().phase == Phase::Processing && controller.step().await {
        tracing::info!(
            progress = controller.state().progress.value(),
            phase = %controller.state().phase,
            "Waiting for restoration"
        );
        report_notifications(&mut controller);
    }
    report_notifications(&mut controller);

    let exit = match controller.state().phase {
        Phase::Completed => {
            let dest = match (output_path, controller.download_result()) {
                (Some(path), _) => path,
                (None, Some(result)) => PathBuf::from(format!("restored_{}.jpg", result.job_id)),
                (None, None) => PathBuf::from("restored.jpg"),
            };
            match controller.save_result(&dest).await {
                Ok(Some(bytes)) => {
                    tracing::info!(dest = %dest.display(), bytes, "Restored photo saved");
                    ExitCode::SUCCESS
                }
                Ok(None) => ExitCode::FAILURE,
                Err(e) => {
                    tracing::error!(dest = %dest.display(), error = %e, "Download failed");
                    ExitCode::FAILURE
                }
            }
        }
        _ => ExitCode::FAILURE,
    };

    tracing::debug!(metrics = %prometheus_handle.render(), "Metrics snapshot");
    exit
}

fn report_notifications(controller: &mut WorkflowController) {
    for notification in controller.drain_notifications() {
        match notification.level {
            NotificationLevel::Success => {
                tracing::info!(level = %notification.level, notice = %notification.message, "Notification")
            }
            NotificationLevel::Error => {
                tracing::error!(level = %notification.level, notice = %notification.message, "Notification")
            }
        }
    }
}
