//! In-process mock of the restoration backend for integration tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use heirloom_restore::{ClientConfig, WorkflowController};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// Poll delay used by tests; short so scripted sequences finish quickly.
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One scripted reply of `GET /api/restoration/{id}`.
#[derive(Debug, Clone)]
pub enum StatusReply {
    Json(Value),
    Error(StatusCode),
}

pub fn pending(status: &str) -> StatusReply {
    StatusReply::Json(json!({ "id": "ignored", "status": status }))
}

pub fn completed() -> StatusReply {
    StatusReply::Json(json!({ "status": "completed", "processing_time": 0.4 }))
}

pub fn failed(message: Option<&str>) -> StatusReply {
    StatusReply::Json(json!({ "status": "failed", "error_message": message }))
}

/// How `POST /api/upload` answers.
#[derive(Debug, Clone)]
pub enum UploadReply {
    Accept(Value),
    Reject(StatusCode, String),
}

/// What the mock saw in one multipart upload.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Clone)]
pub struct MockBackend {
    inner: Arc<MockState>,
}

struct MockState {
    upload_reply: Mutex<UploadReply>,
    status_script: Mutex<VecDeque<StatusReply>>,
    status_calls: AtomicUsize,
    uploads: Mutex<Vec<ReceivedUpload>>,
    history: Mutex<Value>,
    artifact: Vec<u8>,
    gate: Option<Semaphore>,
}

impl MockBackend {
    /// Accepts uploads as job `id`; status replies follow `script`, repeating
    /// the last entry once the script runs out.
    pub fn accepting(id: &str, script: Vec<StatusReply>) -> Self {
        Self::build(
            UploadReply::Accept(json!({ "id": id, "status": "processing" })),
            script,
            false,
        )
    }

    pub fn rejecting(status: StatusCode, body: &str) -> Self {
        Self::build(UploadReply::Reject(status, body.to_string()), vec![], false)
    }

    /// Like `accepting`, but every status reply waits for `release_status`.
    pub fn gated(id: &str, script: Vec<StatusReply>) -> Self {
        Self::build(
            UploadReply::Accept(json!({ "id": id, "status": "processing" })),
            script,
            true,
        )
    }

    fn build(upload_reply: UploadReply, script: Vec<StatusReply>, gated: bool) -> Self {
        Self {
            inner: Arc::new(MockState {
                upload_reply: Mutex::new(upload_reply),
                status_script: Mutex::new(script.into()),
                status_calls: AtomicUsize::new(0),
                uploads: Mutex::new(Vec::new()),
                history: Mutex::new(json!([])),
                artifact: b"\xFF\xD8\xFF\xE0restored-jpeg-bytes".to_vec(),
                gate: gated.then(|| Semaphore::new(0)),
            }),
        }
    }

    pub fn set_upload_reply(&self, reply: UploadReply) {
        *self.inner.upload_reply.lock().unwrap() = reply;
    }

    pub fn set_history(&self, history: Value) {
        *self.inner.history.lock().unwrap() = history;
    }

    pub fn status_calls(&self) -> usize {
        self.inner.status_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.inner.uploads.lock().unwrap().clone()
    }

    pub fn artifact(&self) -> &[u8] {
        &self.inner.artifact
    }

    pub fn release_status(&self, replies: usize) {
        if let Some(gate) = &self.inner.gate {
            gate.add_permits(replies);
        }
    }

    /// Serve on an ephemeral local port; returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/", get(service_info))
            .route("/api/upload", post(upload))
            .route("/api/restoration/{id}", get(restoration_status))
            .route("/api/restorations", get(list_restorations))
            .route("/api/download/{id}", get(download))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend crashed");
        });

        format!("http://{addr}")
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({ "message": "Heirloom AI Photo Restoration Service" }))
}

async fn upload(State(mock): State<MockBackend>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        mock.inner.uploads.lock().unwrap().push(ReceivedUpload {
            field_name,
            file_name,
            content_type,
            size,
        });
    }

    let reply = mock.inner.upload_reply.lock().unwrap().clone();
    match reply {
        UploadReply::Accept(body) => Json(body).into_response(),
        UploadReply::Reject(status, body) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    }
}

async fn restoration_status(State(mock): State<MockBackend>, Path(_id): Path<String>) -> Response {
    mock.inner.status_calls.fetch_add(1, Ordering::SeqCst);

    if let Some(gate) = &mock.inner.gate {
        gate.acquire()
            .await
            .expect("Mock gate closed")
            .forget();
    }

    let reply = {
        let mut script = mock.inner.status_script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next
    };

    match reply {
        Some(StatusReply::Json(body)) => Json(body).into_response(),
        Some(StatusReply::Error(status)) => {
            (status, Json(json!({ "detail": "status unavailable" }))).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Restoration not found" })),
        )
            .into_response(),
    }
}

async fn list_restorations(State(mock): State<MockBackend>) -> Json<Value> {
    Json(mock.inner.history.lock().unwrap().clone())
}

async fn download(State(mock): State<MockBackend>, Path(id): Path<String>) -> Response {
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Restoration not found" })),
        )
            .into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=restored_{id}.jpg"),
            ),
        ],
        mock.inner.artifact.clone(),
    )
        .into_response()
}

pub fn controller_for(base_url: &str) -> WorkflowController {
    let config = ClientConfig::for_backend(base_url).with_poll_interval(TEST_POLL_INTERVAL);
    WorkflowController::new(&config).expect("Failed to build controller")
}

/// Wait until `condition` holds, checking every 10ms for up to two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("Condition not met within 2 seconds");
}
