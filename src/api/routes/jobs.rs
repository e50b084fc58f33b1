//! Job handlers: start, list, status, pause/resume/stop, progress stream.

use super::{ControlResponse, StartDownloadQuery, StartDownloadRequest, StartDownloadResponse, parse_job_id};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::JobSnapshot;
use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::time::Duration;
use tokio::sync::watch;

/// POST /download - Start a transfer
///
/// The magnet link may be sent as a JSON body (`{"source_identifier": ...}`)
/// or as a `magnet` / `source_identifier` query parameter.
#[utoipa::path(
    post,
    path = "/download",
    tag = "jobs",
    params(StartDownloadQuery),
    request_body(content = StartDownloadRequest, description = "Optional; the query parameters are used when the body is empty", content_type = "application/json"),
    responses(
        (status = 201, description = "Job created", body = StartDownloadResponse),
        (status = 422, description = "Missing or empty source identifier", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Query(query): Query<StartDownloadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let source_identifier = if body.is_empty() {
        query
            .magnet
            .or(query.source_identifier)
            .ok_or_else(|| Error::InvalidSource("missing source identifier".to_string()))?
    } else {
        let request: StartDownloadRequest = serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidSource(format!("invalid request body: {}", e)))?;
        request.source_identifier
    };

    let job_id = state.coordinator.start(&source_identifier).await?;

    Ok((StatusCode::CREATED, Json(StartDownloadResponse { job_id })))
}

/// GET /downloads - List all jobs
#[utoipa::path(
    get,
    path = "/downloads",
    tag = "jobs",
    responses(
        (status = 200, description = "All jobs in creation order", body = Vec<JobSnapshot>)
    )
)]
pub async fn list_downloads(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.list().await)
}

/// GET /status/:id - Get a job snapshot
#[utoipa::path(
    get,
    path = "/status/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job snapshot", body = JobSnapshot),
        (status = 400, description = "Malformed job ID", body = crate::error::ApiError),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>> {
    let id = parse_job_id(&id)?;
    Ok(Json(state.coordinator.status(id).await?))
}

/// POST /pause/:id - Pause a job
#[utoipa::path(
    post,
    path = "/pause/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Pause requested", body = ControlResponse),
        (status = 400, description = "Malformed job ID", body = crate::error::ApiError),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn pause_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ControlResponse>> {
    let id = parse_job_id(&id)?;
    let snapshot = state.coordinator.pause(id).await?;
    Ok(Json(ControlResponse {
        status: snapshot.state,
        job_id: id,
    }))
}

/// POST /resume/:id - Resume a job
#[utoipa::path(
    post,
    path = "/resume/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Resume requested", body = ControlResponse),
        (status = 400, description = "Malformed job ID", body = crate::error::ApiError),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn resume_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ControlResponse>> {
    let id = parse_job_id(&id)?;
    let snapshot = state.coordinator.resume(id).await?;
    Ok(Json(ControlResponse {
        status: snapshot.state,
        job_id: id,
    }))
}

/// POST /stop/:id - Stop a job
#[utoipa::path(
    post,
    path = "/stop/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Stop requested", body = ControlResponse),
        (status = 400, description = "Malformed job ID", body = crate::error::ApiError),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn stop_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ControlResponse>> {
    let id = parse_job_id(&id)?;
    let snapshot = state.coordinator.stop(id).await?;
    Ok(Json(ControlResponse {
        status: snapshot.state,
        job_id: id,
    }))
}

/// GET /ws/:id - WebSocket progress stream
///
/// Sends a `{progress, state, paused}` frame every `stream_interval` until
/// the job is terminal, then closes. Unknown ids are refused before the
/// upgrade.
#[utoipa::path(
    get,
    path = "/ws/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 101, description = "Switching to WebSocket; frames are ProgressFrame JSON", body = crate::types::ProgressFrame),
        (status = 400, description = "Malformed job ID", body = crate::error::ApiError),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn progress_socket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let subscription = match parse_job_id(&id) {
        Ok(id) => state.coordinator.watch(id).await.map(|rx| (id, rx)),
        Err(e) => Err(e),
    };
    let (id, rx) = match subscription {
        Ok(subscription) => subscription,
        Err(e) => return e.into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let interval = state.config.server.api.stream_interval;
    ws.on_upgrade(move |socket| async move {
        tracing::debug!(job_id = %id, "Progress stream opened");
        let (sink, incoming) = socket.split();
        pump_progress(sink, incoming, rx, interval).await;
        tracing::debug!(job_id = %id, "Progress stream closed");
    })
}

/// Push progress frames until the job is terminal or the client goes away
pub(crate) async fn pump_progress<S, R>(
    mut sink: S,
    mut incoming: R,
    mut rx: watch::Receiver<JobSnapshot>,
    interval: Duration,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = rx.borrow_and_update().clone();
                let frame = match serde_json::to_string(&snapshot.frame()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(job_id = %snapshot.job_id, error = %e, "Failed to serialize progress frame");
                        return;
                    }
                };
                if sink.send(Message::Text(frame)).await.is_err() {
                    return;
                }
                if snapshot.state.is_terminal() {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            }
            message = incoming.next() => match message {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    }
}
