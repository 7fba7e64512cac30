//! HTTP control API for a running `start` process.
//!
//! Lets an operator steer the scheduler without restarting it: edit the
//! monitoring set, trigger a check, send offers, and work the lead list.
//! Spawned next to the monitoring loop and aborted on shutdown.

use crate::gateway::{BulkRecipient, Gateway};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use outreach_core::{
    config::ApiConfig,
    error::OutreachError,
    lead::{LeadFilter, LeadStatus},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    gateway: Arc<Gateway>,
    api_key: Option<String>,
    uptime: Instant,
}

#[derive(Debug, Deserialize)]
struct ContactRequest {
    phone: String,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    phone: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    recipients: Vec<BulkRecipient>,
    template: String,
}

#[derive(Debug, Deserialize)]
struct LeadQuery {
    status: Option<LeadStatus>,
    contact: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: LeadStatus,
}

/// Constant-time string comparison for the bearer token.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `Err(response)` if rejected.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Result<(), ApiError> {
    let Some(key) = api_key else {
        return Ok(());
    };
    let Some(header) = headers.get("authorization") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing Authorization header"));
    };
    let Ok(value) = header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid Authorization header"));
    };
    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => Ok(()),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "invalid token")),
    }
}

fn reject(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({"error": message.into()})))
}

/// Map a gateway error onto an HTTP status.
fn failure(e: OutreachError) -> ApiError {
    let status = match &e {
        OutreachError::InvalidContact(_) => StatusCode::BAD_REQUEST,
        OutreachError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reject(status, e.to_string())
}

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))
}

/// `GET /api/health`: loop state, uptime, and counters.
async fn health(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    Ok(Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
        "monitoring": state.gateway.is_running(),
        "stats": state.gateway.stats().await,
    })))
}

/// `GET /api/contacts`: the monitoring set in processing order.
async fn list_contacts(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let contacts: Vec<Value> = state
        .gateway
        .monitored_contacts()
        .await
        .into_iter()
        .map(|(contact, paused)| json!({"contact": contact, "paused": paused}))
        .collect();
    Ok(Json(json!({ "contacts": contacts })))
}

/// `POST /api/contacts`: start monitoring a contact.
async fn add_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    request: Result<Json<ContactRequest>, JsonRejection>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let request = body(request)?;
    let contact = state
        .gateway
        .add_contact(&request.phone)
        .await
        .map_err(failure)?;
    Ok(Json(json!({ "contact": contact })))
}

/// `DELETE /api/contacts/{phone}`
async fn remove_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(phone): Path<String>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    if !state.gateway.remove_contact(&phone).await.map_err(failure)? {
        return Err(reject(StatusCode::NOT_FOUND, format!("{phone} is not monitored")));
    }
    Ok(Json(json!({ "removed": phone })))
}

/// `POST /api/contacts/{phone}/pause`
async fn pause_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(phone): Path<String>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let changed = state.gateway.pause_contact(&phone).await.map_err(failure)?;
    Ok(Json(json!({ "changed": changed })))
}

/// `POST /api/contacts/{phone}/resume`
async fn resume_contact(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(phone): Path<String>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let changed = state.gateway.resume_contact(&phone).await.map_err(failure)?;
    Ok(Json(json!({ "changed": changed })))
}

/// `POST /api/check`: run one cycle now.
async fn check(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    Ok(Json(json!(state.gateway.check_now().await)))
}

/// `POST /api/send`: one message, gated and quota-checked like an offer.
async fn send(
    headers: HeaderMap,
    State(state): State<ApiState>,
    request: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let request = body(request)?;
    if request.text.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "text must not be empty"));
    }
    if !state
        .gateway
        .send_message(&request.phone, request.text.trim(), &[])
        .await
    {
        return Err(reject(StatusCode::BAD_GATEWAY, "message not sent, see logs"));
    }
    Ok(Json(json!({ "sent": request.phone })))
}

/// `POST /api/bulk`: queue a paced bulk send and return at once.
async fn bulk(
    headers: HeaderMap,
    State(state): State<ApiState>,
    request: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    check_auth(&headers, &state.api_key)?;
    let request = body(request)?;
    if request.template.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "template must not be empty"));
    }
    if request.recipients.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "recipients must not be empty"));
    }

    let count = request.recipients.len();
    let gateway = state.gateway.clone();
    tokio::spawn(async move {
        gateway
            .send_bulk(&request.recipients, request.template.trim(), &[])
            .await;
    });
    info!("api: queued bulk send to {count} recipients");
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": count }))))
}

/// `GET /api/leads?status=&contact=`
async fn list_leads(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Query(query): Query<LeadQuery>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let contact = query
        .contact
        .map(|raw| state.gateway.normalize(&raw))
        .transpose()
        .map_err(failure)?;
    let filter = LeadFilter {
        status: query.status,
        contact,
    };
    let leads = state.gateway.list_leads(&filter).await.map_err(failure)?;
    Ok(Json(json!({ "leads": leads })))
}

/// `POST /api/leads/{phone}/status`: set the contact's most recent lead.
async fn set_lead_status(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(phone): Path<String>,
    request: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    let request = body(request)?;
    let contact = state.gateway.normalize(&phone).map_err(failure)?;
    let lead = state
        .gateway
        .update_lead_status(&contact, request.status)
        .await
        .map_err(failure)?;
    Ok(Json(json!(lead)))
}

/// `POST /api/monitor/start`
async fn start_monitor(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    Ok(Json(json!({ "started": state.gateway.start() })))
}

/// `POST /api/monitor/stop`
async fn stop_monitor(headers: HeaderMap, State(state): State<ApiState>) -> ApiResult {
    check_auth(&headers, &state.api_key)?;
    Ok(Json(json!({ "stopped": state.gateway.stop().await })))
}

fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/contacts", get(list_contacts).post(add_contact))
        .route("/api/contacts/{phone}", delete(remove_contact))
        .route("/api/contacts/{phone}/pause", post(pause_contact))
        .route("/api/contacts/{phone}/resume", post(resume_contact))
        .route("/api/check", post(check))
        .route("/api/send", post(send))
        .route("/api/bulk", post(bulk))
        .route("/api/leads", get(list_leads))
        .route("/api/leads/{phone}/status", post(set_lead_status))
        .route("/api/monitor/start", post(start_monitor))
        .route("/api/monitor/stop", post(stop_monitor))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Serve the control API until the task is aborted.
pub async fn serve(config: ApiConfig, gateway: Arc<Gateway>) {
    let api_key = Some(config.api_key.clone()).filter(|k| !k.is_empty());
    let app = build_router(ApiState {
        gateway,
        api_key,
        uptime: Instant::now(),
    });
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("API server failed to bind to {addr}: {e}");
            return;
        }
    };
    info!("API server listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("API server error: {e}");
    }
}
