//! REST API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use crate::dispatch::FeeAlert;
use crate::error::GatewayError;
use crate::session::{SessionSummary, StatusView};

/// Uniform success/failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok(message: Option<String>) -> Self {
        Self {
            success: true,
            message,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    #[serde(default)]
    pub school_id: Option<Value>,
}

/// Send request; values may arrive as strings or numbers
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub school_id: Option<Value>,
    #[serde(default)]
    pub phone_number: Option<Value>,
    #[serde(default)]
    pub student_name: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub due_date: Option<Value>,
}

/// Non-empty textual form of a JSON field
fn field(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Start the session for a school
pub async fn init(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let school_id = field(&req.school_id).unwrap_or_default();
    match state.manager.initialize(&school_id) {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::ok(Some(format!(
                "Initialization started for {}",
                school_id
            )))),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiResponse::failed(e.to_string()))),
    }
}

/// Current link status of a school
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> Json<StatusView> {
    Json(state.manager.status(&school_id))
}

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.manager.list())
}

/// Send a fee alert
pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let (Some(school_id), Some(phone_number), Some(student_name), Some(amount), Some(due_date)) = (
        field(&req.school_id),
        field(&req.phone_number),
        field(&req.student_name),
        field(&req.amount),
        field(&req.due_date),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failed("Missing required fields")),
        );
    };

    let alert = FeeAlert::new(student_name, amount, due_date);
    match state.manager.send(&school_id, &phone_number, &alert).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(None))),
        // Transport failures are a normal outcome the caller inspects
        Err(GatewayError::Transport(detail)) => (StatusCode::OK, Json(ApiResponse::failed(detail))),
        Err(e @ GatewayError::NotReady(_)) => {
            warn!("Rejected send: {}", e);
            (StatusCode::CONFLICT, Json(ApiResponse::failed(e.to_string())))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::failed(e.to_string())),
        ),
    }
}
