use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engine::directory::UpdateServerRequest;
use crate::error::AppError;

use super::app_state::AppState;
use super::auth_middleware::AuthUser;

/// Unwrap a JSON body, turning extractor rejections into a 400 with our error shape.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

// ── Health ──────────────────────────────────────────────

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ── Server directory ────────────────────────────────────

/// GET /api/servers: every server, flagged with the caller's membership.
pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let servers = state.engine.list_servers(&auth.user_id).await?;
    Ok(Json(servers))
}

/// GET /api/me/servers: servers the caller belongs to.
pub async fn list_my_servers(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let servers = state.engine.list_servers_for_user(&auth.user_id).await?;
    Ok(Json(servers))
}

#[derive(Deserialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub description: Option<String>,
}

/// POST /api/servers: create a server with the caller as Admin.
pub async fn create_server(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    payload: Result<Json<CreateServerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(payload)?;
    let server = state
        .engine
        .create_server(&auth.user_id, &body.name, body.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(server)))
}

/// GET /api/servers/{server_id}: server with categories, channels and members expanded.
pub async fn get_server(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(server_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let details = state
        .engine
        .get_server_details(&server_id, &auth.user_id)
        .await?;
    Ok(Json(details))
}

/// PATCH /api/servers/{server_id}: update name/description (admins only).
pub async fn update_server(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(server_id): Path<String>,
    payload: Result<Json<UpdateServerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let patch = json_body(payload)?;
    let server = state
        .engine
        .update_server(&server_id, &auth.user_id, patch)
        .await?;
    Ok(Json(server))
}

/// DELETE /api/servers/{server_id}: delete a server and everything it owns (admins only).
pub async fn delete_server(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(server_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.engine.delete_server(&server_id, &auth.user_id).await?;
    Ok(message("Server and associated data deleted successfully"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCodeResponse {
    pub join_code: String,
}

/// POST /api/servers/{server_id}/join-code: rotate the join code (admins only).
pub async fn regenerate_join_code(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(server_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let join_code = state
        .engine
        .regenerate_join_code(&server_id, &auth.user_id)
        .await?;
    Ok(Json(JoinCodeResponse { join_code }))
}

// ── Membership ──────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinServerRequest {
    pub join_code: String,
}

/// POST /api/servers/{server_id}/join
pub async fn join_server(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(server_id): Path<String>,
    payload: Result<Json<JoinServerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(payload)?;
    state
        .engine
        .join_server(&server_id, &auth.user_id, &body.join_code)
        .await?;
    Ok(message("Successfully joined the server"))
}

/// POST /api/servers/{server_id}/leave
pub async fn leave_server(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(server_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.engine.leave_server(&server_id, &auth.user_id).await?;
    Ok(message("Successfully left the server"))
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// PUT /api/servers/{server_id}/members/{member_id}/role (admins only)
pub async fn update_member_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((server_id, member_id)): Path<(String, String)>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(payload)?;
    state
        .engine
        .update_member_role(&server_id, &auth.user_id, &member_id, &body.role)
        .await?;
    Ok(message("Member role updated successfully"))
}

/// DELETE /api/servers/{server_id}/members/{user_id}: returns the updated server (admins only).
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((server_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let server = state
        .engine
        .remove_user_from_server(&server_id, &auth.user_id, &user_id)
        .await?;
    Ok(Json(server))
}
