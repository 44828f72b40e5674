//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use pollstar_common::AppResult;
use pollstar_core::services::{
    CreateOptionInput, CreatePollInput, PollDetail, PollSummary, UpdateOptionInput,
    UpdatePollInput,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{middleware::AppState, response, response::ApiResponse};

/// Session-scoped query parameters.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    /// Owning session.
    #[serde(rename = "session-id")]
    pub session_id: Uuid,
}

/// Create poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    /// Owning session.
    pub session_id: Uuid,
    /// Poll name (the question).
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Ordered options; position becomes display order.
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<OptionRequest>,
}

/// One option of a create payload.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionRequest {
    /// Option name.
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Update poll request: the full intended state of the poll.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    /// New poll name.
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    /// New description.
    pub description: Option<String>,
    /// The full intended option set; loaded options absent from this list
    /// are removed.
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<UpdateOptionRequest>,
}

/// One option of an update payload.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionRequest {
    /// Identity of an existing option; absent for a new one.
    pub id: Option<Uuid>,
    /// Option name.
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// List a session's polls.
async fn list_polls(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<ApiResponse<Vec<PollSummary>>> {
    let polls = state.poll_service.list_polls(query.session_id).await?;
    Ok(ApiResponse::ok(polls))
}

/// Get the session's active poll, if any.
async fn get_active_poll(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<ApiResponse<Option<PollDetail>>> {
    let poll = state.poll_service.get_active_poll(query.session_id).await?;
    Ok(ApiResponse::ok(poll))
}

/// Get one poll with its options.
async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> AppResult<ApiResponse<PollDetail>> {
    let poll = state.poll_service.get_poll(poll_id).await?;
    Ok(ApiResponse::ok(poll))
}

/// Create a poll with its options.
async fn create_poll(
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollDetail>> {
    req.validate()?;

    let input = CreatePollInput {
        session_id: req.session_id,
        name: req.name,
        description: req.description,
        options: req
            .options
            .into_iter()
            .map(|o| CreateOptionInput {
                name: o.name,
                description: o.description,
            })
            .collect(),
    };
    let poll = state.poll_service.create_poll(input).await?;
    Ok(ApiResponse::ok(poll))
}

/// Update a poll from the full intended state.
async fn update_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
    Json(req): Json<UpdatePollRequest>,
) -> AppResult<ApiResponse<PollDetail>> {
    req.validate()?;

    let input = UpdatePollInput {
        name: req.name,
        description: req.description,
        options: req
            .options
            .into_iter()
            .map(|o| UpdateOptionInput {
                id: o.id,
                name: o.name,
                description: o.description,
            })
            .collect(),
    };
    let poll = state.poll_service.update_poll(poll_id, input).await?;
    Ok(ApiResponse::ok(poll))
}

/// Delete a poll. Deleting a missing poll is still a success.
async fn delete_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.poll_service.delete_poll(poll_id).await?;
    Ok(response::ok())
}

/// Activate a poll within its session.
async fn activate_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> AppResult<ApiResponse<PollDetail>> {
    let poll = state.poll_service.activate_poll(poll_id).await?;
    Ok(ApiResponse::ok(poll))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route("/active", get(get_active_poll))
        .route(
            "/{id}",
            get(get_poll).put(update_poll).delete(delete_poll),
        )
        .route("/{id}/activate", get(activate_poll))
}
