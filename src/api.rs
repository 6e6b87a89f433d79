//! HTTP API endpoints for the decision service.
//!
//! Thin JSON wrappers over [`DecisionService`]; every error is an
//! [`Error`](crate::error::Error) and the status mapping lives on it.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::identity::CurrentUser;
use crate::rooms::{CreateRoom, DecisionService};
use crate::types::*;

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct AddOptionRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub option_id: OptionId,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub tiebreaker: Option<TiebreakerMethod>,
}

/// Build the API router
pub fn router(service: Arc<DecisionService>) -> Router {
    Router::new()
        .route("/api/rooms", post(create_room).get(list_rooms))
        .route("/api/rooms/join", post(join_room))
        .route("/api/rooms/code/{code}", get(room_by_code))
        .route(
            "/api/rooms/{id}",
            get(room_detail).delete(delete_room),
        )
        .route(
            "/api/rooms/{id}/options",
            post(add_option).get(list_options),
        )
        .route("/api/rooms/{id}/open", post(open_voting))
        .route("/api/rooms/{id}/close", post(close_voting))
        .route("/api/rooms/{id}/votes", post(cast_vote))
        .route("/api/rooms/{id}/votes/me", get(my_vote))
        .route("/api/rooms/{id}/tally", get(tally))
        .route("/api/rooms/{id}/complete", post(complete_decision))
        .with_state(service)
}

/// POST /api/rooms
async fn create_room(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateRoom>,
) -> AppResult<impl IntoResponse> {
    let room = service.create_room(body, &user.id).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// GET /api/rooms, listing rooms the caller participates in, most recent first
async fn list_rooms(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<Room>> {
    Json(service.rooms_for_user(&user.id).await)
}

/// POST /api/rooms/join
async fn join_room(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<JoinRoomRequest>,
) -> AppResult<Json<Room>> {
    let room = service.join_room(body.code.trim(), &user.id).await?;
    Ok(Json(room))
}

/// GET /api/rooms/code/{code}, the lookup used by the join flow
async fn room_by_code(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(_user): CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<Room>> {
    let room = service.room_by_code(code.trim()).await?;
    Ok(Json(room))
}

/// GET /api/rooms/{id}
async fn room_detail(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<Json<Room>> {
    let room = service.room_detail(&id, &user.id).await?;
    Ok(Json(room))
}

/// DELETE /api/rooms/{id}
async fn delete_room(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<StatusCode> {
    service.delete_room(&id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/rooms/{id}/options
async fn add_option(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
    Json(body): Json<AddOptionRequest>,
) -> AppResult<impl IntoResponse> {
    let option = service.add_option(&id, &body.text, &user.id).await?;
    Ok((StatusCode::CREATED, Json(option)))
}

/// GET /api/rooms/{id}/options
async fn list_options(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<Json<Vec<RoomOption>>> {
    let options = service.options_for_room(&id, &user.id).await?;
    Ok(Json(options))
}

/// POST /api/rooms/{id}/open: the owner opens voting
async fn open_voting(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<Json<Room>> {
    let room = service.open_voting(&id, &user.id).await?;
    Ok(Json(room))
}

/// POST /api/rooms/{id}/close: the owner closes voting for results
async fn close_voting(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<Json<Room>> {
    let room = service.close_voting(&id, &user.id).await?;
    Ok(Json(room))
}

/// POST /api/rooms/{id}/votes
async fn cast_vote(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
    Json(body): Json<CastVoteRequest>,
) -> AppResult<impl IntoResponse> {
    let vote = service.cast_vote(&id, &body.option_id, &user.id).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

/// GET /api/rooms/{id}/votes/me
async fn my_vote(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<Json<Option<Vote>>> {
    let vote = service.my_vote(&id, &user.id).await?;
    Ok(Json(vote))
}

/// GET /api/rooms/{id}/tally: live per-option counts, sorted descending
async fn tally(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
) -> AppResult<Json<Vec<TallyEntry>>> {
    // Viewing the tally is viewing room detail, so the same gate applies
    service.room_detail(&id, &user.id).await?;
    let entries = service.tally(&id).await?;
    Ok(Json(entries))
}

/// POST /api/rooms/{id}/complete: the owner finalizes the decision
async fn complete_decision(
    State(service): State<Arc<DecisionService>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<RoomId>,
    Json(body): Json<CompleteRequest>,
) -> AppResult<Json<crate::rooms::DecisionResult>> {
    let result = service
        .complete_decision(&id, &user.id, body.tiebreaker)
        .await?;
    Ok(Json(result))
}
