use axum::{debug_handler, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use uuid::Uuid;

use crate::{auth::CurrentUser, res::ApiResponse, AppResult};

use super::{
    directory::{MemberFilter, RoomUpdate},
    msg::MessageFilter,
    Hub,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    let room = hub.rooms.get_room(room_id).await?;
    hub.rooms.require_member(user_id, room_id).await?;

    Ok(ApiResponse::ok("room", json!({ "room": room })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_room(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,

    Json(update): Json<RoomUpdate>,
) -> AppResult<Response> {
    let room = hub.rooms.update_room(room_id, user_id, update).await?;
    Ok(ApiResponse::ok("room updated", json!({ "room": room })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_room(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    hub.rooms.delete_room(room_id, user_id).await?;
    Ok(ApiResponse::ok("room deleted", json!({ "room_id": room_id })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn join(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    let member = hub.rooms.join_room(user_id, room_id).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("joined room", json!({ "member": member })),
    ).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn leave(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    hub.rooms.get_room(room_id).await?;
    let member = hub.rooms.require_member(user_id, room_id).await?;
    hub.rooms.leave_room(member.id).await?;
    Ok(ApiResponse::ok("left room", json!({ "room_id": room_id })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn members(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    hub.rooms.get_room(room_id).await?;
    hub.rooms.require_member(user_id, room_id).await?;

    let members = hub.rooms.get_members(MemberFilter::room(room_id)).await?;
    Ok(ApiResponse::ok("members", json!({ "members": members })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    hub.rooms.get_room(room_id).await?;
    hub.rooms.require_member(user_id, room_id).await?;

    let messages = hub
        .messages
        .list(MessageFilter { room_id: Some(room_id), ..Default::default() })
        .await?;
    Ok(ApiResponse::ok("messages", json!({ "messages": messages })).into_response())
}
