use axum::{debug_handler, extract::{Query, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{auth::CurrentUser, res::ApiResponse, AppResult};

use super::Hub;

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomBody {
    name: String,
    #[serde(default)]
    description: String,
    max_members: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    created_by: Option<Uuid>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create_room(
    State(hub): State<Hub>,
    CurrentUser(user_id): CurrentUser,

    Json(NewRoomBody { name, description, max_members }): Json<NewRoomBody>,
) -> AppResult<Response> {
    let (room, member) = hub.rooms.create_room(user_id, &name, &description, max_members).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("room created", json!({ "room": room, "member": member })),
    ).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_rooms(
    State(hub): State<Hub>,
    _user: CurrentUser,
    Query(ListQuery { created_by }): Query<ListQuery>,
) -> AppResult<Response> {
    let rooms = hub.rooms.list_rooms(created_by).await?;
    Ok(ApiResponse::ok("rooms", json!({ "rooms": rooms })).into_response())
}
