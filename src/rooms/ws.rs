use axum::{debug_handler, extract::{State, WebSocketUpgrade}, response::Response};
use futures_util::StreamExt;

use crate::auth::CurrentUser;

use super::{live, Hub};

/// Upgrades an authenticated request to a live session. Identity is
/// extracted first, so a request without a logged-in user is refused with
/// 401 before any upgrade is attempted.
#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    CurrentUser(user_id): CurrentUser,
    State(hub): State<Hub>,

    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(async move |socket| {
        let (sender, receiver) = socket.split();
        if let Err(err) = live::handle_connect(hub, Ok(user_id), Box::pin(sender), receiver).await {
            tracing::debug!(%user_id, error = %err, "live session ended with error");
        }
    })
}
