pub mod directory;
pub mod fanout;
pub mod live;
pub mod msg;
pub mod registry;
pub mod wire;
mod new;
mod room;
mod ws;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use sqlx::SqlitePool;

use crate::AppState;

use self::{directory::RoomDirectory, fanout::Fanout, msg::MessageStore, registry::ConnectionRegistry};

/// Everything a live session needs, shared by all connections.
#[derive(Clone)]
pub struct Hub {
    pub rooms: RoomDirectory,
    pub messages: MessageStore,
    pub registry: Arc<ConnectionRegistry>,
    pub fanout: Fanout,
}

impl Hub {
    pub fn new(db_pool: SqlitePool) -> Self {
        let rooms = RoomDirectory::new(db_pool.clone());
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            fanout: Fanout::new(rooms.clone(), registry.clone()),
            messages: MessageStore::new(db_pool),
            rooms,
            registry,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(new::list_rooms).post(new::create_room))
        .route("/rooms/{id}", get(room::room).patch(room::update_room).delete(room::delete_room))
        .route("/rooms/{id}/join", post(room::join))
        .route("/rooms/{id}/leave", post(room::leave))
        .route("/rooms/{id}/members", get(room::members))
        .route("/rooms/{id}/messages", get(room::messages))
        .route("/ws", get(ws::room_ws))
}
