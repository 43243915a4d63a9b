pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod res;
pub mod rooms;
pub mod session;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::anyhow;
use axum::{extract::FromRef, Router};
use sqlx::SqlitePool;

pub use appresult::{AppError, AppResult};
pub use error::{ChatError, ChatResult};
pub use rooms::Hub;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub hub: Hub,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, clients: auth::Clients) -> Self {
        let hub = Hub::new(db_pool.clone());
        Self { db_pool, clients, hub }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(rooms::router())
        .nest("/users", users::router())
        .with_state(state)
}

/// Typed access to fields of provider JSON documents.
pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| anyhow!("expected {field} in {self}"))?
            .as_str()
            .ok_or_else(|| anyhow!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }
}
