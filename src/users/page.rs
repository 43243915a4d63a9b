use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{auth::CurrentUser, res::ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateMe {
    first_name: Option<String>,
    last_name: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn me(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Response> {
    let user = super::get_user(&db_pool, user_id).await?;
    Ok(ApiResponse::ok("user", json!({ "user": user })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_me(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,

    Json(UpdateMe { first_name, last_name }): Json<UpdateMe>,
) -> AppResult<Response> {
    let user = super::update_user(&db_pool, user_id, first_name, last_name).await?;
    Ok(ApiResponse::ok("user updated", json!({ "user": user })).into_response())
}

/// Deletes the caller's account and ends their session.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_me(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    session: Session,
) -> AppResult<Response> {
    super::delete_user(&db_pool, user_id).await?;
    session.flush().await?;
    Ok(ApiResponse::ok("user deleted", json!({ "user_id": user_id })).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn user(
    State(db_pool): State<SqlitePool>,
    _viewer: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Response> {
    let user = super::get_user(&db_pool, user_id).await?;
    Ok(ApiResponse::ok("user", json!({ "user": user })).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::{session::USER_ID, testing};

    #[tokio::test]
    async fn delete_me_removes_the_account_and_logs_out() {
        let (db_pool, _dir) = testing::db_pool().await;
        let ada = testing::user(&db_pool, "Ada").await;
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session.insert(USER_ID, ada).await.unwrap();

        let response = delete_me(State(db_pool.clone()), CurrentUser(ada), session.clone()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(session.get::<Uuid>(USER_ID).await.unwrap().is_none());

        let err = me(State(db_pool), CurrentUser(ada)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
