mod page;

use axum::{routing::get, Router};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db::User, error::{ChatError, ChatResult}, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(page::me).patch(page::update_me).delete(page::delete_me))
        .route("/{id}", get(page::user))
}

#[derive(Debug, Default, Clone)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub external_id: Option<String>,
}

fn random_name() -> (String, String) {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    (
        adjectives.choose(&mut rng).copied().unwrap_or("Nameless").to_owned(),
        nouns.choose(&mut rng).copied().unwrap_or("User").to_owned(),
    )
}

pub async fn create_user(db_pool: &SqlitePool, new_user: NewUser) -> ChatResult<User> {
    let NewUser { first_name, last_name, email, external_id } = new_user;
    let (first_name, last_name) = match (first_name, last_name) {
        (Some(first), last) if !first.trim().is_empty() => (first, last.unwrap_or_default()),
        _ => random_name(),
    };

    let now = OffsetDateTime::now_utc();
    let user = User {
        id: Uuid::now_v7(),
        first_name,
        last_name,
        email,
        external_id,
        created_at: now,
        updated_at: now,
    };

    sqlx::query("INSERT INTO users (id,first_name,last_name,email,external_id,created_at,updated_at) VALUES (?,?,?,?,?,?,?)")
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.external_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(db_pool)
        .await?;

    tracing::info!(user_id = %user.id, "created user {} {}", user.first_name, user.last_name);
    Ok(user)
}

pub async fn get_user(db_pool: &SqlitePool, id: Uuid) -> ChatResult<User> {
    sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(ChatError::NotFound("user"))
}

pub async fn find_by_external_id(db_pool: &SqlitePool, external_id: &str) -> ChatResult<Option<User>> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE external_id=?")
        .bind(external_id)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn update_user(
    db_pool: &SqlitePool,
    id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
) -> ChatResult<User> {
    if first_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ChatError::validation("first_name must not be empty"));
    }

    let mut user = get_user(db_pool, id).await?;
    if let Some(first_name) = first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = last_name {
        user.last_name = last_name;
    }
    user.updated_at = OffsetDateTime::now_utc();

    sqlx::query("UPDATE users SET first_name=?, last_name=?, updated_at=? WHERE id=?")
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(db_pool)
        .await?;

    Ok(user)
}

/// Deletes the account. Rooms it created, its memberships and its messages
/// go with it through the cascading foreign keys.
pub async fn delete_user(db_pool: &SqlitePool, id: Uuid) -> ChatResult<()> {
    let deleted = sqlx::query("DELETE FROM users WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ChatError::NotFound("user"));
    }
    tracing::info!(user_id = %id, "deleted user");
    Ok(())
}
