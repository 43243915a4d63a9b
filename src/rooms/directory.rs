//! Rooms and their membership rows.
//!
//! Capacity is enforced inside the insert itself: the membership row is only
//! written when the room exists, the user is not yet a member and the current
//! member count is below `max_members`. SQLite serializes writers, so two
//! concurrent joins can never both pass the check.

use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::{Room, RoomMember},
    error::{ChatError, ChatResult},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemberFilter {
    pub room_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl MemberFilter {
    pub fn room(room_id: Uuid) -> Self {
        Self { room_id: Some(room_id), user_id: None }
    }

    pub fn user(user_id: Uuid) -> Self {
        Self { room_id: None, user_id: Some(user_id) }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RoomUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<i64>,
}

#[derive(Clone)]
pub struct RoomDirectory {
    db_pool: SqlitePool,
}

impl RoomDirectory {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Creates the room and the creator's membership in one transaction.
    pub async fn create_room(
        &self,
        creator: Uuid,
        name: &str,
        description: &str,
        max_members: i64,
    ) -> ChatResult<(Room, RoomMember)> {
        if max_members <= 0 {
            return Err(ChatError::validation("max_members must be positive"));
        }
        if name.trim().is_empty() {
            return Err(ChatError::validation("name must not be empty"));
        }

        let now = OffsetDateTime::now_utc();
        let room = Room {
            id: Uuid::now_v7(),
            name: name.to_owned(),
            description: description.to_owned(),
            max_members,
            created_by: creator,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db_pool.begin().await?;
        sqlx::query("INSERT INTO rooms (id,name,description,max_members,created_by,created_at,updated_at) VALUES (?,?,?,?,?,?,?)")
            .bind(room.id)
            .bind(&room.name)
            .bind(&room.description)
            .bind(room.max_members)
            .bind(room.created_by)
            .bind(room.created_at)
            .bind(room.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| match ChatError::from(err) {
                ChatError::NotFound(_) => ChatError::NotFound("user"),
                err => err,
            })?;
        let member = insert_member(&mut tx, room.id, creator).await?;
        tx.commit().await?;

        tracing::info!(room_id = %room.id, user_id = %creator, max_members, "room created");
        Ok((room, member))
    }

    pub async fn join_room(&self, user_id: Uuid, room_id: Uuid) -> ChatResult<RoomMember> {
        let mut tx = self.db_pool.begin().await?;
        let member = insert_member(&mut tx, room_id, user_id).await?;
        tx.commit().await?;

        tracing::info!(%room_id, %user_id, member_id = %member.id, "joined room");
        Ok(member)
    }

    pub async fn leave_room(&self, member_id: Uuid) -> ChatResult<()> {
        let deleted = sqlx::query("DELETE FROM room_members WHERE id=?")
            .bind(member_id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(ChatError::NotFound("membership"));
        }
        tracing::info!(%member_id, "left room");
        Ok(())
    }

    /// All membership rows matching the filter, oldest first.
    pub async fn get_members(&self, filter: MemberFilter) -> ChatResult<Vec<RoomMember>> {
        Ok(sqlx::query_as(
            "SELECT * FROM room_members WHERE (? IS NULL OR room_id=?) AND (? IS NULL OR user_id=?) ORDER BY rowid",
        )
        .bind(filter.room_id)
        .bind(filter.room_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    pub async fn membership(&self, user_id: Uuid, room_id: Uuid) -> ChatResult<Option<RoomMember>> {
        let members = self.get_members(MemberFilter { room_id: Some(room_id), user_id: Some(user_id) }).await?;
        Ok(members.into_iter().next())
    }

    /// Like [`Self::membership`], but a missing row is an authorization failure.
    pub async fn require_member(&self, user_id: Uuid, room_id: Uuid) -> ChatResult<RoomMember> {
        self.membership(user_id, room_id)
            .await?
            .ok_or(ChatError::Unauthorized("not a member of this room"))
    }

    pub async fn get_room(&self, id: Uuid) -> ChatResult<Room> {
        sqlx::query_as("SELECT * FROM rooms WHERE id=?")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ChatError::NotFound("room"))
    }

    pub async fn list_rooms(&self, created_by: Option<Uuid>) -> ChatResult<Vec<Room>> {
        Ok(sqlx::query_as("SELECT * FROM rooms WHERE (? IS NULL OR created_by=?) ORDER BY rowid")
            .bind(created_by)
            .bind(created_by)
            .fetch_all(&self.db_pool)
            .await?)
    }

    /// Applies the set fields of `update`. Only the creator may update a room,
    /// and `max_members` may not drop below the current member count.
    pub async fn update_room(&self, id: Uuid, requester: Uuid, update: RoomUpdate) -> ChatResult<Room> {
        if update.max_members.is_some_and(|max| max <= 0) {
            return Err(ChatError::validation("max_members must be positive"));
        }
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ChatError::validation("name must not be empty"));
        }

        let mut tx = self.db_pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE rooms SET
                name = COALESCE(?, name),
                description = COALESCE(?, description),
                max_members = COALESCE(?, max_members),
                updated_at = ?
            WHERE id = ? AND created_by = ?
                AND COALESCE(?, max_members) >= (SELECT COUNT(*) FROM room_members WHERE room_id = rooms.id)",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.max_members)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .bind(requester)
        .bind(update.max_members)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let room: Option<Room> = sqlx::query_as("SELECT * FROM rooms WHERE id=?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        match room {
            None => Err(ChatError::NotFound("room")),
            Some(room) if updated == 1 => Ok(room),
            Some(room) if room.created_by != requester => {
                Err(ChatError::Unauthorized("only the creator may update a room"))
            }
            Some(_) => Err(ChatError::validation("max_members is below the current member count")),
        }
    }

    /// Deletes the room together with its memberships and history.
    pub async fn delete_room(&self, id: Uuid, requester: Uuid) -> ChatResult<()> {
        let deleted = sqlx::query("DELETE FROM rooms WHERE id=? AND created_by=?")
            .bind(id)
            .bind(requester)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            self.get_room(id).await?;
            return Err(ChatError::Unauthorized("only the creator may delete a room"));
        }
        tracing::info!(room_id = %id, "room deleted");
        Ok(())
    }
}

async fn insert_member(conn: &mut SqliteConnection, room_id: Uuid, user_id: Uuid) -> ChatResult<RoomMember> {
    let now = OffsetDateTime::now_utc();
    let member = RoomMember {
        id: Uuid::now_v7(),
        room_id,
        user_id,
        created_at: now,
        updated_at: now,
    };

    let inserted = sqlx::query(
        "INSERT INTO room_members (id,room_id,user_id,created_at,updated_at)
        SELECT ?, r.id, ?, ?, ? FROM rooms r
        WHERE r.id = ?
            AND NOT EXISTS (SELECT 1 FROM room_members m WHERE m.room_id = r.id AND m.user_id = ?)
            AND (SELECT COUNT(*) FROM room_members m WHERE m.room_id = r.id) < r.max_members",
    )
    .bind(member.id)
    .bind(user_id)
    .bind(member.created_at)
    .bind(member.updated_at)
    .bind(room_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|err| match ChatError::from(err) {
        ChatError::Conflict(_) => ChatError::AlreadyMember,
        ChatError::NotFound(_) => ChatError::NotFound("user"),
        err => err,
    })?
    .rows_affected();

    if inserted == 1 {
        return Ok(member);
    }

    let Some(max_members) = sqlx::query_scalar::<_, i64>("SELECT max_members FROM rooms WHERE id=?")
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Err(ChatError::NotFound("room"));
    };

    let existing = sqlx::query_scalar::<_, i64>("SELECT 1 FROM room_members WHERE room_id=? AND user_id=?")
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(_) => Err(ChatError::AlreadyMember),
        None => Err(ChatError::CapacityExceeded { max_members }),
    }
}
