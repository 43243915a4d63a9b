use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db::RoomMessage, error::{ChatError, ChatResult}};

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: Uuid,
    pub room_member_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MessageFilter {
    pub room_id: Option<Uuid>,
    pub room_member_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// Append-only room history.
#[derive(Clone)]
pub struct MessageStore {
    db_pool: SqlitePool,
}

impl MessageStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn append(&self, message: NewMessage) -> ChatResult<RoomMessage> {
        let NewMessage { room_id, room_member_id, user_id, content } = message;
        for (field, id) in [("room_id", room_id), ("room_member_id", room_member_id), ("user_id", user_id)] {
            if id.is_nil() {
                return Err(ChatError::validation(format!("{field} must not be empty")));
            }
        }

        let now = OffsetDateTime::now_utc();
        let message = RoomMessage {
            id: Uuid::now_v7(),
            room_id,
            room_member_id,
            user_id,
            content,
            created_at: now,
            updated_at: now,
        };

        sqlx::query("INSERT INTO room_messages (id,room_id,room_member_id,user_id,content,created_at,updated_at) VALUES (?,?,?,?,?,?,?)")
            .bind(message.id)
            .bind(message.room_id)
            .bind(message.room_member_id)
            .bind(message.user_id)
            .bind(&message.content)
            .bind(message.created_at)
            .bind(message.updated_at)
            .execute(&self.db_pool)
            .await?;

        Ok(message)
    }

    pub async fn get(&self, id: Uuid) -> ChatResult<RoomMessage> {
        sqlx::query_as("SELECT * FROM room_messages WHERE id=?")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ChatError::NotFound("message"))
    }

    /// Matching messages in the order they were appended.
    pub async fn list(&self, filter: MessageFilter) -> ChatResult<Vec<RoomMessage>> {
        Ok(sqlx::query_as(
            "SELECT * FROM room_messages
            WHERE (? IS NULL OR room_id=?) AND (? IS NULL OR room_member_id=?) AND (? IS NULL OR user_id=?)
            ORDER BY rowid",
        )
        .bind(filter.room_id)
        .bind(filter.room_id)
        .bind(filter.room_member_id)
        .bind(filter.room_member_id)
        .bind(filter.user_id)
        .bind(filter.user_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    pub async fn delete(&self, id: Uuid) -> ChatResult<()> {
        let deleted = sqlx::query("DELETE FROM room_messages WHERE id=?")
            .bind(id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        match deleted {
            0 => Err(ChatError::NotFound("message")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rooms::directory::RoomDirectory, testing};

    #[tokio::test]
    async fn history_is_chronological_and_survives_leaving() {
        let (db_pool, _dir) = testing::db_pool().await;
        let rooms = RoomDirectory::new(db_pool.clone());
        let messages = MessageStore::new(db_pool.clone());
        let ada = testing::user(&db_pool, "Ada").await;
        let grace = testing::user(&db_pool, "Grace").await;
        let (room, ada_member) = rooms.create_room(ada, "physics", "", 3).await.unwrap();
        let grace_member = rooms.join_room(grace, room.id).await.unwrap();

        for (member, content) in [(&ada_member, "hi"), (&grace_member, "hello"), (&ada_member, "bye")] {
            messages
                .append(NewMessage {
                    room_id: room.id,
                    room_member_id: member.id,
                    user_id: member.user_id,
                    content: content.into(),
                })
                .await
                .unwrap();
        }

        rooms.leave_room(grace_member.id).await.unwrap();

        let history = messages.list(MessageFilter { room_id: Some(room.id), ..Default::default() }).await.unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi", "hello", "bye"]);

        let graces = messages.list(MessageFilter { user_id: Some(grace), ..Default::default() }).await.unwrap();
        assert_eq!(graces.len(), 1);
        assert_eq!(graces[0].room_member_id, grace_member.id);
    }

    #[tokio::test]
    async fn empty_ids_are_rejected() {
        let (db_pool, _dir) = testing::db_pool().await;
        let messages = MessageStore::new(db_pool);

        let err = messages
            .append(NewMessage {
                room_id: Uuid::now_v7(),
                room_member_id: Uuid::nil(),
                user_id: Uuid::now_v7(),
                content: "x".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(msg) if msg.contains("room_member_id")));
    }

    #[tokio::test]
    async fn get_and_delete() {
        let (db_pool, _dir) = testing::db_pool().await;
        let rooms = RoomDirectory::new(db_pool.clone());
        let messages = MessageStore::new(db_pool.clone());
        let ada = testing::user(&db_pool, "Ada").await;
        let (room, member) = rooms.create_room(ada, "physics", "", 3).await.unwrap();

        let message = messages
            .append(NewMessage { room_id: room.id, room_member_id: member.id, user_id: ada, content: "hi".into() })
            .await
            .unwrap();
        let stored = messages.get(message.id).await.unwrap();
        assert_eq!((stored.id, stored.content.as_str()), (message.id, "hi"));

        messages.delete(message.id).await.unwrap();
        assert!(matches!(messages.get(message.id).await, Err(ChatError::NotFound("message"))));
        assert!(matches!(messages.delete(message.id).await, Err(ChatError::NotFound("message"))));
        assert!(messages.list(MessageFilter::default()).await.unwrap().is_empty());
    }
}
