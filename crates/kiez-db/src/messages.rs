//! Message repository implementation.
//!
//! Conversations are not stored; they are derived per query by grouping
//! messages on the counterpart (and anchored item, when present).

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kiez_core::{Conversation, Error, Message, MessageRepository, Result, SendMessageRequest};

/// PostgreSQL implementation of MessageRepository.
pub struct PgMessageRepository {
    pool: Pool<Postgres>,
}

const MESSAGE_COLUMNS: &str =
    "id, sender_id, recipient_id, item_id, request_id, content, read, created_at";

impl PgMessageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_message_row(row: sqlx::postgres::PgRow) -> Message {
        Message {
            id: row.get("id"),
            sender_id: row.get("sender_id"),
            recipient_id: row.get("recipient_id"),
            item_id: row.get("item_id"),
            request_id: row.get("request_id"),
            content: row.get("content"),
            read: row.get("read"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn send(&self, req: SendMessageRequest) -> Result<Uuid> {
        if req.content.trim().is_empty() {
            return Err(Error::Validation("message content cannot be empty".into()));
        }
        if req.sender_id == req.recipient_id {
            return Err(Error::Validation("cannot message yourself".into()));
        }

        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO messages (id, sender_id, recipient_id, item_id, request_id, content)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(req.sender_id)
        .bind(req.recipient_id)
        .bind(req.item_id)
        .bind(req.request_id)
        .bind(&req.content)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        // Latest message per (counterpart, item) pair, plus the unread
        // count of what the counterpart sent us.
        let rows = sqlx::query(&format!(
            "WITH ranked AS (
                 SELECT {MESSAGE_COLUMNS},
                        CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END
                            AS counterpart_id,
                        ROW_NUMBER() OVER (
                            PARTITION BY
                                CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END,
                                item_id
                            ORDER BY created_at DESC
                        ) AS rn
                 FROM messages
                 WHERE sender_id = $1 OR recipient_id = $1
             )
             SELECT r.*,
                    (SELECT COUNT(*) FROM messages m
                     WHERE m.recipient_id = $1
                       AND m.sender_id = r.counterpart_id
                       AND m.item_id IS NOT DISTINCT FROM r.item_id
                       AND NOT m.read) AS unread_count
             FROM ranked r
             WHERE r.rn = 1
             ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Conversation {
                counterpart_id: row.get("counterpart_id"),
                item_id: row.get("item_id"),
                unread_count: row.get("unread_count"),
                last_message: Self::parse_message_row(row),
            })
            .collect())
    }

    async fn thread(&self, user_id: Uuid, counterpart_id: Uuid) -> Result<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE (sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1)
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .bind(counterpart_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_message_row).collect())
    }

    async fn mark_read(&self, user_id: Uuid, counterpart_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE
             WHERE recipient_id = $1 AND sender_id = $2 AND NOT read",
        )
        .bind(user_id)
        .bind(counterpart_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM messages WHERE recipient_id = $1 AND NOT read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("count"))
    }
}
