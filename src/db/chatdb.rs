// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodels::*;

#[async_trait]
pub trait ChatExt: Send + Sync {
    async fn save_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, Error>;

    /// Every message exchanged between the two users, oldest first.
    async fn get_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>, Error>;

    async fn delete_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<u64, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn save_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, content, sent_at
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, sent_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY sent_at ASC, seq ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
