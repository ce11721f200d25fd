use async_trait::async_trait;
use uuid::Uuid;

use crate::application::pagination::Window;
use crate::application::repos::{
    CreateReplyParams, CreatedReply, DeletedReply, RepliesRepo, RepliesWriteRepo, RepoError,
    ReplyScope,
};
use crate::domain::entities::{ReplyRecord, TopicRecord};

use super::PostgresRepositories;
use super::types::{REPLY_COLUMNS, ReplyRow, TOPIC_COLUMNS, TopicRow};
use super::util::{convert_count, convert_offset, map_sqlx_error};

#[async_trait]
impl RepliesRepo for PostgresRepositories {
    async fn find_reply(&self, id: Uuid) -> Result<Option<ReplyRecord>, RepoError> {
        let sql = format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = $1");
        let row = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ReplyRecord::from))
    }

    async fn count_replies(&self, scope: ReplyScope) -> Result<u64, RepoError> {
        let count: i64 = match scope {
            ReplyScope::All => sqlx::query_scalar("SELECT COUNT(*) FROM replies")
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?,
            ReplyScope::Topic(topic_id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE topic_id = $1")
                    .bind(topic_id)
                    .fetch_one(self.pool())
                    .await
                    .map_err(map_sqlx_error)?
            }
        };

        convert_count(count)
    }

    async fn list_replies(
        &self,
        scope: ReplyScope,
        window: Window,
    ) -> Result<Vec<ReplyRecord>, RepoError> {
        let offset = convert_offset(window.offset)?;
        let limit = i64::from(window.limit);

        let rows = match scope {
            ReplyScope::All => {
                let sql = format!(
                    "SELECT {REPLY_COLUMNS} FROM replies \
                     ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
                );
                sqlx::query_as::<_, ReplyRow>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.pool())
                    .await
                    .map_err(map_sqlx_error)?
            }
            ReplyScope::Topic(topic_id) => {
                let sql = format!(
                    "SELECT {REPLY_COLUMNS} FROM replies WHERE topic_id = $1 \
                     ORDER BY created_at, id LIMIT $2 OFFSET $3"
                );
                sqlx::query_as::<_, ReplyRow>(&sql)
                    .bind(topic_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.pool())
                    .await
                    .map_err(map_sqlx_error)?
            }
        };

        Ok(rows.into_iter().map(ReplyRecord::from).collect())
    }

    async fn count_replies_before(
        &self,
        topic_id: Uuid,
        reply_id: Uuid,
    ) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM replies
            WHERE topic_id = $1
              AND (created_at, id) < (SELECT created_at, id FROM replies WHERE id = $2)
            "#,
        )
        .bind(topic_id)
        .bind(reply_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        convert_count(count)
    }
}

#[async_trait]
impl RepliesWriteRepo for PostgresRepositories {
    async fn create_reply(&self, params: CreateReplyParams) -> Result<CreatedReply, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            r#"
            UPDATE topics
            SET reply_count = reply_count + 1, version = version + 1, updated_at = now()
            WHERE id = $1
            RETURNING {TOPIC_COLUMNS}
            "#
        );
        let topic: TopicRecord = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(params.topic_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?
            .into();

        let sql = format!(
            r#"
            INSERT INTO replies (id, topic_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {REPLY_COLUMNS}
            "#
        );
        let reply: ReplyRecord = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.topic_id)
            .bind(params.user_id)
            .bind(&params.content)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .into();

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(CreatedReply { reply, topic })
    }

    async fn mark_reply_deleted(&self, id: Uuid) -> Result<DeletedReply, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            r#"
            UPDATE replies
            SET deleted = TRUE, version = version + 1, updated_at = now()
            WHERE id = $1
            RETURNING {REPLY_COLUMNS}
            "#
        );
        let reply: ReplyRecord = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?
            .into();

        let sql = format!(
            r#"
            UPDATE topics
            SET version = version + 1
            WHERE id = $1
            RETURNING {TOPIC_COLUMNS}
            "#
        );
        let topic: TopicRecord = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(reply.topic_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?
            .into();

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(DeletedReply { reply, topic })
    }
}
