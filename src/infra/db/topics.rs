use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::application::pagination::Window;
use crate::application::repos::{
    CreateTopicParams, DeletedTopic, RepoError, TopicScope, TopicsRepo, TopicsWriteRepo,
    UpdateTopicParams,
};
use crate::domain::entities::TopicRecord;

use super::PostgresRepositories;
use super::types::{TOPIC_COLUMNS, TopicRow};
use super::util::{convert_count, convert_offset, map_sqlx_error};

fn push_scope<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: &'q TopicScope) {
    match scope {
        TopicScope::All => {}
        TopicScope::Board(board_id) => {
            qb.push(" WHERE board_id = ");
            qb.push_bind(*board_id);
        }
        TopicScope::Ref(ref_id) => {
            qb.push(" WHERE ref_id = ");
            qb.push_bind(ref_id.as_str());
        }
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, scope: &TopicScope) {
    match scope {
        TopicScope::All => qb.push(" ORDER BY created_at DESC, id DESC"),
        TopicScope::Board(_) | TopicScope::Ref(_) => {
            qb.push(" ORDER BY updated_at DESC, id DESC")
        }
    };
}

#[async_trait]
impl TopicsRepo for PostgresRepositories {
    async fn find_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, RepoError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1");
        let row = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TopicRecord::from))
    }

    async fn count_topics(&self, scope: &TopicScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM topics");
        push_scope(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn list_topics(
        &self,
        scope: &TopicScope,
        window: Window,
    ) -> Result<Vec<TopicRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TOPIC_COLUMNS} FROM topics"));
        push_scope(&mut qb, scope);
        push_order(&mut qb, scope);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(convert_offset(window.offset)?);

        let rows = qb
            .build_query_as::<TopicRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TopicRecord::from).collect())
    }
}

#[async_trait]
impl TopicsWriteRepo for PostgresRepositories {
    async fn create_topic(&self, params: CreateTopicParams) -> Result<TopicRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let bumped = sqlx::query(
            r#"
            UPDATE boards
            SET topic_count = topic_count + 1, version = version + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(params.board_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if bumped.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        let sql = format!(
            r#"
            INSERT INTO topics (id, board_id, user_id, ref_type, ref_id, name, tags, content)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TOPIC_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.board_id)
            .bind(params.user_id)
            .bind(&params.ref_type)
            .bind(params.ref_id.as_deref())
            .bind(&params.name)
            .bind(&params.tags)
            .bind(&params.content)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_topic(&self, params: UpdateTopicParams) -> Result<TopicRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE topics
            SET name = $2, tags = $3, content = $4, version = version + 1, updated_at = now()
            WHERE id = $1
            RETURNING {TOPIC_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(params.id)
            .bind(&params.name)
            .bind(&params.tags)
            .bind(&params.content)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(TopicRecord::from).ok_or(RepoError::NotFound)
    }

    async fn set_topic_locked(&self, id: Uuid, locked: bool) -> Result<TopicRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE topics
            SET locked = $2, version = version + 1
            WHERE id = $1
            RETURNING {TOPIC_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(id)
            .bind(locked)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(TopicRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_topic(&self, id: Uuid) -> Result<DeletedTopic, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1 FOR UPDATE");
        let topic: TopicRecord = sqlx::query_as::<_, TopicRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?
            .into();

        let reply_ids: Vec<Uuid> = sqlx::query_scalar(
            "DELETE FROM replies WHERE topic_id = $1 RETURNING id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE boards
            SET topic_count = GREATEST(topic_count - 1, 0), version = version + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(topic.board_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(DeletedTopic { topic, reply_ids })
    }
}
