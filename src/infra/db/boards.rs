use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{
    BoardsRepo, BoardsWriteRepo, CreateBoardParams, RepoError, UpdateBoardParams,
};
use crate::domain::entities::BoardRecord;

use super::PostgresRepositories;
use super::types::{BOARD_COLUMNS, BoardRow};
use super::util::map_sqlx_error;

#[async_trait]
impl BoardsRepo for PostgresRepositories {
    async fn find_board(&self, id: Uuid) -> Result<Option<BoardRecord>, RepoError> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1");
        let row = sqlx::query_as::<_, BoardRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(BoardRecord::from))
    }

    async fn list_boards(&self) -> Result<Vec<BoardRecord>, RepoError> {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards ORDER BY display_order, created_at");
        let rows = sqlx::query_as::<_, BoardRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BoardRecord::from).collect())
    }
}

#[async_trait]
impl BoardsWriteRepo for PostgresRepositories {
    async fn create_board(&self, params: CreateBoardParams) -> Result<BoardRecord, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO boards (id, tag, name, description, display_order)
            VALUES ($1, $2, $3, $4, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM boards))
            RETURNING {BOARD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BoardRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.tag)
            .bind(&params.name)
            .bind(&params.description)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_board(&self, params: UpdateBoardParams) -> Result<BoardRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE boards
            SET tag = COALESCE($2, tag),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                version = version + 1,
                updated_at = now()
            WHERE id = $1
            RETURNING {BOARD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BoardRow>(&sql)
            .bind(params.id)
            .bind(params.tag)
            .bind(params.name)
            .bind(params.description)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BoardRecord::from).ok_or(RepoError::NotFound)
    }

    async fn set_board_locked(&self, id: Uuid, locked: bool) -> Result<BoardRecord, RepoError> {
        let sql = format!(
            r#"
            UPDATE boards
            SET locked = $2, version = version + 1, updated_at = now()
            WHERE id = $1
            RETURNING {BOARD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BoardRow>(&sql)
            .bind(id)
            .bind(locked)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BoardRecord::from).ok_or(RepoError::NotFound)
    }

    async fn reorder_boards(&self, ordered_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        for (position, id) in ordered_ids.iter().enumerate() {
            let display_order = i32::try_from(position + 1).map_err(|_| RepoError::InvalidInput {
                message: "too many boards to order".to_string(),
            })?;
            let result = sqlx::query(
                "UPDATE boards SET display_order = $2, updated_at = now() WHERE id = $1",
            )
            .bind(id)
            .bind(display_order)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            if result.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}
