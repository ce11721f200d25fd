use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserProfile;

use super::PostgresRepositories;
use super::types::UserRow;
use super::util::map_sqlx_error;

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, image_url FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(UserProfile::from).collect())
    }
}
