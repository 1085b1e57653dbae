use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::instrument;

use authgate_auth::{StoreError, StoreResult, User, UserStore};
use authgate_core::UserId;

use super::{PgStore, map_sqlx_error};

const USER_SELECT: &str = r#"
    SELECT id, username, email, password_hash, birthday, created_at, is_active
    FROM users
"#;

fn decode_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        birthday: row.try_get("birthday")?,
        created_at: row.try_get("created_at")?,
        is_active: row.try_get("is_active")?,
    })
}

impl PgStore {
    async fn fetch_user(&self, operation: &str, filter: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE {filter}");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.as_ref()
            .map(decode_user)
            .transpose()
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, birthday, created_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.birthday)
        .bind(user.created_at)
        .bind(user.is_active)
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(decode_user)
            .transpose()
            .map_err(|e| map_sqlx_error("get_user", e))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.fetch_user("find_by_username", "LOWER(username) = LOWER($1)", username)
            .await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.fetch_user("find_by_email", "email = $1", email).await
    }

    #[instrument(skip(self, password_hash), err)]
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(password_hash)
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("update_password_hash", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(active)
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("set_active", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
