use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::{Span, instrument};

use authgate_auth::{StoreResult, TokenKind, TokenRecord, TokenStore};
use authgate_core::{TokenId, UserId};

use super::{PgStore, map_sqlx_error};

const TOKEN_SELECT: &str = r#"
    SELECT id, user_id, token_hash, token_type, is_active, created_at, expires_at
    FROM tokens
"#;

fn decode_token(row: &PgRow) -> Result<TokenRecord, sqlx::Error> {
    let kind: String = row.try_get("token_type")?;
    Ok(TokenRecord {
        id: TokenId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        token_hash: row.try_get("token_hash")?,
        kind: kind.parse::<TokenKind>().map_err(|e| sqlx::Error::Decode(e.into()))?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn decode_optional(operation: &str, row: Option<PgRow>) -> StoreResult<Option<TokenRecord>> {
    row.as_ref()
        .map(decode_token)
        .transpose()
        .map_err(|e| map_sqlx_error(operation, e))
}

#[async_trait]
impl TokenStore for PgStore {
    /// Both records of a pair land in one transaction.
    #[instrument(skip(self, records), fields(count = records.len()), err)]
    async fn insert_tokens(&self, records: &[TokenRecord]) -> StoreResult<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_tokens", e))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO tokens (id, user_id, token_hash, token_type, is_active, created_at, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(record.id.as_uuid())
            .bind(record.user_id.as_uuid())
            .bind(record.token_hash.as_str())
            .bind(record.kind.as_str())
            .bind(record.is_active)
            .bind(record.created_at)
            .bind(record.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_tokens", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_tokens", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(live = tracing::field::Empty), err)]
    async fn count_active(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<usize> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS live
            FROM tokens
            WHERE user_id = $1 AND is_active AND expires_at > $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_sqlx_error("count_active", e))?;

        let live: i64 = row
            .try_get("live")
            .map_err(|e| map_sqlx_error("count_active", e))?;
        Span::current().record("live", live);

        Ok(usize::try_from(live).unwrap_or_default())
    }

    #[instrument(skip(self, token_hash), err)]
    async fn find_active(
        &self,
        user_id: UserId,
        token_hash: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>> {
        let row = sqlx::query(&format!(
            "{TOKEN_SELECT} WHERE user_id = $1 AND token_hash = $2 AND token_type = $3 \
             AND is_active AND expires_at > $4 LIMIT 1"
        ))
        .bind(user_id.as_uuid())
        .bind(token_hash)
        .bind(kind.as_str())
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("find_active", e))?;

        decode_optional("find_active", row)
    }

    #[instrument(skip(self, token_hash), err)]
    async fn find_by_hash(
        &self,
        user_id: UserId,
        token_hash: &str,
    ) -> StoreResult<Option<TokenRecord>> {
        let row = sqlx::query(&format!(
            "{TOKEN_SELECT} WHERE user_id = $1 AND token_hash = $2 AND is_active LIMIT 1"
        ))
        .bind(user_id.as_uuid())
        .bind(token_hash)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("find_by_hash", e))?;

        decode_optional("find_by_hash", row)
    }

    #[instrument(skip(self), err)]
    async fn list_active(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TokenRecord>> {
        let rows = sqlx::query(&format!(
            "{TOKEN_SELECT} WHERE user_id = $1 AND is_active AND expires_at > $2 ORDER BY created_at"
        ))
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("list_active", e))?;

        rows.iter()
            .map(decode_token)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_active", e))
    }

    #[instrument(skip(self), fields(token_id = %id), err)]
    async fn deactivate(&self, id: TokenId) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE tokens SET is_active = FALSE WHERE id = $1 AND is_active")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("deactivate", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn deactivate_all(&self, user_id: UserId) -> StoreResult<usize> {
        let result =
            sqlx::query("UPDATE tokens SET is_active = FALSE WHERE user_id = $1 AND is_active")
                .bind(user_id.as_uuid())
                .execute(self.pool())
                .await
                .map_err(|e| map_sqlx_error("deactivate_all", e))?;

        Ok(result.rows_affected() as usize)
    }
}
