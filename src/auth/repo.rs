use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// Find an active user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, active, created_at
            FROM users
            WHERE email = $1 AND active
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find an active user by id. Deactivated accounts look like misses.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, active, created_at
            FROM users
            WHERE id = $1 AND active
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a hashed password. Role comes from the column
    /// default; signup cannot pick one.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token_hash, password_reset_expires, active, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Persist a new password hash. Stamps `password_changed_at` and wipes
    /// any outstanding reset token in the same statement; callers sign a
    /// fresh session token only after this returns.
    ///
    /// The change stamp is bound from the process clock, not `now()`: the
    /// token `iat` it gets compared against comes from the same clock.
    pub async fn update_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let changed_at = OffsetDateTime::now_utc();
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = $3,
                password_reset_token_hash = NULL,
                password_reset_expires = NULL
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token_hash, password_reset_expires, active, created_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(changed_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Store a reset token digest and its expiry, replacing any prior pair.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = $2, password_reset_expires = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = NULL, password_reset_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Look up the holder of an unexpired reset token digest.
    pub async fn find_by_reset_token(
        db: &PgPool,
        token_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, active, created_at
            FROM users
            WHERE password_reset_token_hash = $1
              AND password_reset_expires > now()
              AND active
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Consume a reset token and set the new password in one conditional
    /// update. Of two concurrent consumers exactly one gets a row back; the
    /// other sees `None`, same as an expired or unknown token.
    ///
    /// The change stamp comes from the process clock so it never lands ahead
    /// of the `iat` signed into the next session token. The expiry check
    /// stays on `now()`; against a ten-minute window the skew is noise.
    pub async fn consume_reset_token(
        db: &PgPool,
        token_hash: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let changed_at = OffsetDateTime::now_utc();
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = $3,
                password_reset_token_hash = NULL,
                password_reset_expires = NULL
            WHERE password_reset_token_hash = $1
              AND password_reset_expires > now()
              AND active
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token_hash, password_reset_expires, active, created_at
            "#,
        )
        .bind(token_hash)
        .bind(password_hash)
        .bind(changed_at)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Soft delete. The row stays for bookkeeping, auth lookups skip it.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET active = FALSE WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// All active users, newest first.
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, active, created_at
            FROM users
            WHERE active
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}
