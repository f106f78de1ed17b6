use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::User;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Inserts an unconfirmed user. `None` when the email is already taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> anyhow::Result<Option<User>>;

    /// Marks the user confirmed. `false` when no user has this email.
    async fn confirm_user(&self, email: &str) -> anyhow::Result<bool>;
}

#[async_trait]
impl UserRepo for PgPool {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, confirmed, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, confirmed, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(self)
        .await?;
        Ok(user)
    }

    async fn confirm_user(&self, email: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE users SET confirmed = TRUE WHERE email = $1"#)
            .bind(email)
            .execute(self)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
