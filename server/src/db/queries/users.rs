use sqlx::SqliteExecutor;

use crate::db::models::UserRow;

/// Insert or refresh the local mirror of a user's profile.
pub async fn upsert_user<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: &str,
    username: &str,
    email: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, username, email) VALUES (?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET username = excluded.username, email = excluded.email",
    )
    .bind(user_id)
    .bind(username)
    .bind(email)
    .execute(executor)
    .await?;
    Ok(())
}

/// Get user by ID.
pub async fn get_user<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::{create_pool, run_migrations};

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        upsert_user(&pool, "u1", "alice", None).await.unwrap();
        let u = get_user(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(u.username, "alice");
        assert!(u.email.is_none());

        upsert_user(&pool, "u1", "alice2", Some("a@test.com")).await.unwrap();
        let u = get_user(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(u.username, "alice2");
        assert_eq!(u.email.as_deref(), Some("a@test.com"));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert!(get_user(&pool, "nobody").await.unwrap().is_none());
    }
}
