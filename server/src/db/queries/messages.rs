use sqlx::SqliteExecutor;

use crate::db::models::MessageRow;

/// Store a message in a text channel.
pub async fn insert_message<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: &str,
    channel_id: &str,
    sender_id: &str,
    content: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO messages (id, channel_id, sender_id, content) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(channel_id)
        .bind(sender_id)
        .bind(content)
        .execute(executor)
        .await?;
    Ok(())
}

/// Messages of a channel, oldest first.
pub async fn list_messages<'e, E: SqliteExecutor<'e>>(
    executor: E,
    channel_id: &str,
) -> Result<Vec<MessageRow>, sqlx::Error> {
    sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM messages WHERE channel_id = ? ORDER BY created_at, rowid",
    )
    .bind(channel_id)
    .fetch_all(executor)
    .await
}

/// Delete all messages in every channel of a category.
pub async fn delete_messages_in_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    category_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM messages WHERE channel_id IN \
         (SELECT id FROM text_channels WHERE category_id = ?)",
    )
    .bind(category_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CreateServerParams;
    use crate::db::pool::{create_pool, run_migrations};
    use crate::db::queries::{categories, channels, servers};
    use sqlx::SqlitePool;

    async fn setup_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        servers::create_server(
            &pool,
            &CreateServerParams {
                id: "s1",
                name: "Test",
                description: "",
                created_by: "u1",
                join_code: "code",
            },
        )
        .await
        .unwrap();
        categories::create_category(&pool, "cat1", "s1", "A", 0).await.unwrap();
        categories::create_category(&pool, "cat2", "s1", "B", 1).await.unwrap();
        channels::create_channel(&pool, "ch1", "cat1", "one", &[]).await.unwrap();
        channels::create_channel(&pool, "ch2", "cat2", "two", &[]).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_list_messages_in_order() {
        let pool = setup_db().await;
        insert_message(&pool, "m1", "ch1", "u1", "first").await.unwrap();
        insert_message(&pool, "m2", "ch1", "u2", "second").await.unwrap();

        let msgs = list_messages(&pool, "ch1").await.unwrap();
        let contents: Vec<&str> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_messages_in_category_is_scoped() {
        let pool = setup_db().await;
        insert_message(&pool, "m1", "ch1", "u1", "x").await.unwrap();
        insert_message(&pool, "m2", "ch1", "u1", "y").await.unwrap();
        insert_message(&pool, "m3", "ch2", "u1", "z").await.unwrap();

        assert_eq!(delete_messages_in_category(&pool, "cat1").await.unwrap(), 2);
        assert!(list_messages(&pool, "ch1").await.unwrap().is_empty());
        assert_eq!(list_messages(&pool, "ch2").await.unwrap().len(), 1);
    }
}
