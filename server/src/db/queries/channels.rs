use sqlx::SqliteExecutor;

use crate::db::models::TextChannelRow;

/// Create a text channel inside a category.
pub async fn create_channel<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: &str,
    category_id: &str,
    channel_name: &str,
    allowed_roles: &[String],
) -> Result<(), sqlx::Error> {
    let roles = serde_json::to_string(allowed_roles).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "INSERT INTO text_channels (id, category_id, channel_name, allowed_roles) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(category_id)
    .bind(channel_name)
    .bind(roles)
    .execute(executor)
    .await?;
    Ok(())
}

/// Get a channel by ID.
pub async fn get_channel<'e, E: SqliteExecutor<'e>>(
    executor: E,
    channel_id: &str,
) -> Result<Option<TextChannelRow>, sqlx::Error> {
    sqlx::query_as::<_, TextChannelRow>("SELECT * FROM text_channels WHERE id = ?")
        .bind(channel_id)
        .fetch_optional(executor)
        .await
}

/// List the channels of a category in creation order.
pub async fn list_channels<'e, E: SqliteExecutor<'e>>(
    executor: E,
    category_id: &str,
) -> Result<Vec<TextChannelRow>, sqlx::Error> {
    sqlx::query_as::<_, TextChannelRow>(
        "SELECT * FROM text_channels WHERE category_id = ? ORDER BY rowid",
    )
    .bind(category_id)
    .fetch_all(executor)
    .await
}

/// Delete every channel of a category. Returns the number removed.
pub async fn delete_channels_in_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    category_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM text_channels WHERE category_id = ?")
        .bind(category_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
