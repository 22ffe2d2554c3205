use sqlx::SqliteExecutor;

use crate::db::models::CategoryRow;

/// Create a new category in a server.
pub async fn create_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: &str,
    server_id: &str,
    name: &str,
    position: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO categories (id, server_id, name, position) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(server_id)
        .bind(name)
        .bind(position)
        .execute(executor)
        .await?;
    Ok(())
}

/// List all categories in a server, ordered by position.
pub async fn list_categories<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
) -> Result<Vec<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        "SELECT * FROM categories WHERE server_id = ? ORDER BY position, rowid",
    )
    .bind(server_id)
    .fetch_all(executor)
    .await
}

/// (server_id, category_id) pairs for every category, in position order.
pub async fn list_category_refs<'e, E: SqliteExecutor<'e>>(
    executor: E,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        "SELECT server_id, id FROM categories ORDER BY server_id, position, rowid",
    )
    .fetch_all(executor)
    .await
}

/// Get a category by ID.
pub async fn get_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    category_id: &str,
) -> Result<Option<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(executor)
        .await
}

/// Delete a category. Its channels must already be gone.
pub async fn delete_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    category_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(category_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
