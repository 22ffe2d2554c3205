use sqlx::SqliteExecutor;

use crate::db::models::{CreateServerParams, MemberDetailRow, ServerMemberRow, ServerRow};

/// Insert a new server row. Membership rows are added separately.
pub async fn create_server<'e, E: SqliteExecutor<'e>>(
    executor: E,
    params: &CreateServerParams<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO servers (id, name, description, created_by, join_code) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.created_by)
    .bind(params.join_code)
    .execute(executor)
    .await?;
    Ok(())
}

/// Get a server by ID.
pub async fn get_server<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
) -> Result<Option<ServerRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerRow>("SELECT * FROM servers WHERE id = ?")
        .bind(server_id)
        .fetch_optional(executor)
        .await
}

/// List all servers, ordered by name.
pub async fn list_all_servers<'e, E: SqliteExecutor<'e>>(
    executor: E,
) -> Result<Vec<ServerRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerRow>("SELECT * FROM servers ORDER BY name, id")
        .fetch_all(executor)
        .await
}

/// List all servers a user is a member of.
pub async fn list_servers_for_user<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: &str,
) -> Result<Vec<ServerRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerRow>(
        "SELECT s.* FROM servers s \
         JOIN server_members sm ON s.id = sm.server_id \
         WHERE sm.user_id = ? \
         ORDER BY s.name, s.id",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Overwrite a server's name and description.
pub async fn update_server<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    name: &str,
    description: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE servers SET name = ?, description = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(server_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Replace a server's join code.
pub async fn set_join_code<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    join_code: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE servers SET join_code = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(join_code)
        .bind(server_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Increment the server version if it still equals `expected`.
/// Returns false when another writer got there first.
pub async fn bump_version<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    expected: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE servers SET version = version + 1, updated_at = datetime('now') \
         WHERE id = ? AND version = ?",
    )
    .bind(server_id)
    .bind(expected)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Delete the server row itself. Returns whether a row was removed.
pub async fn delete_server<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM servers WHERE id = ?")
        .bind(server_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Add a user to a server. Returns false if they were already a member.
pub async fn add_server_member<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    user_id: &str,
    role: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("INSERT OR IGNORE INTO server_members (server_id, user_id, role) VALUES (?, ?, ?)")
            .bind(server_id)
            .bind(user_id)
            .bind(role)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// Remove a user from a server. Returns false if they were not a member.
pub async fn remove_server_member<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM server_members WHERE server_id = ? AND user_id = ?")
        .bind(server_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every membership of a server.
pub async fn delete_server_members<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM server_members WHERE server_id = ?")
        .bind(server_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Get a specific server member record.
pub async fn get_server_member<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    user_id: &str,
) -> Result<Option<ServerMemberRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerMemberRow>(
        "SELECT * FROM server_members WHERE server_id = ? AND user_id = ?",
    )
    .bind(server_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Get all members of a server in the order they joined.
pub async fn get_server_members<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
) -> Result<Vec<ServerMemberRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerMemberRow>(
        "SELECT server_id, user_id, role, joined_at FROM server_members \
         WHERE server_id = ? ORDER BY rowid",
    )
    .bind(server_id)
    .fetch_all(executor)
    .await
}

/// Get every membership row across all servers, grouped by server in join order.
pub async fn list_all_members<'e, E: SqliteExecutor<'e>>(
    executor: E,
) -> Result<Vec<ServerMemberRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerMemberRow>(
        "SELECT server_id, user_id, role, joined_at FROM server_members \
         ORDER BY server_id, rowid",
    )
    .fetch_all(executor)
    .await
}

/// Members of a server with their mirrored profile (username/email).
pub async fn get_member_details<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
) -> Result<Vec<MemberDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, MemberDetailRow>(
        "SELECT sm.user_id, sm.role, u.username, u.email FROM server_members sm \
         LEFT JOIN users u ON u.id = sm.user_id \
         WHERE sm.server_id = ? ORDER BY sm.rowid",
    )
    .bind(server_id)
    .fetch_all(executor)
    .await
}

/// Overwrite a member's role. Returns false if the membership does not exist.
pub async fn update_member_role<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    user_id: &str,
    role: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE server_members SET role = ? WHERE server_id = ? AND user_id = ?")
        .bind(role)
        .bind(server_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Count members holding a given role.
pub async fn count_members_with_role<'e, E: SqliteExecutor<'e>>(
    executor: E,
    server_id: &str,
    role: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM server_members WHERE server_id = ? AND role = ?")
        .bind(server_id)
        .bind(role)
        .fetch_one(executor)
        .await
}
