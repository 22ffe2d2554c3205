use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::auth::token::generate_join_code;
use crate::db::models::ServerRow;
use crate::db::queries::{categories, servers};
use crate::error::AppError;

use super::roles::MemberRole;
use super::views::{MemberEntry, ServerView};

/// Entry point for every server, membership and cascade operation.
///
/// Holds no domain state of its own; each call loads what it needs from the
/// database and writes back inside a transaction. Mutations of a server bump
/// its `version` conditionally so a concurrent writer is reported as
/// [`AppError::StaleVersion`] instead of being silently overwritten.
#[derive(Clone)]
pub struct CommunityEngine {
    pub(super) db: SqlitePool,
    join_code_length: usize,
}

impl CommunityEngine {
    pub fn new(db: SqlitePool, join_code_length: usize) -> Self {
        Self {
            db,
            join_code_length,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Open a write transaction. `BEGIN IMMEDIATE` takes the write lock before
    /// the first read, so overlapping writers queue on the busy timeout and the
    /// version check always sees the latest committed row.
    pub(super) async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.db.begin_with("BEGIN IMMEDIATE").await?)
    }

    pub(super) fn new_join_code(&self) -> String {
        generate_join_code(self.join_code_length)
    }
}

/// Load a server or fail with NotFound.
pub(super) async fn load_server(
    conn: &mut SqliteConnection,
    server_id: &str,
) -> Result<ServerRow, AppError> {
    servers::get_server(&mut *conn, server_id)
        .await?
        .ok_or(AppError::NotFound("Server not found"))
}

/// Fail with Forbidden unless `user_id` is an Admin of the server.
pub(super) async fn require_admin(
    conn: &mut SqliteConnection,
    server_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    let member = servers::get_server_member(&mut *conn, server_id, user_id).await?;
    match member {
        Some(m) if parse_role(&m.role)? == MemberRole::Admin => Ok(()),
        _ => Err(AppError::Forbidden("Insufficient permissions")),
    }
}

/// Conditionally bump the server version, failing if it moved since `expected`.
pub(super) async fn bump_or_stale(
    conn: &mut SqliteConnection,
    server_id: &str,
    expected: i64,
) -> Result<(), AppError> {
    if servers::bump_version(&mut *conn, server_id, expected).await? {
        Ok(())
    } else {
        Err(AppError::StaleVersion)
    }
}

pub(super) fn parse_role(role: &str) -> Result<MemberRole, AppError> {
    role.parse().map_err(AppError::Internal)
}

/// Assemble the member list and category references for a server row.
/// The join code is only revealed to admins of the server.
pub(super) async fn build_view(
    conn: &mut SqliteConnection,
    row: ServerRow,
    viewer_id: &str,
) -> Result<ServerView, AppError> {
    let members = servers::get_server_members(&mut *conn, &row.id)
        .await?
        .into_iter()
        .map(|m| -> Result<MemberEntry, AppError> {
            Ok(MemberEntry {
                role: parse_role(&m.role)?,
                user_id: m.user_id,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    let category_ids = categories::list_categories(&mut *conn, &row.id)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    Ok(assemble_view(row, members, category_ids, viewer_id))
}

pub(super) fn assemble_view(
    row: ServerRow,
    members: Vec<MemberEntry>,
    categories: Vec<String>,
    viewer_id: &str,
) -> ServerView {
    let viewer_is_admin = members
        .iter()
        .any(|m| m.user_id == viewer_id && m.role == MemberRole::Admin);
    ServerView {
        join_code: viewer_is_admin.then_some(row.join_code),
        id: row.id,
        name: row.name,
        description: row.description,
        created_by: row.created_by,
        members,
        categories,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
