use sqlx::SqliteConnection;
use tracing::info;

use crate::auth::token::join_codes_match;
use crate::db::models::ServerMemberRow;
use crate::db::queries::servers;
use crate::error::AppError;

use super::community_engine::{
    CommunityEngine, build_view, bump_or_stale, load_server, parse_role, require_admin,
};
use super::roles::MemberRole;
use super::views::ServerView;

/// Refuse to take the Admin role away from the only Admin left.
async fn ensure_not_last_admin(
    conn: &mut SqliteConnection,
    member: &ServerMemberRow,
) -> Result<(), AppError> {
    if parse_role(&member.role)? != MemberRole::Admin {
        return Ok(());
    }
    let admins =
        servers::count_members_with_role(&mut *conn, &member.server_id, MemberRole::Admin.as_str())
            .await?;
    if admins <= 1 {
        return Err(AppError::BadRequest(
            "A server must keep at least one admin".into(),
        ));
    }
    Ok(())
}

impl CommunityEngine {
    /// Join a server as a Student, gated by its join code.
    pub async fn join_server(
        &self,
        server_id: &str,
        user_id: &str,
        join_code: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let server = load_server(&mut tx, server_id).await?;

        if !join_codes_match(&server.join_code, join_code) {
            return Err(AppError::Forbidden("Invalid join code"));
        }

        // The creator takes back an admin-less server; everyone else starts as Student
        let admins =
            servers::count_members_with_role(&mut *tx, server_id, MemberRole::Admin.as_str())
                .await?;
        let role = if admins == 0 && server.created_by == user_id {
            MemberRole::Admin
        } else {
            MemberRole::Student
        };

        let added = servers::add_server_member(&mut *tx, server_id, user_id, role.as_str()).await?;
        if !added {
            return Err(AppError::AlreadyMember);
        }
        bump_or_stale(&mut tx, server_id, server.version).await?;
        tx.commit().await?;

        info!(%server_id, %user_id, %role, "user joined server");
        Ok(())
    }

    /// Leave a server. Leaving a server you are not in is a no-op.
    ///
    /// The last Admin may only leave once nobody else is left in the server.
    pub async fn leave_server(&self, server_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;
        let server = load_server(&mut tx, server_id).await?;

        let Some(member) = servers::get_server_member(&mut *tx, server_id, user_id).await? else {
            return Ok(());
        };
        if servers::get_server_members(&mut *tx, server_id).await?.len() > 1 {
            ensure_not_last_admin(&mut tx, &member).await?;
        }

        servers::remove_server_member(&mut *tx, server_id, user_id).await?;
        bump_or_stale(&mut tx, server_id, server.version).await?;
        tx.commit().await?;
        info!(%server_id, %user_id, "user left server");
        Ok(())
    }

    /// Overwrite one member's role. Admin only.
    pub async fn update_member_role(
        &self,
        server_id: &str,
        requester_id: &str,
        member_id: &str,
        role: &str,
    ) -> Result<MemberRole, AppError> {
        let role: MemberRole = role.parse().map_err(AppError::BadRequest)?;

        let mut tx = self.begin_write().await?;
        let server = load_server(&mut tx, server_id).await?;
        require_admin(&mut tx, server_id, requester_id).await?;

        let member = servers::get_server_member(&mut *tx, server_id, member_id)
            .await?
            .ok_or(AppError::NotFound("Member not found in this server"))?;
        if role != MemberRole::Admin {
            ensure_not_last_admin(&mut tx, &member).await?;
        }

        servers::update_member_role(&mut *tx, server_id, member_id, role.as_str()).await?;
        bump_or_stale(&mut tx, server_id, server.version).await?;
        tx.commit().await?;

        info!(%server_id, %member_id, %role, updated_by = %requester_id, "member role updated");
        Ok(role)
    }

    /// Remove a user from a server and return the updated server. Admin only.
    pub async fn remove_user_from_server(
        &self,
        server_id: &str,
        requester_id: &str,
        user_id: &str,
    ) -> Result<ServerView, AppError> {
        let mut tx = self.begin_write().await?;
        let server = load_server(&mut tx, server_id).await?;
        require_admin(&mut tx, server_id, requester_id).await?;

        if let Some(member) = servers::get_server_member(&mut *tx, server_id, user_id).await? {
            ensure_not_last_admin(&mut tx, &member).await?;
            servers::remove_server_member(&mut *tx, server_id, user_id).await?;
            bump_or_stale(&mut tx, server_id, server.version).await?;
            info!(%server_id, %user_id, removed_by = %requester_id, "user removed from server");
        }

        let updated = load_server(&mut tx, server_id).await?;
        let view = build_view(&mut tx, updated, requester_id).await?;
        tx.commit().await?;
        Ok(view)
    }
}
