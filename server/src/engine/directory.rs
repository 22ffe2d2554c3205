use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::models::CreateServerParams;
use crate::db::queries::{categories, channels, messages, servers};
use crate::error::AppError;

use super::community_engine::{
    CommunityEngine, assemble_view, build_view, bump_or_stale, load_server, parse_role,
    require_admin,
};
use super::roles::MemberRole;
use super::validation::{validate_description, validate_server_name};
use super::views::{
    CategoryDetail, ChannelDetail, ListedServer, MemberDetail, MemberEntry, MessageView,
    ServerDetails, ServerView,
};

/// Fields of a server that may be patched. Structural fields (members,
/// join code, categories, creator) are not accepted here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateServerRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// If set, the update only applies when the stored version still matches.
    pub version: Option<i64>,
}

impl CommunityEngine {
    /// Create a server with the creator as its single Admin member.
    pub async fn create_server(
        &self,
        creator_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<ServerView, AppError> {
        let name = name.trim();
        let description = description.unwrap_or("").trim();
        validate_server_name(name).map_err(AppError::BadRequest)?;
        validate_description(description).map_err(AppError::BadRequest)?;

        let server_id = Uuid::new_v4().to_string();
        let join_code = self.new_join_code();

        let mut tx = self.begin_write().await?;
        servers::create_server(
            &mut *tx,
            &CreateServerParams {
                id: &server_id,
                name,
                description,
                created_by: creator_id,
                join_code: &join_code,
            },
        )
        .await?;
        servers::add_server_member(&mut *tx, &server_id, creator_id, MemberRole::Admin.as_str())
            .await?;
        let row = load_server(&mut tx, &server_id).await?;
        let view = build_view(&mut tx, row, creator_id).await?;
        tx.commit().await?;

        info!(%server_id, created_by = %creator_id, "server created");
        Ok(view)
    }

    /// A server with categories, channels, messages and member profiles expanded.
    pub async fn get_server_details(
        &self,
        server_id: &str,
        viewer_id: &str,
    ) -> Result<ServerDetails, AppError> {
        let mut conn = self.db.acquire().await?;
        let row = load_server(&mut conn, server_id).await?;

        let members = servers::get_member_details(&mut *conn, server_id)
            .await?
            .into_iter()
            .map(|m| -> Result<MemberDetail, AppError> {
                Ok(MemberDetail {
                    role: parse_role(&m.role)?,
                    user_id: m.user_id,
                    username: m.username,
                    email: m.email,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let mut category_details = Vec::new();
        for category in categories::list_categories(&mut *conn, server_id).await? {
            let mut channel_details = Vec::new();
            for channel in channels::list_channels(&mut *conn, &category.id).await? {
                let allowed_roles: Vec<String> = serde_json::from_str(&channel.allowed_roles)
                    .map_err(|e| {
                        AppError::Internal(format!(
                            "corrupt allowed_roles on channel {}: {e}",
                            channel.id
                        ))
                    })?;
                let history = messages::list_messages(&mut *conn, &channel.id)
                    .await?
                    .into_iter()
                    .map(|m| MessageView {
                        id: m.id,
                        sender_id: m.sender_id,
                        content: m.content,
                        created_at: m.created_at,
                    })
                    .collect();
                channel_details.push(ChannelDetail {
                    id: channel.id,
                    channel_name: channel.channel_name,
                    allowed_roles,
                    messages: history,
                });
            }
            category_details.push(CategoryDetail {
                id: category.id,
                name: category.name,
                position: category.position,
                channels: channel_details,
            });
        }

        let viewer_is_admin = members
            .iter()
            .any(|m| m.user_id == viewer_id && m.role == MemberRole::Admin);

        Ok(ServerDetails {
            join_code: viewer_is_admin.then_some(row.join_code),
            id: row.id,
            name: row.name,
            description: row.description,
            created_by: row.created_by,
            members,
            categories: category_details,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Apply a restricted patch (name/description). Admin only.
    pub async fn update_server(
        &self,
        server_id: &str,
        requester_id: &str,
        patch: UpdateServerRequest,
    ) -> Result<ServerView, AppError> {
        if patch.name.is_none() && patch.description.is_none() {
            return Err(AppError::BadRequest("Nothing to update".into()));
        }

        let mut tx = self.begin_write().await?;
        let row = load_server(&mut tx, server_id).await?;
        require_admin(&mut tx, server_id, requester_id).await?;
        if let Some(expected) = patch.version
            && expected != row.version
        {
            return Err(AppError::StaleVersion);
        }

        let name = patch.name.as_deref().map(str::trim).unwrap_or(&row.name);
        let description = patch
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or(&row.description);
        validate_server_name(name).map_err(AppError::BadRequest)?;
        validate_description(description).map_err(AppError::BadRequest)?;

        servers::update_server(&mut *tx, server_id, name, description).await?;
        bump_or_stale(&mut tx, server_id, row.version).await?;
        let updated = load_server(&mut tx, server_id).await?;
        let view = build_view(&mut tx, updated, requester_id).await?;
        tx.commit().await?;

        info!(%server_id, updated_by = %requester_id, "server updated");
        Ok(view)
    }

    /// Replace the join code with a fresh one. Admin only.
    pub async fn regenerate_join_code(
        &self,
        server_id: &str,
        requester_id: &str,
    ) -> Result<String, AppError> {
        let mut tx = self.begin_write().await?;
        let row = load_server(&mut tx, server_id).await?;
        require_admin(&mut tx, server_id, requester_id).await?;

        let join_code = self.new_join_code();
        servers::set_join_code(&mut *tx, server_id, &join_code).await?;
        bump_or_stale(&mut tx, server_id, row.version).await?;
        tx.commit().await?;

        info!(%server_id, rotated_by = %requester_id, "join code regenerated");
        Ok(join_code)
    }

    /// Every server, flagged with whether `requester_id` is a member.
    pub async fn list_servers(&self, requester_id: &str) -> Result<Vec<ListedServer>, AppError> {
        let mut conn = self.db.acquire().await?;
        let rows = servers::list_all_servers(&mut *conn).await?;

        let mut members_by_server: HashMap<String, Vec<MemberEntry>> = HashMap::new();
        for m in servers::list_all_members(&mut *conn).await? {
            let role = parse_role(&m.role)?;
            members_by_server
                .entry(m.server_id)
                .or_default()
                .push(MemberEntry {
                    user_id: m.user_id,
                    role,
                });
        }

        let mut categories_by_server: HashMap<String, Vec<String>> = HashMap::new();
        for (server_id, category_id) in categories::list_category_refs(&mut *conn).await? {
            categories_by_server
                .entry(server_id)
                .or_default()
                .push(category_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let members = members_by_server.remove(&row.id).unwrap_or_default();
                let category_ids = categories_by_server.remove(&row.id).unwrap_or_default();
                let server = assemble_view(row, members, category_ids, requester_id);
                let is_member = server.is_member(requester_id);
                ListedServer { server, is_member }
            })
            .collect())
    }

    /// The servers a user belongs to, derived from membership rows.
    pub async fn list_servers_for_user(&self, user_id: &str) -> Result<Vec<ServerView>, AppError> {
        let mut conn = self.db.acquire().await?;
        let rows = servers::list_servers_for_user(&mut *conn, user_id).await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(build_view(&mut conn, row, user_id).await?);
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::users;
    use crate::engine::test_support::{seed_category_with_channel, setup_engine, setup_file_engine};

    #[tokio::test]
    async fn test_create_server_bootstraps_admin() {
        let engine = setup_engine().await;
        let server = engine
            .create_server("u1", "CS101", Some("Intro"))
            .await
            .unwrap();

        assert_eq!(server.name, "CS101");
        assert_eq!(server.description, "Intro");
        assert_eq!(server.created_by, "u1");
        assert_eq!(
            server.members,
            vec![MemberEntry {
                user_id: "u1".into(),
                role: MemberRole::Admin
            }]
        );
        assert_eq!(server.join_code.as_deref().map(str::len), Some(8));

        let mine = engine.list_servers_for_user("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, server.id);
    }

    #[tokio::test]
    async fn test_create_server_rejects_bad_name() {
        let engine = setup_engine().await;
        let err = engine.create_server("u1", "   ", None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = engine
            .create_server("u1", &"x".repeat(101), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_server_details_expand_everything() {
        let engine = setup_engine().await;
        users::upsert_user(engine.db(), "u1", "alice", Some("alice@test.com"))
            .await
            .unwrap();
        let server = engine.create_server("u1", "CS101", None).await.unwrap();
        seed_category_with_channel(engine.db(), &server.id, "cat1", "ch1").await;

        let details = engine.get_server_details(&server.id, "u1").await.unwrap();
        assert_eq!(details.members.len(), 1);
        assert_eq!(details.members[0].username.as_deref(), Some("alice"));
        assert_eq!(details.categories.len(), 1);
        let channel = &details.categories[0].channels[0];
        assert_eq!(channel.channel_name, "general");
        assert_eq!(channel.allowed_roles, vec!["Admin", "Student"]);
        assert_eq!(channel.messages.len(), 1);
        assert!(details.join_code.is_some(), "admins see the join code");

        let outsider = engine.get_server_details(&server.id, "u9").await.unwrap();
        assert!(outsider.join_code.is_none());
    }

    #[tokio::test]
    async fn test_server_details_missing() {
        let engine = setup_engine().await;
        let err = engine.get_server_details("nope", "u1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_server_patches_name_only() {
        let engine = setup_engine().await;
        let server = engine
            .create_server("u1", "Old", Some("keep me"))
            .await
            .unwrap();

        let updated = engine
            .update_server(
                &server.id,
                "u1",
                UpdateServerRequest {
                    name: Some("New".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.version, server.version + 1);
        assert_eq!(updated.members, server.members);
        assert_eq!(updated.join_code, server.join_code);
    }

    #[tokio::test]
    async fn test_update_server_rules() {
        let engine = setup_engine().await;
        let server = engine.create_server("u1", "Old", None).await.unwrap();
        let rename = || UpdateServerRequest {
            name: Some("New".into()),
            ..Default::default()
        };

        let err = engine
            .update_server(&server.id, "u1", UpdateServerRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = engine
            .update_server(&server.id, "u2", rename())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = engine.update_server("nope", "u1", rename()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = engine
            .update_server(
                &server.id,
                "u1",
                UpdateServerRequest {
                    name: Some("New".into()),
                    version: Some(server.version + 5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleVersion));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_versioned_updates_conflict_instead_of_failing() {
        let (engine, _dir) = setup_file_engine().await;
        let server = engine.create_server("u1", "Old", None).await.unwrap();

        let mut handles = Vec::new();
        for name in ["First", "Second"] {
            let engine = engine.clone();
            let id = server.id.clone();
            let expected = server.version;
            handles.push(tokio::spawn(async move {
                engine
                    .update_server(
                        &id,
                        "u1",
                        UpdateServerRequest {
                            name: Some(name.into()),
                            version: Some(expected),
                            ..Default::default()
                        },
                    )
                    .await
            }));
        }

        let (mut applied, mut conflicts) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(AppError::StaleVersion) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!((applied, conflicts), (1, 1));

        let stored = servers::get_server(engine.db(), &server.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, server.version + 1);
    }

    #[test]
    fn test_update_request_rejects_structural_fields() {
        let parsed: Result<UpdateServerRequest, _> =
            serde_json::from_str(r#"{"name":"x","joinCode":"hack"}"#);
        assert!(parsed.is_err());
        let parsed: Result<UpdateServerRequest, _> =
            serde_json::from_str(r#"{"members":[]}"#);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_regenerate_join_code() {
        let engine = setup_engine().await;
        let server = engine.create_server("u1", "CS101", None).await.unwrap();
        let old = server.join_code.clone().unwrap();

        let new = engine.regenerate_join_code(&server.id, "u1").await.unwrap();
        assert_ne!(old, new);

        let err = engine
            .regenerate_join_code(&server.id, "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_list_servers_marks_membership() {
        let engine = setup_engine().await;
        let a = engine.create_server("u1", "Alpha", None).await.unwrap();
        let b = engine.create_server("u2", "Beta", None).await.unwrap();
        seed_category_with_channel(engine.db(), &a.id, "cat1", "ch1").await;

        let listed = engine.list_servers("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        for entry in &listed {
            assert_eq!(entry.is_member, entry.server.is_member("u1"));
        }
        let alpha = listed.iter().find(|s| s.server.id == a.id).unwrap();
        let beta = listed.iter().find(|s| s.server.id == b.id).unwrap();
        assert!(alpha.is_member);
        assert!(!beta.is_member);
        assert_eq!(alpha.server.categories, vec!["cat1"]);
        assert!(alpha.server.join_code.is_some());
        assert!(beta.server.join_code.is_none());
    }
}
