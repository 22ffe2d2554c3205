//! JSON shapes returned by the engine. Field names are camelCase on the wire.

use serde::Serialize;

use super::roles::MemberRole;

/// A `{userId, role}` pair as stored in a server's member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEntry {
    pub user_id: String,
    pub role: MemberRole,
}

/// A server with its member list and category references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: String,
    /// Only present for admins of the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
    pub members: Vec<MemberEntry>,
    pub categories: Vec<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ServerView {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn role_of(&self, user_id: &str) -> Option<MemberRole> {
        self.members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role)
    }
}

/// A server in the global listing, annotated for the requester.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedServer {
    #[serde(flatten)]
    pub server: ServerView,
    pub is_member: bool,
}

/// A member expanded with the user's profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub user_id: String,
    pub role: MemberRole,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

/// Channel projection used in server details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetail {
    pub id: String,
    pub channel_name: String,
    pub allowed_roles: Vec<String>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    pub id: String,
    pub name: String,
    pub position: i32,
    pub channels: Vec<ChannelDetail>,
}

/// Fully expanded server, as returned by the details endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
    pub members: Vec<MemberDetail>,
    pub categories: Vec<CategoryDetail>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// What a cascade delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub categories: u64,
    pub channels: u64,
    pub messages: u64,
    pub members: u64,
}
