use serde::{Deserialize, Serialize};

/// A stored server (community) from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServerRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub join_code: String,
    /// Bumped on every mutation; used for conditional writes.
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A server membership record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServerMemberRow {
    pub server_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
}

/// A membership joined with the member's user profile, if one is known.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberDetailRow {
    pub user_id: String,
    pub role: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// A locally mirrored user profile.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub created_at: String,
}

/// A category (grouping of channels) owned by a server.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub server_id: String,
    pub name: String,
    pub position: i32,
    pub created_at: String,
}

/// A text channel owned by a category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TextChannelRow {
    pub id: String,
    pub category_id: String,
    pub channel_name: String,
    /// JSON array of role names.
    pub allowed_roles: String,
    pub created_at: String,
}

/// A stored message in a text channel.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

/// Parameters for inserting a new server (avoids too-many-arguments).
pub struct CreateServerParams<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub created_by: &'a str,
    pub join_code: &'a str,
}
