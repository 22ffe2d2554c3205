/// Session-token settings shared by the HTTP layer and the CLI.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_expiry_hours: i64,
    pub public_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "classhall-dev-secret-change-me".to_string(),
            session_expiry_hours: 720, // 30 days
            public_url: "http://localhost:8080".to_string(),
        }
    }
}

impl AuthConfig {
    /// Whether the public URL points at a developer machine.
    pub fn is_local(&self) -> bool {
        self.public_url.contains("localhost") || self.public_url.contains("127.0.0.1")
    }
}
