use std::sync::Arc;

use crate::auth::config::AuthConfig;
use crate::engine::community_engine::CommunityEngine;

use super::rate_limit::ApiRateLimiters;

/// Shared state handed to every handler.
pub struct AppState {
    pub engine: CommunityEngine,
    pub auth_config: AuthConfig,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    pub rate_limiters: Arc<ApiRateLimiters>,
}
