use tracing::info;

use crate::db::queries::{categories, channels, messages, servers};
use crate::error::AppError;

use super::community_engine::{CommunityEngine, load_server, require_admin};
use super::views::CascadeSummary;

impl CommunityEngine {
    /// Delete a server together with everything it owns. Admin only.
    ///
    /// For each category the channel messages go first, then the channels,
    /// then the category; membership rows and the server row come last. The
    /// whole walk runs in one transaction, so an error leaves nothing half
    /// deleted.
    pub async fn delete_server(
        &self,
        server_id: &str,
        requester_id: &str,
    ) -> Result<CascadeSummary, AppError> {
        let mut tx = self.begin_write().await?;
        load_server(&mut tx, server_id).await?;
        require_admin(&mut tx, server_id, requester_id).await?;

        let mut summary = CascadeSummary::default();
        for category in categories::list_categories(&mut *tx, server_id).await? {
            summary.messages += messages::delete_messages_in_category(&mut *tx, &category.id).await?;
            summary.channels += channels::delete_channels_in_category(&mut *tx, &category.id).await?;
            if categories::delete_category(&mut *tx, &category.id).await? {
                summary.categories += 1;
            }
        }
        summary.members = servers::delete_server_members(&mut *tx, server_id).await?;
        servers::delete_server(&mut *tx, server_id).await?;
        tx.commit().await?;

        info!(
            %server_id,
            deleted_by = %requester_id,
            categories = summary.categories,
            channels = summary.channels,
            messages = summary.messages,
            members = summary.members,
            "server deleted"
        );
        Ok(summary)
    }
}
