//! Best-effort audit trail appends.

use sea_orm::ConnectionTrait;
use tracing::{debug, warn};

use crate::db::NewActivity;
use crate::db::repositories::activity::ActivityRepository;

/// Appends audit entries on the caller's connection, usually the transaction
/// that carried the mutation. A failed append is logged and counted but never
/// returned, so it cannot abort the mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityRecorder;

impl ActivityRecorder {
    pub async fn record<C: ConnectionTrait>(self, conn: &C, entry: NewActivity) {
        let account_id = entry.account.value();
        let action = entry.action;
        let entity_type = entry.entity_type;
        let entity_id = entry.entity_id;

        match ActivityRepository::new(conn)
            .insert(entry, chrono::Utc::now().timestamp())
            .await
        {
            Ok(log) => {
                debug!(
                    account_id,
                    log_id = log.id,
                    action = %action,
                    entity_type = %entity_type,
                    "Activity recorded"
                );
            }
            Err(e) => {
                metrics::counter!("activity_log_write_failures_total").increment(1);
                warn!(
                    event = "activity_log_write_failed",
                    account_id,
                    action = %action,
                    entity_type = %entity_type,
                    entity_id = ?entity_id,
                    error = %e,
                    "Failed to record activity"
                );
            }
        }
    }
}
