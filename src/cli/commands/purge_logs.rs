use crate::config::Config;
use crate::db::Store;
use crate::services::{RetentionScheduler, SeaOrmAuditService};

/// Runs one retention sweep. `days` overrides the configured horizon.
pub async fn cmd_purge_logs(config: &Config, days: Option<u32>) -> anyhow::Result<()> {
    let horizon_days = days.unwrap_or(config.retention.horizon_days);
    if horizon_days == 0 {
        anyhow::bail!("--days must be greater than 0");
    }

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let audit = SeaOrmAuditService::new(store);

    let horizon_seconds = i64::from(horizon_days) * 24 * 60 * 60;
    let deleted = RetentionScheduler::run_once(&audit, horizon_seconds).await?;

    println!(
        "Removed {} activity log entr{} older than {} days.",
        deleted,
        if deleted == 1 { "y" } else { "ies" },
        horizon_days
    );
    Ok(())
}
