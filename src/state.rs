use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuditService, AuthService, InventoryService, ResendNotifier, ResetNotifier,
    RetentionScheduler, SeaOrmAuditService, SeaOrmAuthService, SeaOrmInventoryService,
    SessionIssuer,
};

/// Process-owned dependencies, built once and handed to the HTTP layer, the
/// scheduler, and CLI commands.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub sessions: SessionIssuer,

    pub auth_service: Arc<dyn AuthService>,

    pub inventory_service: Arc<dyn InventoryService>,

    pub audit_service: Arc<dyn AuditService>,
}

impl SharedState {
    /// Connects the store and uses the email provider from config, if any.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let notifier = ResendNotifier::from_config(&config.email)?
            .map(|n| Arc::new(n) as Arc<dyn ResetNotifier>);

        if notifier.is_some() {
            info!("Password reset emails enabled (Resend)");
        } else {
            info!("No email provider configured; reset links are delivered directly");
        }

        Self::with_notifier(config, notifier).await
    }

    pub async fn with_notifier(
        config: Config,
        notifier: Option<Arc<dyn ResetNotifier>>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::from_parts(config, store, notifier))
    }

    #[must_use]
    pub fn from_parts(
        config: Config,
        store: Store,
        notifier: Option<Arc<dyn ResetNotifier>>,
    ) -> Self {
        let sessions = SessionIssuer::from_config(&config.security);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            sessions.clone(),
            &config,
            notifier,
        )) as Arc<dyn AuthService>;

        let inventory_service =
            Arc::new(SeaOrmInventoryService::new(store.clone())) as Arc<dyn InventoryService>;

        let audit_service =
            Arc::new(SeaOrmAuditService::new(store.clone())) as Arc<dyn AuditService>;

        Self {
            config: Arc::new(config),
            store,
            sessions,
            auth_service,
            inventory_service,
            audit_service,
        }
    }

    #[must_use]
    pub fn retention_scheduler(&self) -> RetentionScheduler {
        RetentionScheduler::new(self.audit_service.clone(), self.config.retention.clone())
    }
}
