use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::RetentionConfig;
use crate::services::AuditService;

/// Periodically purges activity log entries past the retention horizon.
/// Runs once immediately, then on the configured interval or cron schedule.
pub struct RetentionScheduler {
    audit: Arc<dyn AuditService>,
    config: RetentionConfig,
}

/// Owner of a running scheduler task.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the task to stop and waits for it. A sweep already in progress
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Retention scheduler task failed: {}", e);
        }
    }
}

impl RetentionScheduler {
    #[must_use]
    pub fn new(audit: Arc<dyn AuditService>, config: RetentionConfig) -> Self {
        Self { audit, config }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            if let Err(e) = self.start(rx).await {
                error!("Retention scheduler error: {}", e);
            }
        });
        SchedulerHandle { shutdown: tx, task }
    }

    async fn start(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        if !self.config.enabled {
            info!("Activity log retention is disabled in config");
            return Ok(());
        }

        info!(
            horizon_days = self.config.horizon_days,
            "Starting activity log retention"
        );

        if let Some(cron_expr) = self.config.cron_expression.clone() {
            self.run_with_cron(&cron_expr, shutdown).await
        } else {
            self.run_with_interval(shutdown).await
        }
    }

    /// One sweep, with the structured job events the interval and cron paths share.
    pub async fn run_once(audit: &dyn AuditService, horizon_seconds: i64) -> Result<u64> {
        let start = std::time::Instant::now();
        info!(
            event = "job_started",
            job_name = "purge_activity_logs",
            "Starting activity log purge"
        );

        match audit.purge_older_than(horizon_seconds).await {
            Ok(deleted) => {
                info!(
                    event = "job_finished",
                    job_name = "purge_activity_logs",
                    deleted,
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Activity log purge finished"
                );
                Ok(deleted)
            }
            Err(e) => {
                error!(
                    event = "job_failed",
                    job_name = "purge_activity_logs",
                    error = %e,
                    "Activity log purge failed"
                );
                Err(e.into())
            }
        }
    }

    async fn run_with_cron(
        &self,
        cron_expr: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let horizon = self.config.horizon_seconds();

        let _ = Self::run_once(self.audit.as_ref(), horizon).await;

        let mut sched = JobScheduler::new().await?;

        let audit = Arc::clone(&self.audit);
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let audit = Arc::clone(&audit);
            Box::pin(async move {
                let _ = Self::run_once(audit.as_ref(), horizon).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Retention running with cron: {}", cron_expr);

        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        sched.shutdown().await?;
        info!("Retention scheduler stopped");
        Ok(())
    }

    async fn run_with_interval(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let hours = self.config.interval_hours.max(1);
        let horizon = self.config.horizon_seconds();

        info!("Retention running: purge every {}h", hours);

        // The first tick completes immediately, which gives the startup sweep.
        let mut ticker = interval(Duration::from_secs(u64::from(hours) * 60 * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = Self::run_once(self.audit.as_ref(), horizon).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Retention scheduler stopped");
        Ok(())
    }
}
