//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

use crate::idempotency::{IdempotencyError, IdempotencyRepository};

// =========================================================================
// Expired Idempotency Key Deletion Job
// =========================================================================

/// Delete idempotency keys past their `expires_at` (24 hours by default)
pub async fn delete_expired_idempotency_keys(
    repository: &IdempotencyRepository,
) -> Result<u64, JobError> {
    let rows_deleted = repository.cleanup_expired().await?;

    if rows_deleted > 0 {
        tracing::info!(rows_deleted, "Deleted expired idempotency keys");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for idempotency key cleanup (default: 5 minutes)
    pub idempotency_cleanup_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            idempotency_cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    idempotency: IdempotencyRepository,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, JobSchedulerConfig::default())
    }

    /// Create with custom configuration.
    ///
    /// Intervals are floored at one second.
    pub fn with_config(pool: PgPool, mut config: JobSchedulerConfig) -> Self {
        config.idempotency_cleanup_interval = config
            .idempotency_cleanup_interval
            .max(MIN_INTERVAL);

        Self {
            idempotency: IdempotencyRepository::new(pool),
            config,
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.idempotency_cleanup_interval.as_secs(),
            "Job scheduler started"
        );

        let mut idempotency_interval = interval(self.config.idempotency_cleanup_interval);

        loop {
            idempotency_interval.tick().await;

            if let Err(e) = delete_expired_idempotency_keys(&self.idempotency).await {
                tracing::error!(error = %e, "Idempotency key deletion failed");
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match delete_expired_idempotency_keys(&self.idempotency).await {
            Ok(count) => report.idempotency_keys_deleted = count,
            Err(e) => report.errors.push(format!("Idempotency deletion: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub idempotency_keys_deleted: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Idempotency maintenance failed: {0}")]
    Idempotency(#[from] IdempotencyError),
}
