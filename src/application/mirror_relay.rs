use std::sync::Arc;
use std::time::Duration;

use crate::config::MirrorConfig;
use crate::domain::errors::DomainError;
use crate::domain::mirror::MirrorTask;
use crate::domain::ports::MirrorOutbox;
use crate::rpc::LegacyRpcClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Drains the legacy mirror outbox into the tracker. Delivery failures only
/// ever touch the outbox row; the primary write is long committed.
pub struct MirrorRelay<M> {
    outbox: Arc<M>,
    client: LegacyRpcClient,
    batch_size: i64,
    max_attempts: i32,
}

impl<M: MirrorOutbox> MirrorRelay<M> {
    pub fn new(outbox: M, client: LegacyRpcClient, config: &MirrorConfig) -> Self {
        Self {
            outbox: Arc::new(outbox),
            client,
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
        }
    }

    pub async fn run_once(&self) -> Result<RelayReport, DomainError> {
        let mut report = RelayReport::default();
        if !self.client.is_configured() {
            log::debug!("Legacy tracker not configured, leaving mirror outbox untouched");
            return Ok(report);
        }

        let (limit, max_attempts) = (self.batch_size, self.max_attempts);
        let tasks = self
            .blocking(move |outbox| outbox.pending(limit, max_attempts))
            .await?;

        for task in tasks {
            if self.deliver(&task).await? {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        if report != RelayReport::default() {
            log::info!(
                "Mirror relay: {} delivered, {} failed",
                report.delivered,
                report.failed
            );
        }
        Ok(report)
    }

    /// Polls forever. Errors from a single pass are logged and the next tick
    /// tries again.
    pub async fn run(self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                log::error!("Mirror relay pass failed: {}", e);
            }
        }
    }

    async fn deliver(&self, task: &MirrorTask) -> Result<bool, DomainError> {
        let id = task.id;
        let failure = match self
            .client
            .call(&task.event.action, task.event.payload.clone())
            .await
        {
            Ok(response) if response.success => {
                self.blocking(move |outbox| outbox.mark_delivered(id)).await?;
                return Ok(true);
            }
            Ok(response) => response
                .error
                .unwrap_or_else(|| "tracker reported failure".to_string()),
            Err(e) => e.to_string(),
        };

        if task.attempts + 1 >= self.max_attempts {
            log::error!(
                "Mirror {} for {} {} failed for the last time: {}",
                task.event.action,
                task.event.aggregate_type,
                task.event.aggregate_id,
                failure
            );
        } else {
            log::warn!(
                "Mirror {} for {} {} failed (attempt {}): {}",
                task.event.action,
                task.event.aggregate_type,
                task.event.aggregate_id,
                task.attempts + 1,
                failure
            );
        }
        self.blocking(move |outbox| outbox.mark_failed(id, &failure))
            .await?;
        Ok(false)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&M) -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let outbox = Arc::clone(&self.outbox);
        tokio::task::spawn_blocking(move || f(outbox.as_ref()))
            .await
            .map_err(|e| DomainError::Persistence(format!("outbox task panicked: {e}")))?
    }
}
