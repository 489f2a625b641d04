//! Periodic garbage collection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A service that removes NSX resources whose Kubernetes owner is gone.
#[async_trait]
pub trait GarbageCollector: Send + Sync {
    fn name(&self) -> &str;

    /// Runs one collection round. Failures are logged by the implementation
    /// and retried on the next round.
    async fn collect_garbage(&self);
}

/// Runs `collector` every `interval` until `cancel` fires.
///
/// The first round starts one interval after the call, once the stores
/// have been populated.
pub async fn run_garbage_collector(
    collector: Arc<dyn GarbageCollector>,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(collector = collector.name(), ?interval, "starting garbage collector");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(collector = collector.name(), "garbage collector stopped");
                return;
            }
            _ = tokio::time::sleep(interval) => {
                debug!(collector = collector.name(), "garbage collection round");
                collector.collect_garbage().await;
            }
        }
        if interval.is_zero() {
            warn!(collector = collector.name(), "zero interval, stopping garbage collector");
            return;
        }
    }
}
