//! Garbage collection of subnet ports whose Pod is gone.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nsx_orch_common::GarbageCollector;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::audit::{AuditCategory, AuditRecord};
use crate::audit_log;
use crate::client::PodLister;
use crate::subnetport::{build_subnet_port_id, SubnetPort, SubnetPortService};

/// Deletion counters, cumulative over all rounds.
#[derive(Debug, Default)]
pub struct GcStats {
    delete_total: AtomicU64,
    delete_success: AtomicU64,
    delete_fail: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcStatsSnapshot {
    pub delete_total: u64,
    pub delete_success: u64,
    pub delete_fail: u64,
}

impl GcStats {
    pub fn snapshot(&self) -> GcStatsSnapshot {
        GcStatsSnapshot {
            delete_total: self.delete_total.load(Ordering::Relaxed),
            delete_success: self.delete_success.load(Ordering::Relaxed),
            delete_fail: self.delete_fail.load(Ordering::Relaxed),
        }
    }
}

/// Deletes subnet ports tagged for a Pod that no longer exists.
pub struct PodPortGarbageCollector {
    ports: Arc<SubnetPortService>,
    pods: Arc<dyn PodLister>,
    stats: GcStats,
}

impl PodPortGarbageCollector {
    pub fn new(ports: Arc<SubnetPortService>, pods: Arc<dyn PodLister>) -> Self {
        Self {
            ports,
            pods,
            stats: GcStats::default(),
        }
    }

    pub fn stats(&self) -> GcStatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl GarbageCollector for PodPortGarbageCollector {
    fn name(&self) -> &str {
        "pod"
    }

    async fn collect_garbage(&self) {
        info!("pod garbage collector started");
        let nsx_port_ids = self.ports.list_ids_for_pods();
        if nsx_port_ids.is_empty() {
            return;
        }

        let pods = match self.pods.list_pods().await {
            Ok(pods) => pods,
            Err(e) => {
                error!(error = %e, "failed to list Pods");
                return;
            }
        };
        let live: HashSet<String> = pods
            .iter()
            .map(|pod| build_subnet_port_id(&pod.name, &pod.uid))
            .collect();

        for id in nsx_port_ids.difference(&live) {
            debug!(id = %id, "GC collected Pod subnet port");
            self.stats.delete_total.fetch_add(1, Ordering::Relaxed);
            let result = self.ports.delete_by_id(id).await;
            audit_log!(AuditRecord::new(AuditCategory::GarbageCollect, "PodPortGarbageCollector", "delete")
                .with_result(&result)
                .with_object_id(id.as_str())
                .with_object_type(SubnetPort::RESOURCE_TYPE));
            match result {
                Ok(()) => {
                    self.stats.delete_success.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!(id = %id, error = %e, "failed to delete stale subnet port");
                    self.stats.delete_fail.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}
