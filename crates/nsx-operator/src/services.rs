//! Service assembly and startup.
//!
//! [`NsxServices::start`] builds every service, bulk-loads their stores and
//! returns once they are ready for the reconcilers.
//! [`NsxServices::spawn_garbage_collectors`] then starts the periodic
//! collectors.

use std::sync::Arc;

use nsx_orch_common::{
    initialize_stores, run_garbage_collector, ListerLoader, NsxResult, RealizeStateService,
    ResourceKind, StoreLoader,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::NsxClients;
use crate::config::NsxOperatorConfig;
use crate::pod::PodPortGarbageCollector;
use crate::subnetport::{self, SubnetPortService};
use crate::virtualserver::{self, VirtualServerService};

/// Every resource service, sharing one realization poller.
pub struct NsxServices {
    pub config: NsxOperatorConfig,
    pub realizer: RealizeStateService,
    pub virtual_servers: Arc<VirtualServerService>,
    pub subnet_ports: Arc<SubnetPortService>,
    pub pod_gc: Arc<PodPortGarbageCollector>,
}

impl NsxServices {
    /// Builds the services and populates their stores from NSX.
    pub async fn start(config: NsxOperatorConfig, clients: NsxClients) -> NsxResult<Self> {
        let realizer = RealizeStateService::new(clients.realized_entities.clone());

        let vs_store = Arc::new(virtualserver::new_store());
        let port_store = Arc::new(subnetport::new_store());
        let loaders: Vec<Arc<dyn StoreLoader>> = vec![
            Arc::new(ListerLoader::new(
                vs_store.clone(),
                clients.virtual_servers.clone(),
            )),
            Arc::new(ListerLoader::new(
                port_store.clone(),
                clients.subnet_ports.clone(),
            )),
        ];
        let loaded = initialize_stores(loaders).await?;

        let virtual_servers = Arc::new(VirtualServerService::new(
            config.cluster.clone(),
            clients.virtual_servers.clone(),
            clients.groups.clone(),
            realizer.clone(),
            config.retry.for_kind(ResourceKind::LbVirtualServer),
            config.vip_group.clone(),
            vs_store,
        ));
        let subnet_ports = Arc::new(SubnetPortService::new(
            clients.subnet_ports.clone(),
            realizer.clone(),
            config.retry.for_kind(ResourceKind::SubnetPort),
            port_store,
        ));
        let pod_gc = Arc::new(PodPortGarbageCollector::new(
            subnet_ports.clone(),
            clients.pods.clone(),
        ));

        info!(cluster = %config.cluster, loaded, "NSX services started");
        Ok(Self {
            config,
            realizer,
            virtual_servers,
            subnet_ports,
            pod_gc,
        })
    }

    /// Starts the garbage collectors on the configured interval.
    pub fn spawn_garbage_collectors(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(run_garbage_collector(
            self.pod_gc.clone(),
            self.config.gc_interval(),
            cancel,
        ))]
    }
}
