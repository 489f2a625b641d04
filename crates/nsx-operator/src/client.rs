//! Typed NSX API clients the resource services are built on.
//!
//! The transport lives outside this crate. Implementations wrap the NSX
//! policy API; tests use in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use nsx_orch_common::{ClientResult, RealizedEntitiesClient, ResourceLister};

use crate::subnetport::SubnetPort;
use crate::virtualserver::{Group, LbVirtualServer};

/// `/infra/lb-virtual-servers`.
#[async_trait]
pub trait VirtualServerClient: ResourceLister<LbVirtualServer> {
    async fn patch(&self, id: &str, vs: &LbVirtualServer) -> ClientResult<()>;
    async fn get(&self, id: &str) -> ClientResult<LbVirtualServer>;
    async fn delete(&self, id: &str) -> ClientResult<()>;
}

/// `/infra/domains/<domain>/groups`.
#[async_trait]
pub trait GroupClient: Send + Sync {
    async fn get(&self, domain_id: &str, group_id: &str) -> ClientResult<Group>;
    async fn patch(&self, domain_id: &str, group_id: &str, group: &Group) -> ClientResult<()>;
}

/// VPC subnet ports, addressed by the parent subnet path.
#[async_trait]
pub trait SubnetPortClient: ResourceLister<SubnetPort> {
    async fn patch(&self, subnet_path: &str, id: &str, port: &SubnetPort) -> ClientResult<()>;
    async fn get(&self, subnet_path: &str, id: &str) -> ClientResult<SubnetPort>;
    async fn delete(&self, subnet_path: &str, id: &str) -> ClientResult<()>;
}

/// A Pod as seen by the garbage collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodMeta {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

impl PodMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// Lists the Pods that currently exist in the cluster.
#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list_pods(&self) -> ClientResult<Vec<PodMeta>>;
}

/// Every remote collaborator of the services.
#[derive(Clone)]
pub struct NsxClients {
    pub realized_entities: Arc<dyn RealizedEntitiesClient>,
    pub virtual_servers: Arc<dyn VirtualServerClient>,
    pub groups: Arc<dyn GroupClient>,
    pub subnet_ports: Arc<dyn SubnetPortClient>,
    pub pods: Arc<dyn PodLister>,
}
