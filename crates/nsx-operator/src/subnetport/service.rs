use std::collections::HashSet;
use std::sync::Arc;

use nsx_orch_common::{Backoff, NsxError, NsxResult, RealizeStateService};
use tracing::{debug, info, instrument};

use crate::audit::{AuditCategory, AuditRecord};
use crate::audit_log;
use crate::client::SubnetPortClient;

use super::store::{index, SubnetPortStore};
use super::types::{build_subnet_port_id, pod_key, subnet_port_path, SubnetPort};

const SOURCE: &str = "SubnetPortService";

/// Creates, deletes and looks up VPC subnet ports of Pods.
pub struct SubnetPortService {
    client: Arc<dyn SubnetPortClient>,
    realizer: RealizeStateService,
    backoff: Backoff,
    store: Arc<SubnetPortStore>,
}

impl SubnetPortService {
    pub fn new(
        client: Arc<dyn SubnetPortClient>,
        realizer: RealizeStateService,
        backoff: Backoff,
        store: Arc<SubnetPortStore>,
    ) -> Self {
        Self {
            client,
            realizer,
            backoff,
            store,
        }
    }

    pub fn store(&self) -> &Arc<SubnetPortStore> {
        &self.store
    }

    /// Submits `port` under `subnet_path`, waits for realization and caches
    /// the confirmed object.
    #[instrument(skip(self, port), fields(id = port.id.as_deref().unwrap_or("")))]
    pub async fn create_or_update(&self, port: &SubnetPort, subnet_path: &str) -> NsxResult<SubnetPort> {
        let id = port
            .id
            .as_deref()
            .ok_or_else(|| NsxError::missing_id(SubnetPort::RESOURCE_TYPE))?;
        let category = if self.store.get_by_key(id).is_some() {
            AuditCategory::ResourceModify
        } else {
            AuditCategory::ResourceCreate
        };

        let result = self.realize(subnet_path, id, port).await;
        audit_log!(AuditRecord::new(category, SOURCE, "create_or_update")
            .with_result(&result)
            .with_object_id(id)
            .with_object_type(SubnetPort::RESOURCE_TYPE)
            .with_details(serde_json::json!({ "subnet_path": subnet_path })));
        let mut confirmed = result?;

        if confirmed.parent_path.is_none() {
            confirmed.parent_path = Some(subnet_path.to_string());
        }
        self.store.apply(confirmed.clone())?;
        info!(subnet_path, "subnet port realized");
        Ok(confirmed)
    }

    async fn realize(&self, subnet_path: &str, id: &str, port: &SubnetPort) -> NsxResult<SubnetPort> {
        self.client.patch(subnet_path, id, port).await?;
        self.realizer
            .check_realize_state(&self.backoff, &subnet_port_path(subnet_path, id), &[])
            .await?;
        Ok(self.client.get(subnet_path, id).await?)
    }

    /// Deletes the cached port `id`. Unknown ids are skipped.
    pub async fn delete_by_id(&self, id: &str) -> NsxResult<()> {
        match self.store.get_by_key(id) {
            Some(port) => self.delete(&port).await,
            None => {
                debug!(id, "subnet port not in store, skipping delete");
                Ok(())
            }
        }
    }

    /// Deletes `port` on NSX and drops it from the store.
    #[instrument(skip(self, port), fields(id = port.id.as_deref().unwrap_or("")))]
    pub async fn delete(&self, port: &SubnetPort) -> NsxResult<()> {
        let id = port
            .id
            .as_deref()
            .ok_or_else(|| NsxError::missing_id(SubnetPort::RESOURCE_TYPE))?;
        let subnet_path = port
            .subnet_path()
            .ok_or_else(|| NsxError::missing_field(SubnetPort::RESOURCE_TYPE, "parent_path"))?;

        let result = match self.client.delete(subnet_path, id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        };
        audit_log!(AuditRecord::new(AuditCategory::ResourceDelete, SOURCE, "delete")
            .with_result(&result)
            .with_object_id(id)
            .with_object_type(SubnetPort::RESOURCE_TYPE));
        result?;

        self.store.delete_by_key(id);
        info!(subnet_path, "subnet port deleted");
        Ok(())
    }

    /// Ids of every cached port owned by a Pod.
    pub fn list_ids_for_pods(&self) -> HashSet<String> {
        self.store
            .list()
            .iter()
            .filter(|port| port.pod_uid().is_some())
            .filter_map(|port| port.id.clone())
            .collect()
    }

    pub fn list_by_pod_name(&self, namespace: &str, name: &str) -> Vec<Arc<SubnetPort>> {
        self.store
            .get_by_index(index::POD_NAMESPACED_NAME, &pod_key(namespace, name))
    }

    /// Deletes every port of the Pod `namespace/name`, stopping at the first
    /// failure.
    pub async fn delete_by_pod_name(&self, namespace: &str, name: &str) -> NsxResult<()> {
        for port in self.list_by_pod_name(namespace, name) {
            self.delete(&port).await?;
        }
        Ok(())
    }

    pub fn list_by_subnet(&self, subnet_path: &str) -> Vec<Arc<SubnetPort>> {
        self.store.get_by_index(index::SUBNET_PATH, subnet_path)
    }

    /// Subnet path of the cached port `id`.
    pub fn subnet_path_for_port(&self, id: &str) -> Option<String> {
        self.store
            .get_by_key(id)
            .and_then(|port| port.subnet_path().map(str::to_string))
    }

    pub fn build_subnet_port_id(&self, name: &str, uid: &str) -> String {
        build_subnet_port_id(name, uid)
    }
}
