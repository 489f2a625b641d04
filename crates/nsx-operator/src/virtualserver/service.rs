//! Virtual server service.
//!
//! # Mutation flow
//!
//! ```text
//! create_or_update(vs)
//!      │
//!      ├──> VirtualServerClient::patch
//!      ├──> RealizeStateService (LB virtual server policy)
//!      ├──> VirtualServerClient::get
//!      ├──> VirtualServerStore::apply
//!      └──> VIP group sync (only if the VIP set changed)
//! ```
//!
//! The VIP group is a read-modify-write of one shared NSX group. Writers in
//! this process are serialized by `vip_sync`; nothing coordinates writers in
//! other processes, so a single operator instance is assumed.

use std::sync::Arc;

use nsx_orch_common::{Backoff, NsxError, NsxResult, RealizeStateService};
use nsx_types::path;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditCategory, AuditRecord};
use crate::audit_log;
use crate::client::{GroupClient, VirtualServerClient};
use crate::config::VipGroupConfig;

use super::store::{index, service_port_key, VirtualServerStore};
use super::tags::build_l4_tags;
use super::types::{LbVirtualServer, ServiceRef, VipSet, LBVS_TYPE_LAYER4};

const SOURCE: &str = "VirtualServerService";

/// Creates, deletes and looks up NSX load-balancer virtual servers.
pub struct VirtualServerService {
    cluster: String,
    client: Arc<dyn VirtualServerClient>,
    group_client: Arc<dyn GroupClient>,
    realizer: RealizeStateService,
    backoff: Backoff,
    vip_group: VipGroupConfig,
    store: Arc<VirtualServerStore>,
    /// VIPs last written to the VIP group.
    vip_sync: Mutex<VipSet>,
}

impl VirtualServerService {
    pub fn new(
        cluster: impl Into<String>,
        client: Arc<dyn VirtualServerClient>,
        group_client: Arc<dyn GroupClient>,
        realizer: RealizeStateService,
        backoff: Backoff,
        vip_group: VipGroupConfig,
        store: Arc<VirtualServerStore>,
    ) -> Self {
        let synced = vip_set_of(&store);
        Self {
            cluster: cluster.into(),
            client,
            group_client,
            realizer,
            backoff,
            vip_group,
            store,
            vip_sync: Mutex::new(synced),
        }
    }

    pub fn store(&self) -> &Arc<VirtualServerStore> {
        &self.store
    }

    /// Takes the current store contents as the VIP set already present in
    /// the group. Called once the store has been bulk-loaded.
    pub async fn reset_vip_baseline(&self) {
        *self.vip_sync.lock().await = self.vip_set();
    }

    /// Submits `vs`, waits for realization and caches the confirmed object.
    ///
    /// Nothing is cached when realization fails.
    #[instrument(skip(self, vs), fields(id = vs.id.as_deref().unwrap_or("")))]
    pub async fn create_or_update(&self, vs: &LbVirtualServer) -> NsxResult<LbVirtualServer> {
        let id = vs
            .id
            .as_deref()
            .ok_or_else(|| NsxError::missing_id(LbVirtualServer::RESOURCE_TYPE))?;
        let category = if self.store.get_by_key(id).is_some() {
            AuditCategory::ResourceModify
        } else {
            AuditCategory::ResourceCreate
        };

        let result = self.realize(id, vs).await;
        audit_log!(AuditRecord::new(category, SOURCE, "create_or_update")
            .with_result(&result)
            .with_object_id(id)
            .with_object_type(LbVirtualServer::RESOURCE_TYPE)
            .with_details(serde_json::json!({
                "ip_address": vs.ip_address,
                "ports": vs.ports,
            })));
        let confirmed = result?;

        self.store.apply(confirmed.clone())?;
        info!(ip = confirmed.ip_address.as_deref().unwrap_or(""), "virtual server realized");

        self.sync_vip_group().await?;
        Ok(confirmed)
    }

    async fn realize(&self, id: &str, vs: &LbVirtualServer) -> NsxResult<LbVirtualServer> {
        self.client.patch(id, vs).await?;
        self.realizer
            .check_realize_state(&self.backoff, &path::virtual_server_path(id), &[])
            .await?;
        Ok(self.client.get(id).await?)
    }

    /// Deletes a virtual server on NSX and drops it from the store.
    ///
    /// An object NSX no longer knows about counts as deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> NsxResult<()> {
        let result = match self.client.delete(id).await {
            Err(e) if e.is_not_found() => {
                debug!("virtual server already absent on NSX");
                Ok(())
            }
            other => other,
        };
        audit_log!(AuditRecord::new(AuditCategory::ResourceDelete, SOURCE, "delete")
            .with_result(&result)
            .with_object_id(id)
            .with_object_type(LbVirtualServer::RESOURCE_TYPE));
        result?;

        self.store.delete_by_key(id);
        self.sync_vip_group().await
    }

    /// Deletes every virtual server of `service_uid` that listens on `port`.
    ///
    /// Continues past failures; all error messages are returned together.
    pub async fn delete_for_port(&self, service_uid: &str, port: &str) -> NsxResult<()> {
        let mut errors = Vec::new();
        for vs in self.list_by_service_and_port(service_uid, port) {
            let Some(id) = vs.id.as_deref() else {
                continue;
            };
            if let Err(e) = self.delete(id).await {
                warn!(id, error = %e, "failed to delete virtual server for port");
                errors.push(e.to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(NsxError::Multiple(errors))
        }
    }

    /// Returns the VIPs of every cached virtual server.
    pub fn vip_set(&self) -> VipSet {
        vip_set_of(&self.store)
    }

    /// Brings the VIP group in line with the store, if the VIP set changed
    /// since the last successful write.
    pub async fn sync_vip_group(&self) -> NsxResult<()> {
        if !self.vip_group.enabled {
            return Ok(());
        }
        let mut synced = self.vip_sync.lock().await;
        let new = self.vip_set();
        if *synced == new {
            return Ok(());
        }

        let VipGroupConfig {
            domain_id,
            group_id,
            ..
        } = &self.vip_group;
        let mut group = self.group_client.get(domain_id, group_id).await?;
        let before = group.ip_addresses();
        let updated = group.update_ip_expression(&synced, &new);
        if let Err(e) = self.group_client.patch(domain_id, group_id, &group).await {
            warn!(group = %group_id, error = %e, "failed to update VIPs");
            return Err(e.into());
        }

        info!(group = %group_id, ?before, ?updated, "updated VIP group");
        *synced = new;
        Ok(())
    }

    pub fn get_by_key(&self, id: &str) -> Option<Arc<LbVirtualServer>> {
        self.store.get_by_key(id)
    }

    pub fn list_layer4(&self) -> Vec<Arc<LbVirtualServer>> {
        self.list_by_type(LBVS_TYPE_LAYER4)
    }

    pub fn list_by_type(&self, lbvs_type: &str) -> Vec<Arc<LbVirtualServer>> {
        self.store.get_by_index(index::LBVS_TYPE, lbvs_type)
    }

    pub fn list_by_service(&self, service_uid: &str) -> Vec<Arc<LbVirtualServer>> {
        self.store.get_by_index(index::SERVICE_UID, service_uid)
    }

    pub fn list_by_service_and_port(
        &self,
        service_uid: &str,
        port: &str,
    ) -> Vec<Arc<LbVirtualServer>> {
        self.store
            .get_by_index(index::SERVICE_AND_PORT, &service_port_key(service_uid, port))
    }

    pub fn list_keys_by_service(&self, service_uid: &str) -> Vec<String> {
        self.store.get_keys_by_index(index::SERVICE_UID, service_uid)
    }

    pub fn list_by_lb_service(&self, lbs_id: &str) -> Vec<Arc<LbVirtualServer>> {
        self.store.get_by_index(index::LB_SERVICE_ID, lbs_id)
    }

    /// Service UID tag of `vs`.
    pub fn service_key_of<'a>(&self, vs: &'a LbVirtualServer) -> Option<&'a str> {
        vs.service_uid()
    }

    pub fn build_l4_tags(&self, service: &ServiceRef, ext_pool_id: Option<&str>) -> Vec<nsx_types::Tag> {
        build_l4_tags(&self.cluster, service, ext_pool_id)
    }
}

fn vip_set_of(store: &VirtualServerStore) -> VipSet {
    store
        .list()
        .iter()
        .filter_map(|vs| vs.ip_address.clone())
        .filter(|ip| !ip.is_empty())
        .collect()
}
