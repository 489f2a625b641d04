//! In-memory NSX used by the integration tests.
//!
//! `FakeNsx` implements every client trait the services depend on and
//! records each call so tests can assert on the remote traffic.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use nsx_operator::subnetport::{subnet_port_path, SubnetPort};
use nsx_operator::virtualserver::{Group, LbVirtualServer};
use nsx_operator::{GroupClient, NsxClients, PodLister, PodMeta, SubnetPortClient, VirtualServerClient};
use nsx_orch_common::{
    ClientError, ClientResult, ListPage, RealizedEntitiesClient, ResourceLister,
};
use nsx_types::{path, Alarm, RealizedResource, RealizedResourceList, RealizedState};
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    virtual_servers: HashMap<String, LbVirtualServer>,
    ports: HashMap<String, SubnetPort>,
    group: Option<Group>,
    realization: HashMap<String, RealizedResourceList>,
    failing_deletes: HashSet<String>,
    fail_group_patch: bool,
    pods: Vec<PodMeta>,
    fail_pod_list: bool,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeNsx {
    state: Mutex<State>,
}

impl FakeNsx {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clients(self: &Arc<Self>) -> NsxClients {
        NsxClients {
            realized_entities: self.clone(),
            virtual_servers: self.clone(),
            groups: self.clone(),
            subnet_ports: self.clone(),
            pods: self.clone(),
        }
    }

    pub fn with_group(&self, group: Group) {
        self.state.lock().group = Some(group);
    }

    pub fn group(&self) -> Option<Group> {
        self.state.lock().group.clone()
    }

    pub fn seed_virtual_server(&self, vs: LbVirtualServer) {
        let id = vs.id.clone().unwrap();
        self.state.lock().virtual_servers.insert(id, vs);
    }

    pub fn seed_port(&self, port: SubnetPort) {
        let id = port.id.clone().unwrap();
        self.state.lock().ports.insert(id, port);
    }

    pub fn has_port(&self, id: &str) -> bool {
        self.state.lock().ports.contains_key(id)
    }

    pub fn has_virtual_server(&self, id: &str) -> bool {
        self.state.lock().virtual_servers.contains_key(id)
    }

    /// Makes `path` report ERROR with `message` on every poll.
    pub fn fail_realization(&self, path: &str, message: &str) {
        let entity = RealizedResource::new("RealizedLogicalPort", RealizedState::Error)
            .with_alarm(Alarm::with_message(message));
        self.state
            .lock()
            .realization
            .insert(path.to_string(), RealizedResourceList::new(vec![entity]));
    }

    pub fn fail_delete(&self, id: &str) {
        self.state.lock().failing_deletes.insert(id.to_string());
    }

    pub fn fail_group_patch(&self, fail: bool) {
        self.state.lock().fail_group_patch = fail;
    }

    pub fn set_pods(&self, pods: Vec<PodMeta>) {
        self.state.lock().pods = pods;
    }

    pub fn fail_pod_list(&self) {
        self.state.lock().fail_pod_list = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl RealizedEntitiesClient for FakeNsx {
    async fn list(&self, intent_path: &str) -> ClientResult<RealizedResourceList> {
        self.record(format!("realized:{intent_path}"));
        let state = self.state.lock();
        Ok(state
            .realization
            .get(intent_path)
            .cloned()
            .unwrap_or_else(|| {
                RealizedResourceList::new(vec![RealizedResource::new(
                    "RealizedLogicalPort",
                    RealizedState::Realized,
                )])
            }))
    }
}

#[async_trait]
impl ResourceLister<LbVirtualServer> for FakeNsx {
    async fn list_page(&self, _cursor: Option<String>) -> ClientResult<ListPage<LbVirtualServer>> {
        let state = self.state.lock();
        Ok(ListPage::last(state.virtual_servers.values().cloned().collect()))
    }
}

#[async_trait]
impl VirtualServerClient for FakeNsx {
    async fn patch(&self, id: &str, vs: &LbVirtualServer) -> ClientResult<()> {
        self.record(format!("vs.patch:{id}"));
        let mut stored = vs.clone();
        stored.path = Some(path::virtual_server_path(id));
        self.state
            .lock()
            .virtual_servers
            .insert(id.to_string(), stored);
        Ok(())
    }

    async fn get(&self, id: &str) -> ClientResult<LbVirtualServer> {
        self.record(format!("vs.get:{id}"));
        self.state
            .lock()
            .virtual_servers
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("LBVirtualServer", id))
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        self.record(format!("vs.delete:{id}"));
        let mut state = self.state.lock();
        if state.failing_deletes.contains(id) {
            return Err(ClientError::api(500, format!("cannot delete {id}")));
        }
        state
            .virtual_servers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found("LBVirtualServer", id))
    }
}

#[async_trait]
impl GroupClient for FakeNsx {
    async fn get(&self, domain_id: &str, group_id: &str) -> ClientResult<Group> {
        self.record(format!("group.get:{domain_id}/{group_id}"));
        self.state
            .lock()
            .group
            .clone()
            .ok_or_else(|| ClientError::not_found("Group", group_id))
    }

    async fn patch(&self, domain_id: &str, group_id: &str, group: &Group) -> ClientResult<()> {
        self.record(format!("group.patch:{domain_id}/{group_id}"));
        let mut state = self.state.lock();
        if state.fail_group_patch {
            return Err(ClientError::transport("connection reset"));
        }
        state.group = Some(group.clone());
        Ok(())
    }
}

#[async_trait]
impl ResourceLister<SubnetPort> for FakeNsx {
    async fn list_page(&self, _cursor: Option<String>) -> ClientResult<ListPage<SubnetPort>> {
        let state = self.state.lock();
        Ok(ListPage::last(state.ports.values().cloned().collect()))
    }
}

#[async_trait]
impl SubnetPortClient for FakeNsx {
    async fn patch(&self, subnet_path: &str, id: &str, port: &SubnetPort) -> ClientResult<()> {
        self.record(format!("port.patch:{id}"));
        let mut stored = port.clone();
        stored.path = Some(subnet_port_path(subnet_path, id));
        self.state.lock().ports.insert(id.to_string(), stored);
        Ok(())
    }

    async fn get(&self, _subnet_path: &str, id: &str) -> ClientResult<SubnetPort> {
        self.record(format!("port.get:{id}"));
        self.state
            .lock()
            .ports
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("VpcSubnetPort", id))
    }

    async fn delete(&self, _subnet_path: &str, id: &str) -> ClientResult<()> {
        self.record(format!("port.delete:{id}"));
        let mut state = self.state.lock();
        if state.failing_deletes.contains(id) {
            return Err(ClientError::api(500, format!("cannot delete {id}")));
        }
        state.ports.remove(id);
        Ok(())
    }
}

#[async_trait]
impl PodLister for FakeNsx {
    async fn list_pods(&self) -> ClientResult<Vec<PodMeta>> {
        self.record("pods.list".to_string());
        let state = self.state.lock();
        if state.fail_pod_list {
            return Err(ClientError::transport("apiserver unavailable"));
        }
        Ok(state.pods.clone())
    }
}
