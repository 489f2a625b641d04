//! Virtual server store indexes.
//!
//! Layer-4 and layer-7 virtual servers share one store; the
//! [`index::LBVS_TYPE`] index tells them apart.

use nsx_orch_common::{Indexed, ResourceStore};
use nsx_types::{scope, tag_values};

use super::types::LbVirtualServer;

pub mod index {
    use nsx_types::scope;

    /// Service UID tag value.
    pub const SERVICE_UID: &str = scope::SERVICE_UID;
    /// `"<service uid>|<port>"` for every port of the virtual server.
    pub const SERVICE_AND_PORT: &str = "nsx-op/LbVs-service-and-port";
    /// `lbvs_type` tag value.
    pub const LBVS_TYPE: &str = scope::LBVS_TYPE;
    /// Id of the parent LB service.
    pub const LB_SERVICE_ID: &str = "nsx-op/LbVs-lbs-id";

    pub const ALL: [&str; 4] = [SERVICE_UID, SERVICE_AND_PORT, LBVS_TYPE, LB_SERVICE_ID];
}

pub type VirtualServerStore = ResourceStore<LbVirtualServer>;

/// Creates an empty virtual server store with every index registered.
pub fn new_store() -> VirtualServerStore {
    ResourceStore::new(&index::ALL)
}

/// Composite key of the service-and-port index.
pub fn service_port_key(service_uid: &str, port: &str) -> String {
    format!("{}|{}", service_uid, port)
}

impl Indexed for LbVirtualServer {
    const KIND: &'static str = LbVirtualServer::RESOURCE_TYPE;

    fn primary_key(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn index_keys(&self, index: &str) -> Vec<String> {
        match index {
            index::SERVICE_UID => tag_values(&self.tags, scope::SERVICE_UID),
            index::SERVICE_AND_PORT => {
                let uids = tag_values(&self.tags, scope::SERVICE_UID);
                self.ports
                    .iter()
                    .flat_map(|port| uids.iter().map(move |uid| service_port_key(uid, port)))
                    .collect()
            }
            index::LBVS_TYPE => tag_values(&self.tags, scope::LBVS_TYPE),
            index::LB_SERVICE_ID => self.lb_service_id().map(str::to_string).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn is_tombstone(&self) -> bool {
        self.marked_for_delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtualserver::types::LBVS_TYPE_LAYER4;
    use nsx_types::Tag;
    use pretty_assertions::assert_eq;

    fn vs() -> LbVirtualServer {
        LbVirtualServer::new("vs-1")
            .with_ports(["80", "443"])
            .with_lb_service_path("/infra/lb-services/lbs-1")
            .with_tags(vec![
                Tag::new(scope::SERVICE_UID, "uid-1"),
                Tag::new(scope::LBVS_TYPE, LBVS_TYPE_LAYER4),
            ])
    }

    #[test]
    fn test_index_keys() {
        let vs = vs();
        assert_eq!(vs.index_keys(index::SERVICE_UID), vec!["uid-1"]);
        assert_eq!(
            vs.index_keys(index::SERVICE_AND_PORT),
            vec!["uid-1|80", "uid-1|443"]
        );
        assert_eq!(vs.index_keys(index::LBVS_TYPE), vec!["layer_4"]);
        assert_eq!(vs.index_keys(index::LB_SERVICE_ID), vec!["lbs-1"]);
        assert!(vs.index_keys("unknown").is_empty());
    }

    #[test]
    fn test_untagged_virtual_server_has_no_index_keys() {
        let vs = LbVirtualServer::new("vs-2").with_ports(["80"]);
        for name in index::ALL {
            assert!(vs.index_keys(name).is_empty(), "index {name}");
        }
    }

    #[test]
    fn test_port_change_moves_service_port_membership() {
        let store = new_store();
        store.apply(vs()).unwrap();
        store.apply(vs().with_ports(["8080"])).unwrap();

        assert!(store.get_by_index(index::SERVICE_AND_PORT, "uid-1|80").is_empty());
        assert_eq!(
            store.get_keys_by_index(index::SERVICE_AND_PORT, "uid-1|8080"),
            vec!["vs-1"]
        );
    }

    #[test]
    fn test_marked_for_delete_removes_record() {
        let store = new_store();
        store.apply(vs()).unwrap();

        let mut deleted = vs();
        deleted.marked_for_delete = true;
        store.apply(deleted).unwrap();

        assert!(store.is_empty());
        assert!(store.get_by_index(index::LB_SERVICE_ID, "lbs-1").is_empty());
    }
}
