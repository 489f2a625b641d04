//! Load-balancer virtual servers and the shared VIP group.
//!
//! # Architecture
//!
//! ```text
//! reconciler
//!      │
//!      ▼
//! VirtualServerService ───> VirtualServerClient (patch / get / delete)
//!      │
//!      ├──> RealizeStateService (realized-entities polling)
//!      ├──> VirtualServerStore (by service, service+port, type, LB service)
//!      └──> GroupClient (VIP group "LbVirtualServerIpSet")
//! ```

mod service;
mod store;
mod tags;
mod types;

pub use service::VirtualServerService;
pub use store::{index, new_store, service_port_key, VirtualServerStore};
pub use tags::{
    build_l4_tags, ANNOTATION_CRD_LB, CREATED_FOR_CRD_SLB, CREATED_FOR_SLB, TAG_VALUE_VERSION,
};
pub use types::{
    Group, GroupExpression, LbVirtualServer, ServiceRef, VipSet, LBVS_TYPE_LAYER4,
    LBVS_TYPE_LAYER7,
};
