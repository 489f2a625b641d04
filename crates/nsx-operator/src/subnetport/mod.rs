//! VPC subnet ports backing Pod network interfaces.

mod service;
mod store;
mod types;

pub use service::SubnetPortService;
pub use store::{index, new_store, SubnetPortStore};
pub use types::{build_subnet_port_id, pod_key, subnet_port_path, SubnetPort};
