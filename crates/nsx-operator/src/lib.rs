//! NSX operator resource services.
//!
//! Reconcilers call into the services in this crate to turn Kubernetes
//! objects into NSX resources:
//!
//! - [`VirtualServerService`]: load-balancer virtual servers of Services,
//!   plus the shared VIP group
//! - [`SubnetPortService`]: VPC subnet ports of Pods
//! - [`PodPortGarbageCollector`]: removes subnet ports of deleted Pods
//!
//! [`NsxServices::start`] wires them to the remote clients and bulk-loads
//! their stores. The Kubernetes watch machinery and the NSX REST transport
//! live outside this crate.

pub mod audit;
pub mod client;
pub mod config;
pub mod logging;
pub mod pod;
pub mod services;
pub mod subnetport;
pub mod virtualserver;

pub use client::{GroupClient, NsxClients, PodLister, PodMeta, SubnetPortClient, VirtualServerClient};
pub use config::{ConfigError, NsxOperatorConfig, VipGroupConfig};
pub use pod::{GcStatsSnapshot, PodPortGarbageCollector};
pub use services::NsxServices;
pub use subnetport::SubnetPortService;
pub use virtualserver::VirtualServerService;
