//! Tags written on layer-4 virtual servers.

use nsx_types::{scope, Tag};

use super::types::{ServiceRef, LBVS_TYPE_LAYER4};

/// Operator version recorded in the version tag.
pub const TAG_VALUE_VERSION: &str = "1.0.0";
/// `created_for` value of virtual servers backing a Service of type LoadBalancer.
pub const CREATED_FOR_SLB: &str = "SLB";
/// `created_for` value when the Service is managed through the LB CRD.
pub const CREATED_FOR_CRD_SLB: &str = "CRD_SLB";
/// Service annotation marking a Service as managed through the LB CRD.
pub const ANNOTATION_CRD_LB: &str = "nsx.vmware.com/load-balancer-crd";

/// Builds the tags of a layer-4 virtual server for `service`.
pub fn build_l4_tags(cluster: &str, service: &ServiceRef, ext_pool_id: Option<&str>) -> Vec<Tag> {
    let created_for = if service.annotations.contains_key(ANNOTATION_CRD_LB) {
        CREATED_FOR_CRD_SLB
    } else {
        CREATED_FOR_SLB
    };

    let mut tags = vec![
        Tag::new(scope::CLUSTER, cluster),
        Tag::new(scope::VERSION, TAG_VALUE_VERSION),
        Tag::new(scope::NAMESPACE, &service.namespace),
        Tag::new(scope::SERVICE_NAME, &service.name),
        Tag::new(scope::SERVICE_UID, &service.uid),
        Tag::new(scope::LBVS_TYPE, LBVS_TYPE_LAYER4),
        Tag::new(scope::CREATED_FOR, created_for),
    ];
    if let Some(pool) = ext_pool_id.filter(|p| !p.is_empty()) {
        tags.push(Tag::new(scope::IP_POOL_ID, pool));
    }
    tags
}
