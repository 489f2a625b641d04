//! NSX policy path helpers.
//!
//! Policy paths look like `/orgs/default/projects/p1/vpcs/vpc1/subnets/s1`
//! or `/infra/lb-services/lbs-1`.

use crate::PathError;

/// Policy path prefix of load-balancer virtual servers.
pub const LB_VIRTUAL_SERVERS_PATH: &str = "/infra/lb-virtual-servers";

/// Returns the intent path of a virtual server with the given id.
pub fn virtual_server_path(id: &str) -> String {
    format!("{}/{}", LB_VIRTUAL_SERVERS_PATH, id)
}

/// Returns the last non-empty segment of a policy path.
///
/// `"/infra/lb-services/lbs-1"` yields `"lbs-1"`; a trailing slash is ignored.
pub fn last_segment(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Splits a project path `/orgs/<org>/projects/<project>` into its ids.
pub fn project_path_to_ids(path: &str) -> Result<(String, String), PathError> {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["", "orgs", org, "projects", project]
            if !org.is_empty() && !project.is_empty() =>
        {
            Ok((org.to_string(), project.to_string()))
        }
        _ => Err(PathError::InvalidProjectPath(path.to_string())),
    }
}

/// Returns the parent of a policy path (everything before the last two
/// segments, i.e. `<parent>/<collection>/<id>` -> `<parent>`).
pub fn parent_path(path: &str) -> Result<&str, PathError> {
    let trimmed = path.trim_end_matches('/');
    let mut cut = trimmed.rsplitn(3, '/');
    let id = cut.next().filter(|s| !s.is_empty());
    let collection = cut.next().filter(|s| !s.is_empty());
    match (id, collection, cut.next()) {
        (Some(_), Some(_), Some(parent)) if parent.starts_with('/') => Ok(parent),
        _ => Err(PathError::InvalidPath(path.to_string())),
    }
}
