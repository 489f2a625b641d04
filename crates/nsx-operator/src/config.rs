//! Operator configuration.
//!
//! Loaded from YAML. Every section except `cluster` has defaults, so a
//! minimal file is:
//!
//! ```yaml
//! cluster: k8scl-one
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use nsx_orch_common::RetryPolicies;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration load or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Shared NSX group that mirrors the VIPs of all virtual servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipGroupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_domain_id")]
    pub domain_id: String,
    #[serde(default = "default_vip_group_id")]
    pub group_id: String,
}

/// Complete operator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NsxOperatorConfig {
    /// Cluster name written into every tag.
    pub cluster: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between garbage-collection rounds.
    #[serde(default = "default_gc_interval")]
    pub gc_interval_secs: u64,

    /// Parallel reconcile workers per resource kind.
    #[serde(default = "default_reconcile_workers")]
    pub reconcile_workers: usize,

    #[serde(default)]
    pub vip_group: VipGroupConfig,

    #[serde(default)]
    pub retry: RetryPolicies,
}

fn default_true() -> bool {
    true
}

fn default_domain_id() -> String {
    "default".to_string()
}

fn default_vip_group_id() -> String {
    "LbVirtualServerIpSet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gc_interval() -> u64 {
    600
}

fn default_reconcile_workers() -> usize {
    8
}

impl Default for VipGroupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            domain_id: default_domain_id(),
            group_id: default_vip_group_id(),
        }
    }
}

impl NsxOperatorConfig {
    /// Creates a configuration with defaults for the given cluster.
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            log_level: default_log_level(),
            gc_interval_secs: default_gc_interval(),
            reconcile_workers: default_reconcile_workers(),
            vip_group: VipGroupConfig::default(),
            retry: RetryPolicies::default(),
        }
    }

    /// Loads and validates a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parses and validates a YAML configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.trim().is_empty() {
            return Err(ConfigError::invalid("cluster", "must not be empty"));
        }
        if self.gc_interval_secs == 0 {
            return Err(ConfigError::invalid("gc_interval_secs", "must be > 0"));
        }
        if self.reconcile_workers == 0 {
            return Err(ConfigError::invalid("reconcile_workers", "must be > 0"));
        }
        if self.vip_group.enabled && self.vip_group.group_id.is_empty() {
            return Err(ConfigError::invalid("vip_group.group_id", "must not be empty"));
        }
        for (field, backoff) in [
            ("retry.subnet", &self.retry.subnet),
            ("retry.default", &self.retry.default),
            ("retry.lb_virtual_server", &self.retry.lb_virtual_server),
        ] {
            if backoff.steps == 0 {
                return Err(ConfigError::invalid(field, "steps must be > 0"));
            }
            let finite = backoff.factor.is_finite() && backoff.jitter.is_finite();
            if !finite || backoff.factor < 0.0 || backoff.jitter < 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    "factor and jitter must be finite and >= 0",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsx_orch_common::Backoff;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = NsxOperatorConfig::from_yaml_str("cluster: k8scl-one\n").unwrap();
        assert_eq!(config, NsxOperatorConfig::new("k8scl-one"));
        assert_eq!(config.gc_interval(), Duration::from_secs(600));
        assert_eq!(config.vip_group.group_id, "LbVirtualServerIpSet");
        assert_eq!(config.vip_group.domain_id, "default");
        assert_eq!(config.retry.lb_virtual_server, Backoff::LB_VIRTUAL_SERVER);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
cluster: k8scl-two
log_level: debug
gc_interval_secs: 60
reconcile_workers: 4
vip_group:
  enabled: false
retry:
  subnet:
    duration_ms: 200
    factor: 2.0
    jitter: 0.0
    steps: 3
"#;
        let config = NsxOperatorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.reconcile_workers, 4);
        assert!(!config.vip_group.enabled);
        assert_eq!(config.vip_group.group_id, "LbVirtualServerIpSet");
        assert_eq!(config.retry.subnet.steps, 3);
        assert_eq!(config.retry.subnet.duration, Duration::from_millis(200));
        assert_eq!(config.retry.default, Backoff::DEFAULT);
    }

    #[test]
    fn test_missing_cluster_is_parse_error() {
        let err = NsxOperatorConfig::from_yaml_str("log_level: info\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors() {
        let err = NsxOperatorConfig::from_yaml_str("cluster: ''\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "cluster", .. }));

        let err =
            NsxOperatorConfig::from_yaml_str("cluster: c\ngc_interval_secs: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gc_interval_secs", .. }));

        let mut config = NsxOperatorConfig::new("c");
        config.retry.lb_virtual_server.steps = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration for retry.lb_virtual_server: steps must be > 0"
        );
    }

    #[test]
    fn test_non_finite_backoff_rejected() {
        let yaml = r#"
cluster: c
retry:
  subnet:
    duration_ms: 1000
    factor: .inf
    jitter: 0.0
    steps: 3
"#;
        let err = NsxOperatorConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retry.subnet", .. }));

        let yaml = r#"
cluster: c
retry:
  default:
    duration_ms: 500
    factor: 1.0
    jitter: .nan
    steps: 3
"#;
        let err = NsxOperatorConfig::from_yaml_str(yaml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration for retry.default: factor and jitter must be finite and >= 0"
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cluster: from-file").unwrap();
        writeln!(file, "reconcile_workers: 2").unwrap();

        let config = NsxOperatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cluster, "from-file");
        assert_eq!(config.reconcile_workers, 2);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NsxOperatorConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
