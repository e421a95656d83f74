use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Name SQL Server gives the unnamed (default) instance
pub const DEFAULT_INSTANCE: &str = "MSSQLSERVER";

/// Separator between host (or cluster) and instance name, and inside Windows paths
pub const NAME_SEPARATOR: char = '\\';

/// One discovered SQL Server instance on one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub computer_name: String,
    pub instance_name: String,
    pub full_name: String,
    pub edition: Option<String>,
    pub version: Option<String>,
    pub caption: String,
    pub is_cluster: bool,
    pub cluster_name: Option<String>,
    /// Cluster nodes other than the queried host
    pub cluster_nodes: BTreeSet<String>,
    pub is_cluster_node: bool,
}

impl InstanceRecord {
    pub fn is_default_instance(&self) -> bool {
        is_default_instance(&self.instance_name)
    }
}

pub fn is_default_instance(instance_name: &str) -> bool {
    instance_name.eq_ignore_ascii_case(DEFAULT_INSTANCE)
}

/// `HOST` for the default instance, `HOST\NAME` otherwise
pub fn full_name(computer_name: &str, instance_name: &str) -> String {
    if is_default_instance(instance_name) {
        computer_name.to_string()
    } else {
        format!("{}{}{}", computer_name, NAME_SEPARATOR, instance_name)
    }
}

/// Short machine name of a host as cluster nodes report it: local aliases
/// become `local_host`, a DNS name loses its domain, IP addresses stay as given
pub fn short_host_name(host: &str, local_host: &str) -> String {
    let host = if host == "." || host.eq_ignore_ascii_case("localhost") {
        local_host
    } else {
        host
    };
    if host.parse::<IpAddr>().is_ok() {
        return host.to_string();
    }
    host.split('.').next().unwrap_or(host).to_string()
}

/// Cluster membership read from an instance's `Cluster` subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_name: Option<String>,
    pub nodes: Vec<String>,
}

/// An instance paired with the error-log directory it reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInstance {
    pub instance: InstanceRecord,
    pub log_path: Option<String>,
    pub has_valid_log_path: bool,
}

impl ResolvedInstance {
    pub fn new(instance: InstanceRecord, log_path: Option<String>) -> Self {
        let has_valid_log_path = log_path.as_deref().map(is_valid_log_path).unwrap_or(false);
        Self {
            instance,
            log_path,
            has_valid_log_path,
        }
    }

    pub fn name(&self) -> &str {
        &self.instance.instance_name
    }
}

/// A usable log directory is non-empty and contains a path separator.
///
/// Anything else means the server was unreachable or the instance is not
/// active on this node (passive cluster member).
pub fn is_valid_log_path(path: &str) -> bool {
    !path.is_empty() && path.contains(NAME_SEPARATOR)
}

/// One `[monitor://...]` stanza of inputs.conf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEntry {
    pub path: String,
    pub source_label: String,
    pub host_override: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_default_instance() {
        assert_eq!(full_name("SQLHOST01", "MSSQLSERVER"), "SQLHOST01");
        assert_eq!(full_name("SQLHOST01", "mssqlserver"), "SQLHOST01");
    }

    #[test]
    fn test_full_name_named_instance() {
        assert_eq!(full_name("SQLHOST01", "INST2"), "SQLHOST01\\INST2");
    }

    #[test]
    fn test_short_host_name() {
        assert_eq!(short_host_name("SQLNODE1", "LOCALBOX"), "SQLNODE1");
        assert_eq!(short_host_name("sqlnode1.corp.example.com", "LOCALBOX"), "sqlnode1");
        assert_eq!(short_host_name(".", "LOCALBOX"), "LOCALBOX");
        assert_eq!(short_host_name("LocalHost", "LOCALBOX"), "LOCALBOX");
        assert_eq!(short_host_name("10.1.2.3", "LOCALBOX"), "10.1.2.3");
    }

    #[test]
    fn test_is_valid_log_path() {
        assert!(is_valid_log_path("D:\\Log1"));
        assert!(is_valid_log_path("C:\\Program Files\\Microsoft SQL Server\\MSSQL\\Log"));
        assert!(!is_valid_log_path(""));
        assert!(!is_valid_log_path("Log"));
        assert!(!is_valid_log_path("/var/opt/mssql/log"));
    }

    #[test]
    fn test_resolved_instance_validity() {
        let record = InstanceRecord {
            computer_name: "SQLHOST01".to_string(),
            instance_name: "MSSQLSERVER".to_string(),
            full_name: "SQLHOST01".to_string(),
            edition: None,
            version: None,
            caption: "Unknown".to_string(),
            is_cluster: false,
            cluster_name: None,
            cluster_nodes: BTreeSet::new(),
            is_cluster_node: false,
        };

        assert!(ResolvedInstance::new(record.clone(), Some("D:\\Log".to_string())).has_valid_log_path);
        assert!(!ResolvedInstance::new(record.clone(), Some(String::new())).has_valid_log_path);
        assert!(!ResolvedInstance::new(record, None).has_valid_log_path);
    }
}
