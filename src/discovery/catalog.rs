use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::registry::{join_path, RegValue, RegistryError, RegistryKey, RegistryStore};
use super::types::{full_name, short_host_name, ClusterInfo, InstanceRecord};
use super::version::{caption_for, extract_executable, service_name, to_admin_share, BinaryVersionReader};
use crate::config::local_host;

pub const SQL_SERVER_KEY: &str = "SOFTWARE\\Microsoft\\Microsoft SQL Server";
pub const SQL_SERVER_WOW64_KEY: &str = "SOFTWARE\\Wow6432Node\\Microsoft\\Microsoft SQL Server";
pub const CLUSTER_NODES_KEY: &str = "Cluster\\Nodes";
pub const SERVICES_KEY: &str = "SYSTEM\\CurrentControlSet\\Services";

/// Host-level discovery failures. The host is skipped; discovery continues.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("No SQL Server registry key on {host}")]
    NotInstalled { host: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// How a host's registry lists its instances
#[derive(Debug, Clone, PartialEq, Eq)]
enum InstanceListing {
    /// `Instance Names\SQL`: value name is the instance, data its internal id
    InstanceNames(RegistryKey),
    /// `InstalledInstances` multi-string on the base key; never clustered
    InstalledInstances(Vec<String>),
    None,
}

/// Enumerates installed SQL Server instances from each host's registry
pub struct InstanceCatalog {
    registry: Arc<dyn RegistryStore>,
    versions: Arc<dyn BinaryVersionReader>,
    local_host: String,
}

impl InstanceCatalog {
    pub fn new(registry: Arc<dyn RegistryStore>, versions: Arc<dyn BinaryVersionReader>) -> Self {
        Self {
            registry,
            versions,
            local_host: local_host(),
        }
    }

    /// Name `.` and `localhost` stand for when matching cluster nodes
    pub fn with_local_host(mut self, local_host: impl Into<String>) -> Self {
        self.local_host = local_host.into();
        self
    }

    /// Discover instances on every host, in host order. A host that cannot be
    /// read is reported and skipped.
    pub async fn discover(&self, hosts: &[String]) -> Vec<InstanceRecord> {
        let mut records = Vec::new();
        let mut visited: Vec<&str> = Vec::with_capacity(hosts.len());

        for host in hosts {
            if visited.iter().any(|v| v.eq_ignore_ascii_case(host)) {
                debug!("Host {} listed more than once, skipping repeat", host);
                continue;
            }
            visited.push(host);

            match self.discover_host(host).await {
                Ok(found) => {
                    info!("Found {} SQL Server instance(s) on {}", found.len(), host);
                    records.extend(found);
                }
                Err(e) => {
                    warn!("Skipping host {}: {}", host, e);
                }
            }
        }

        records
    }

    /// Discover the instances of a single host
    pub async fn discover_host(&self, host: &str) -> Result<Vec<InstanceRecord>, CatalogError> {
        let (base_path, base) = self.open_base_key(host).await?;
        debug!("Using SQL Server registry root {} on {}", base_path, host);

        let listing = self.list_instances(host, &base_path, &base).await?;
        let (names, cluster_capable): (Vec<(String, String)>, bool) = match &listing {
            InstanceListing::InstanceNames(names_key) => (
                names_key
                    .values
                    .iter()
                    .filter_map(|(name, value)| match value {
                        RegValue::String(id) if !id.is_empty() => Some((name.clone(), id.clone())),
                        _ => None,
                    })
                    .collect(),
                true,
            ),
            InstanceListing::InstalledInstances(names) => {
                (names.iter().map(|n| (n.clone(), n.clone())).collect(), false)
            }
            InstanceListing::None => {
                debug!("No instance list under {} on {}", base_path, host);
                (Vec::new(), false)
            }
        };

        let mut records = Vec::with_capacity(names.len());
        for (instance_name, instance_id) in names {
            let record = self
                .read_instance(host, &base_path, &instance_name, &instance_id, cluster_capable)
                .await;
            debug!(
                "Discovered {} ({}, clustered: {})",
                record.full_name, record.caption, record.is_cluster
            );
            records.push(record);
        }

        Ok(records)
    }

    /// Primary root first, then the 32-bit compatibility root. The compatibility
    /// root is tried after any failure on the primary; the first error other
    /// than a missing key is reported if neither opens.
    async fn open_base_key(&self, host: &str) -> Result<(String, RegistryKey), CatalogError> {
        let mut failure: Option<RegistryError> = None;

        for path in [SQL_SERVER_KEY, SQL_SERVER_WOW64_KEY] {
            match self.registry.open_key(host, path).await {
                Ok(key) => return Ok((path.to_string(), key)),
                Err(RegistryError::NotFound { .. }) => continue,
                Err(e) => {
                    debug!("Cannot open {} on {}: {}", path, host, e);
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Err(CatalogError::NotInstalled {
                host: host.to_string(),
            }),
        }
    }

    async fn list_instances(
        &self,
        host: &str,
        base_path: &str,
        base: &RegistryKey,
    ) -> Result<InstanceListing, CatalogError> {
        if base.has_subkey("Instance Names") {
            let names_path = join_path(&join_path(base_path, "Instance Names"), "SQL");
            return match self.registry.open_key(host, &names_path).await {
                Ok(key) => Ok(InstanceListing::InstanceNames(key)),
                // Reporting Services / Analysis Services only installs
                Err(RegistryError::NotFound { .. }) => Ok(InstanceListing::None),
                Err(e) => Err(e.into()),
            };
        }

        match base.value("InstalledInstances") {
            Some(RegValue::MultiString(names)) => Ok(InstanceListing::InstalledInstances(names.clone())),
            Some(RegValue::String(name)) if !name.is_empty() => {
                Ok(InstanceListing::InstalledInstances(vec![name.clone()]))
            }
            _ => Ok(InstanceListing::None),
        }
    }

    async fn read_instance(
        &self,
        host: &str,
        base_path: &str,
        instance_name: &str,
        instance_id: &str,
        cluster_capable: bool,
    ) -> InstanceRecord {
        let instance_path = join_path(base_path, instance_id);
        let instance_key = match self.registry.open_key(host, &instance_path).await {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Cannot read registry of instance {} on {}: {}", instance_name, host, e);
                None
            }
        };

        let cluster = match &instance_key {
            Some(key) if cluster_capable && key.has_subkey("Cluster") => {
                Some(self.read_cluster(host, &instance_path).await)
            }
            _ => None,
        };

        let setup = self.open_optional(host, &join_path(&instance_path, "Setup")).await;
        let edition = setup.as_ref().and_then(|k| k.string("Edition")).map(String::from);

        let version = match self.version_from_binary(host, instance_name).await {
            Some(v) => Some(v),
            None => setup.as_ref().and_then(|k| k.string("Version")).map(String::from),
        };

        let (is_cluster, cluster_name, nodes) = match cluster {
            Some(info) => (true, info.cluster_name, info.nodes),
            None => (false, None, Vec::new()),
        };

        let node_name = short_host_name(host, &self.local_host);
        let is_this_host = |n: &String| short_host_name(n, &self.local_host).eq_ignore_ascii_case(&node_name);
        let is_cluster_node = nodes.iter().any(is_this_host);
        let cluster_nodes: BTreeSet<String> = nodes.into_iter().filter(|n| !is_this_host(n)).collect();

        InstanceRecord {
            computer_name: host.to_string(),
            instance_name: instance_name.to_string(),
            full_name: full_name(host, instance_name),
            caption: caption_for(version.as_deref()),
            edition,
            version,
            is_cluster,
            cluster_name,
            cluster_nodes,
            is_cluster_node,
        }
    }

    /// Cluster name and member nodes. Each node is read independently; an
    /// unreadable node is left out.
    async fn read_cluster(&self, host: &str, instance_path: &str) -> ClusterInfo {
        let mut info = ClusterInfo::default();

        if let Some(key) = self.open_optional(host, &join_path(instance_path, "Cluster")).await {
            info.cluster_name = key.string("ClusterName").map(String::from);
        }

        let nodes_key = match self.registry.open_key(host, CLUSTER_NODES_KEY).await {
            Ok(key) => key,
            Err(e) => {
                debug!("Cannot enumerate cluster nodes on {}: {}", host, e);
                return info;
            }
        };

        for node_id in &nodes_key.subkeys {
            let node_path = join_path(CLUSTER_NODES_KEY, node_id);
            match self.registry.open_key(host, &node_path).await {
                Ok(node) => match node.string("NodeName") {
                    Some(name) => info.nodes.push(name.to_string()),
                    None => debug!("Cluster node {} on {} has no NodeName", node_id, host),
                },
                Err(e) => debug!("Cannot read cluster node {} on {}: {}", node_id, host, e),
            }
        }

        info
    }

    /// Version embedded in the running service's sqlservr.exe, read over the
    /// administrative share. `None` on any failure.
    async fn version_from_binary(&self, host: &str, instance_name: &str) -> Option<String> {
        let service_path = join_path(SERVICES_KEY, &service_name(instance_name));
        let service = self.open_optional(host, &service_path).await?;

        let image_path = service.value("ImagePath").and_then(|v| match v {
            RegValue::String(s) | RegValue::Other(s) => Some(s.as_str()),
            _ => None,
        })?;
        let executable = extract_executable(image_path)?;
        let share_path = to_admin_share(host, &executable);

        match self.versions.product_version(&share_path).await {
            Ok(version) => Some(version),
            Err(e) => {
                debug!("Version lookup via {} failed, using setup version: {}", share_path, e);
                None
            }
        }
    }

    async fn open_optional(&self, host: &str, path: &str) -> Option<RegistryKey> {
        match self.registry.open_key(host, path).await {
            Ok(key) => Some(key),
            Err(e) => {
                debug!("Optional registry key {} unavailable: {}", path, e);
                None
            }
        }
    }
}
