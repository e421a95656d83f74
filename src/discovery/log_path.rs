use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{InstanceRecord, ResolvedInstance, NAME_SEPARATOR};
use crate::system::{run_command, CommandError};

/// Reports the error-log directory of the server reachable at a connection string
#[async_trait]
pub trait ErrorLogSource: Send + Sync {
    async fn error_log_directory(&self, connection: &str) -> Result<Option<String>, CommandError>;
}

const ERROR_LOG_QUERY: &str =
    "SET NOCOUNT ON; SELECT CAST(SERVERPROPERTY('ErrorLogFileName') AS nvarchar(4000))";

/// Asks the server itself through `sqlcmd` with Windows authentication
pub struct SqlcmdErrorLogSource {
    timeout: Duration,
}

impl SqlcmdErrorLogSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ErrorLogSource for SqlcmdErrorLogSource {
    async fn error_log_directory(&self, connection: &str) -> Result<Option<String>, CommandError> {
        let args = vec![
            "-S".to_string(),
            connection.to_string(),
            "-E".to_string(),
            "-b".to_string(),
            "-h".to_string(),
            "-1".to_string(),
            "-W".to_string(),
            "-l".to_string(),
            self.timeout.as_secs().max(1).to_string(),
            "-Q".to_string(),
            ERROR_LOG_QUERY.to_string(),
        ];
        let output = run_command("sqlcmd", &args, self.timeout).await?;
        Ok(parse_error_log_file_name(&output.stdout).map(|file| log_directory(&file)))
    }
}

/// First non-empty output line, with sqlcmd's `NULL` treated as absent
fn parse_error_log_file_name(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| !l.eq_ignore_ascii_case("NULL"))
        .map(String::from)
}

/// `D:\Log\ERRORLOG` -> `D:\Log`
fn log_directory(file: &str) -> String {
    match file.rfind(NAME_SEPARATOR) {
        Some(pos) => file[..pos].to_string(),
        None => file.to_string(),
    }
}

/// Connection string for an instance: the cluster's virtual name for clustered
/// instances, the local machine (`.`) otherwise.
pub fn connection_string(instance: &InstanceRecord) -> String {
    match (&instance.cluster_name, instance.is_cluster) {
        (Some(cluster), true) => format!("{}{}{}", cluster, NAME_SEPARATOR, instance.instance_name),
        _ if instance.is_default_instance() => ".".to_string(),
        _ => format!(".{}{}", NAME_SEPARATOR, instance.instance_name),
    }
}

/// Determines the directory each instance writes its ERRORLOG to
pub struct LogPathResolver {
    source: Arc<dyn ErrorLogSource>,
}

impl LogPathResolver {
    pub fn new(source: Arc<dyn ErrorLogSource>) -> Self {
        Self { source }
    }

    pub async fn resolve(&self, instance: InstanceRecord) -> ResolvedInstance {
        let connection = connection_string(&instance);
        let mut log_path = self.read_directory(&connection).await;

        if log_path.is_none() && instance.is_cluster {
            if let Some(cluster) = &instance.cluster_name {
                debug!("No log path via {}, retrying with cluster name {}", connection, cluster);
                log_path = self.read_directory(cluster).await;
            }
        }

        let resolved = ResolvedInstance::new(instance, log_path);
        if resolved.has_valid_log_path {
            debug!(
                "Log path of {}: {}",
                resolved.instance.full_name,
                resolved.log_path.as_deref().unwrap_or_default()
            );
        } else {
            warn!(
                "Could not determine the log path of {} (server unreachable, client tools missing, or passive cluster node)",
                resolved.instance.full_name
            );
        }
        resolved
    }

    pub async fn resolve_all(&self, instances: Vec<InstanceRecord>) -> Vec<ResolvedInstance> {
        let mut resolved = Vec::with_capacity(instances.len());
        for instance in instances {
            resolved.push(self.resolve(instance).await);
        }
        resolved
    }

    /// Any failure reading the property counts as an empty answer
    async fn read_directory(&self, connection: &str) -> Option<String> {
        match self.source.error_log_directory(connection).await {
            Ok(Some(dir)) if !dir.is_empty() => Some(dir),
            Ok(_) => None,
            Err(e) => {
                debug!("Reading error log path via {} failed: {}", connection, e);
                None
            }
        }
    }
}
