use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Errors loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Runtime configuration for a generate/discover run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Splunk app directory; files are written to its `local` subdirectory
    pub app_dir: PathBuf,

    /// Splunk index receiving the events
    pub index: String,

    /// Sourcetype of the monitored logs
    pub sourcetype: String,

    /// Hosts whose registry is searched for instances
    pub hosts: Vec<String>,

    /// Forwarder service restarted after writing
    pub service_name: String,

    pub restart_service: bool,

    /// Upper bound for each external command (reg, sqlcmd, powershell)
    pub command_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_dir: PathBuf::from(r"C:\Program Files\SplunkUniversalForwarder\etc\apps\mssql_errorlog"),
            index: "i_splunk_appl_mssql".to_string(),
            sourcetype: "mssql_error".to_string(),
            hosts: vec![local_host()],
            service_name: "SplunkForwarder".to_string(),
            restart_service: true,
            command_timeout_secs: 120,
        }
    }
}

/// Name of this machine as Windows reports it
pub fn local_host() -> String {
    env::var("COMPUTERNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl AppConfig {
    /// Defaults, then the config file (explicit or the per-user default), then
    /// environment variables. `.env` files are honoured.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_internal(config_file, true)
    }

    fn load_internal(config_file: Option<&Path>, load_dotenv: bool) -> Result<Self, ConfigError> {
        if load_dotenv {
            let _ = dotenv::dotenv();
        }

        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env();
        config.hosts = unique_hosts(std::mem::take(&mut config.hosts));
        Ok(config)
    }

    /// `<user config dir>/mssqlpilot/config.yaml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mssqlpilot").join("config.yaml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Override fields from `MSSQLPILOT_*` environment variables
    fn apply_env(&mut self) {
        if let Ok(app_dir) = env::var("MSSQLPILOT_APP_DIR") {
            self.app_dir = PathBuf::from(app_dir);
        }

        if let Ok(index) = env::var("MSSQLPILOT_INDEX") {
            self.index = index;
        }

        if let Ok(sourcetype) = env::var("MSSQLPILOT_SOURCETYPE") {
            self.sourcetype = sourcetype;
        }

        if let Ok(hosts) = env::var("MSSQLPILOT_HOSTS") {
            let hosts = parse_host_list(&hosts);
            if !hosts.is_empty() {
                self.hosts = hosts;
            }
        }

        if let Ok(service) = env::var("MSSQLPILOT_SERVICE") {
            self.service_name = service;
        }

        if let Ok(timeout) = env::var("MSSQLPILOT_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.command_timeout_secs = secs,
                Err(_) => debug!("Ignoring invalid MSSQLPILOT_TIMEOUT value {:?}", timeout),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.index.trim().is_empty() {
            return Err("Index name is empty".to_string());
        }

        if self.sourcetype.trim().is_empty() {
            return Err("Sourcetype name is empty".to_string());
        }

        if self.hosts.iter().all(|h| h.trim().is_empty()) {
            return Err("No hosts to scan".to_string());
        }

        if self.command_timeout_secs == 0 {
            return Err("Command timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Directory that receives inputs.conf and props.conf
    pub fn output_dir(&self) -> PathBuf {
        self.app_dir.join("local")
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Drop repeated hosts (case-insensitive), keeping the first spelling and order
pub fn unique_hosts(hosts: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(hosts.len());
    for host in hosts {
        if unique.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            debug!("Ignoring repeated host {}", host);
            continue;
        }
        unique.push(host);
    }
    unique
}

/// Split a comma- or whitespace-separated host list
pub fn parse_host_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_VARS: &[&str] = &[
        "MSSQLPILOT_APP_DIR",
        "MSSQLPILOT_INDEX",
        "MSSQLPILOT_SOURCETYPE",
        "MSSQLPILOT_HOSTS",
        "MSSQLPILOT_SERVICE",
        "MSSQLPILOT_TIMEOUT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.index, "i_splunk_appl_mssql");
        assert_eq!(config.sourcetype, "mssql_error");
        assert_eq!(config.hosts.len(), 1);
        assert_eq!(config.service_name, "SplunkForwarder");
        assert!(config.restart_service);
        assert_eq!(config.command_timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = AppConfig::from_yaml(
            r#"
index: idx_sql
hosts:
  - SQLNODE1
  - SQLNODE2
restart_service: false
"#,
        )
        .unwrap();

        assert_eq!(config.index, "idx_sql");
        assert_eq!(config.hosts, vec!["SQLNODE1", "SQLNODE2"]);
        assert!(!config.restart_service);
        assert_eq!(config.sourcetype, "mssql_error");
    }

    #[test]
    fn test_from_yaml_rejects_wrong_types() {
        assert!(AppConfig::from_yaml("command_timeout_secs: soon").is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = AppConfig::from_file(Path::new("/nonexistent/mssqlpilot.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_validate_empty_index() {
        let config = AppConfig {
            index: " ".to_string(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Index name is empty"));
    }

    #[test]
    fn test_validate_no_hosts() {
        let config = AppConfig {
            hosts: vec![],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("No hosts"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = AppConfig {
            command_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_host_list() {
        assert_eq!(parse_host_list("SQL1, SQL2,,SQL3"), vec!["SQL1", "SQL2", "SQL3"]);
        assert_eq!(parse_host_list("SQL1 SQL2"), vec!["SQL1", "SQL2"]);
        assert!(parse_host_list(" , ").is_empty());
    }

    #[test]
    fn test_unique_hosts() {
        let hosts = vec!["SQLNODE1".to_string(), "sqlnode1".to_string(), "SQLNODE2".to_string()];
        assert_eq!(unique_hosts(hosts), vec!["SQLNODE1", "SQLNODE2"]);
    }

    #[test]
    #[serial]
    fn test_repeated_env_hosts_are_collapsed() {
        clear_env();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "index: idx\n").unwrap();
        env::set_var("MSSQLPILOT_HOSTS", "SQLNODE1,SQLNODE1,sqlnode1");

        let config = AppConfig::load_internal(Some(&path), false).unwrap();
        clear_env();

        assert_eq!(config.hosts, vec!["SQLNODE1"]);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "index: from_file\nsourcetype: from_file\n").unwrap();

        env::set_var("MSSQLPILOT_INDEX", "from_env");
        env::set_var("MSSQLPILOT_HOSTS", "SQLNODE1,SQLNODE2");
        env::set_var("MSSQLPILOT_TIMEOUT", "30");

        let config = AppConfig::load_internal(Some(&path), false).unwrap();
        clear_env();

        assert_eq!(config.index, "from_env");
        assert_eq!(config.sourcetype, "from_file");
        assert_eq!(config.hosts, vec!["SQLNODE1", "SQLNODE2"]);
        assert_eq!(config.command_timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_invalid_env_timeout_is_ignored() {
        clear_env();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "command_timeout_secs: 45\n").unwrap();
        env::set_var("MSSQLPILOT_TIMEOUT", "forever");

        let config = AppConfig::load_internal(Some(&path), false).unwrap();
        clear_env();

        assert_eq!(config.command_timeout_secs, 45);
    }
}
