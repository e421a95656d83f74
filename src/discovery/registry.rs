use async_trait::async_trait;

use crate::system::CommandError;

/// Errors from reading a host's registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry key not found on {host}: {path}")]
    NotFound { host: String, path: String },

    #[error("Registry on {host} is unreachable: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: CommandError,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A typed registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegValue {
    String(String),
    MultiString(Vec<String>),
    Dword(u32),
    Other(String),
}

impl RegValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RegValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Snapshot of one registry key: its subkey names and values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryKey {
    pub path: String,
    pub subkeys: Vec<String>,
    pub values: Vec<(String, RegValue)>,
}

impl RegistryKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_subkey(mut self, name: impl Into<String>) -> Self {
        self.subkeys.push(name.into());
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: RegValue) -> Self {
        self.values.push((name.into(), value));
        self
    }

    /// Registry names are case-insensitive
    pub fn has_subkey(&self, name: &str) -> bool {
        self.subkeys.iter().any(|k| k.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, name: &str) -> Option<&RegValue> {
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// String value, treating an empty string as absent
    pub fn string(&self, name: &str) -> Option<&str> {
        self.value(name)
            .and_then(RegValue::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Join registry path segments with a backslash
pub fn join_path(base: &str, child: &str) -> String {
    if base.is_empty() {
        child.to_string()
    } else {
        format!("{}\\{}", base.trim_end_matches('\\'), child)
    }
}

/// Read access to the HKEY_LOCAL_MACHINE hive of a host
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Open a key below HKLM on `host` and return its subkeys and values
    async fn open_key(&self, host: &str, path: &str) -> RegistryResult<RegistryKey>;
}
