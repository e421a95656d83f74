//! In-memory collaborators for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::log_path::ErrorLogSource;
use super::registry::{RegistryError, RegistryKey, RegistryResult, RegistryStore};
use super::version::BinaryVersionReader;
use crate::system::{CommandError, ServiceControl};

fn failed(program: &str, message: &str) -> CommandError {
    CommandError::Failed {
        program: program.to_string(),
        code: Some(1),
        stdout: String::new(),
        stderr: message.to_string(),
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    keys: HashMap<(String, String), RegistryKey>,
    unreachable: HashSet<String>,
    failing_keys: HashSet<(String, String)>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, host: &str, key: RegistryKey) -> Self {
        self.keys
            .insert((host.to_ascii_lowercase(), key.path.to_ascii_lowercase()), key);
        self
    }

    pub fn with_unreachable_host(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_ascii_lowercase());
        self
    }

    /// A single key whose read fails with an error other than "not found"
    pub fn with_failing_key(mut self, host: &str, path: &str) -> Self {
        self.failing_keys
            .insert((host.to_ascii_lowercase(), path.to_ascii_lowercase()));
        self
    }
}

#[async_trait]
impl RegistryStore for FakeRegistry {
    async fn open_key(&self, host: &str, path: &str) -> RegistryResult<RegistryKey> {
        let host_key = host.to_ascii_lowercase();
        if self.unreachable.contains(&host_key) {
            return Err(RegistryError::Unreachable {
                host: host.to_string(),
                source: failed("reg", "ERROR: The network path was not found."),
            });
        }

        let lookup = (host_key, path.to_ascii_lowercase());
        if self.failing_keys.contains(&lookup) {
            return Err(RegistryError::Unreachable {
                host: host.to_string(),
                source: failed("reg", "ERROR: Access is denied."),
            });
        }

        self.keys
            .get(&lookup)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                host: host.to_string(),
                path: path.to_string(),
            })
    }
}

#[derive(Default)]
pub struct FakeVersionReader {
    versions: HashMap<String, String>,
}

impl FakeVersionReader {
    /// A reader that knows no binaries, so every lookup fails
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, path: &str, version: &str) -> Self {
        self.versions.insert(path.to_string(), version.to_string());
        self
    }
}

#[async_trait]
impl BinaryVersionReader for FakeVersionReader {
    async fn product_version(&self, path: &str) -> Result<String, CommandError> {
        self.versions
            .get(path)
            .cloned()
            .ok_or_else(|| failed("powershell", "Access is denied"))
    }
}

/// Answers per connection string; unknown connections fail
#[derive(Default)]
pub struct FakeErrorLogSource {
    answers: HashMap<String, Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeErrorLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, connection: &str, directory: &str) -> Self {
        self.answers
            .insert(connection.to_string(), Some(directory.to_string()));
        self
    }

    pub fn with_empty(mut self, connection: &str) -> Self {
        self.answers.insert(connection.to_string(), None);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ErrorLogSource for FakeErrorLogSource {
    async fn error_log_directory(&self, connection: &str) -> Result<Option<String>, CommandError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(connection.to_string());
        }
        match self.answers.get(connection) {
            Some(answer) => Ok(answer.clone()),
            None => Err(failed("sqlcmd", "Login timeout expired")),
        }
    }
}

#[derive(Default)]
pub struct FakeServiceControl {
    fail: bool,
    restarted: Mutex<Vec<String>>,
}

impl FakeServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn restarted(&self) -> Vec<String> {
        self.restarted.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ServiceControl for FakeServiceControl {
    async fn restart(&self, service_name: &str) -> Result<(), CommandError> {
        if self.fail {
            return Err(failed("powershell", "Cannot find any service"));
        }
        if let Ok(mut restarted) = self.restarted.lock() {
            restarted.push(service_name.to_string());
        }
        Ok(())
    }
}
