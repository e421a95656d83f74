use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::registry::{RegValue, RegistryError, RegistryKey, RegistryResult, RegistryStore};
use crate::system::{run_command, CommandError};

/// Registry access through the `reg query` tool.
///
/// Remote hosts are addressed as `\\HOST\HKLM\...`, which goes through the
/// Remote Registry service of the target machine.
pub struct RegQueryStore {
    local_host: String,
    timeout: Duration,
}

impl RegQueryStore {
    pub fn new(local_host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            local_host: local_host.into(),
            timeout,
        }
    }

    fn is_local(&self, host: &str) -> bool {
        host == "." || host.eq_ignore_ascii_case("localhost") || host.eq_ignore_ascii_case(&self.local_host)
    }

    /// Full key argument for `reg query`
    pub fn key_argument(&self, host: &str, path: &str) -> String {
        if self.is_local(host) {
            format!("HKLM\\{}", path)
        } else {
            format!("\\\\{}\\HKLM\\{}", host, path)
        }
    }
}

#[async_trait]
impl RegistryStore for RegQueryStore {
    async fn open_key(&self, host: &str, path: &str) -> RegistryResult<RegistryKey> {
        let args = vec!["query".to_string(), self.key_argument(host, path)];

        match run_command("reg", &args, self.timeout).await {
            Ok(output) => Ok(parse_reg_query_output(path, &output.stdout)),
            Err(e) => Err(classify_failure(host, path, e)),
        }
    }
}

/// Map a failed `reg query` to a registry error.
///
/// `reg.exe` exits with 1 and prints nothing on stdout for a missing key; its
/// message is localized, so the English text is only one of the signals.
/// Spawn failures, timeouts and known connection errors stay `Unreachable`.
pub fn classify_failure(host: &str, path: &str, error: CommandError) -> RegistryError {
    let missing = match &error {
        CommandError::Failed {
            code, stdout, stderr, ..
        } => {
            let lower = stderr.to_ascii_lowercase();
            lower.contains("unable to find the specified registry key")
                || (*code == Some(1) && stdout.trim().is_empty() && !is_connection_error(&lower))
        }
        CommandError::Spawn { .. } | CommandError::Timeout { .. } => false,
    };

    if missing {
        debug!("Registry key {} not found on {}", path, host);
        RegistryError::NotFound {
            host: host.to_string(),
            path: path.to_string(),
        }
    } else {
        RegistryError::Unreachable {
            host: host.to_string(),
            source: error,
        }
    }
}

fn is_connection_error(stderr: &str) -> bool {
    ["network path", "rpc server", "access is denied"]
        .iter()
        .any(|marker| stderr.contains(marker))
}

/// Parse the output of `reg query <key>` (without `/s`).
///
/// The first key header is the queried key itself; its values follow as
/// indented `name    TYPE    data` lines. Every later header is a direct subkey.
pub fn parse_reg_query_output(path: &str, output: &str) -> RegistryKey {
    let mut key = RegistryKey::new(path);
    let mut seen_header = false;

    for raw in output.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with("    ") {
            if let Some((name, value)) = parse_value_line(line) {
                key.values.push((name, value));
            }
            continue;
        }

        if line.starts_with("HKEY_") || line.starts_with("\\\\") {
            if !seen_header {
                seen_header = true;
                continue;
            }
            if let Some(name) = line.rsplit('\\').next() {
                if !name.is_empty() {
                    key.subkeys.push(name.to_string());
                }
            }
        }
    }

    debug!(
        "Parsed registry key {}: {} subkeys, {} values",
        path,
        key.subkeys.len(),
        key.values.len()
    );
    key
}

fn parse_value_line(line: &str) -> Option<(String, RegValue)> {
    let line = line.trim_start();
    let type_start = line.find("    REG_")?;
    let name = line[..type_start].to_string();
    let rest = &line[type_start + 4..];

    let (reg_type, data) = match rest.find("    ") {
        Some(pos) => (&rest[..pos], &rest[pos + 4..]),
        None => (rest.trim_end(), ""),
    };

    let value = match reg_type {
        "REG_SZ" | "REG_EXPAND_SZ" => RegValue::String(data.to_string()),
        "REG_MULTI_SZ" => RegValue::MultiString(
            data.split("\\0")
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        ),
        "REG_DWORD" => match u32::from_str_radix(data.trim_start_matches("0x"), 16) {
            Ok(n) => RegValue::Dword(n),
            Err(_) => RegValue::Other(data.to_string()),
        },
        _ => RegValue::Other(data.to_string()),
    };

    Some((name, value))
}
