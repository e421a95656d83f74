use async_trait::async_trait;
use std::time::Duration;

use crate::system::command::{powershell_quote, run_command, CommandError};

/// Version prefix to product name. Ordered: the first matching prefix wins,
/// so `10.5` must precede `10`.
const CAPTIONS: &[(&str, &str)] = &[
    ("16", "SQL Server 2022"),
    ("15", "SQL Server 2019"),
    ("14", "SQL Server 2017"),
    ("13", "SQL Server 2016"),
    ("12", "SQL Server 2014"),
    ("11", "SQL Server 2012"),
    ("10.5", "SQL Server 2008 R2"),
    ("10", "SQL Server 2008"),
    ("9", "SQL Server 2005"),
    ("8", "SQL Server 2000"),
];

pub const UNKNOWN_CAPTION: &str = "Unknown";

/// Map a version string such as `14.0.1000.169` to its product name
pub fn caption_for(version: Option<&str>) -> String {
    version
        .and_then(|v| {
            CAPTIONS
                .iter()
                .find(|(prefix, _)| v.starts_with(prefix))
                .map(|(_, caption)| caption.to_string())
        })
        .unwrap_or_else(|| UNKNOWN_CAPTION.to_string())
}

/// Service key name of an instance under `SYSTEM\CurrentControlSet\Services`
pub fn service_name(instance_name: &str) -> String {
    if super::types::is_default_instance(instance_name) {
        super::types::DEFAULT_INSTANCE.to_string()
    } else {
        format!("MSSQL${}", instance_name)
    }
}

/// Pull `X:\...\sqlservr.exe` out of a service `ImagePath`, which is usually
/// quoted and followed by startup arguments.
pub fn extract_executable(image_path: &str) -> Option<String> {
    let lower = image_path.to_ascii_lowercase();
    let end = lower.find("sqlservr.exe")? + "sqlservr.exe".len();
    let head = &image_path[..end];

    let bytes = head.as_bytes();
    let start = (0..bytes.len().saturating_sub(2))
        .rev()
        .find(|&i| bytes[i].is_ascii_alphabetic() && bytes[i + 1] == b':' && bytes[i + 2] == b'\\')?;

    Some(head[start..].to_string())
}

/// Rewrite a local drive path to the host's administrative share: `C:\x` -> `\\HOST\C$\x`
pub fn to_admin_share(host: &str, local_path: &str) -> String {
    format!("\\\\{}\\{}", host, local_path.replacen(':', "$", 1))
}

/// Reads the product version embedded in a binary
#[async_trait]
pub trait BinaryVersionReader: Send + Sync {
    async fn product_version(&self, path: &str) -> Result<String, CommandError>;
}

/// Reads `VersionInfo.ProductVersion` through PowerShell
pub struct PowerShellVersionReader {
    timeout: Duration,
}

impl PowerShellVersionReader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl BinaryVersionReader for PowerShellVersionReader {
    async fn product_version(&self, path: &str) -> Result<String, CommandError> {
        let script = format!(
            "(Get-Item -LiteralPath {} -ErrorAction Stop).VersionInfo.ProductVersion",
            powershell_quote(path)
        );
        let output = run_command(
            "powershell",
            &[
                "-NoProfile".to_string(),
                "-NonInteractive".to_string(),
                "-Command".to_string(),
                script,
            ],
            self.timeout,
        )
        .await?;

        let version = output.stdout.trim().to_string();
        if version.is_empty() {
            return Err(CommandError::Failed {
                program: "powershell".to_string(),
                code: Some(0),
                stdout: String::new(),
                stderr: format!("no version information in {}", path),
            });
        }
        Ok(version)
    }
}
