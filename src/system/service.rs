use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use super::command::{powershell_quote, run_command, CommandError};

/// Restarts a named background service once the new configuration is in place
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn restart(&self, service_name: &str) -> Result<(), CommandError>;
}

/// Service control through `Restart-Service`
pub struct PowerShellServiceControl {
    timeout: Duration,
}

impl PowerShellServiceControl {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ServiceControl for PowerShellServiceControl {
    async fn restart(&self, service_name: &str) -> Result<(), CommandError> {
        info!("Restarting service {}", service_name);
        let script = format!(
            "Restart-Service -Name {} -Force -ErrorAction Stop",
            powershell_quote(service_name)
        );
        run_command(
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
        Ok(())
    }
}
