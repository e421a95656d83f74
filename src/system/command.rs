use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Errors from running an external tool
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },

    #[error("{program} exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Captured stdout of a successful command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
}

/// Run an external program and wait for it, bounded by `timeout`.
///
/// A non-zero exit status is an error; the captured output is carried in
/// [`CommandError::Failed`] so callers can inspect it (e.g. `reg query` reports a
/// missing key on stderr).
pub async fn run_command(program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput, CommandError> {
    debug!("Running: {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.to_string(),
                secs: timeout.as_secs(),
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        Ok(CommandOutput { stdout })
    } else {
        Err(CommandError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Quote a value for a single-quoted PowerShell string literal
pub fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
