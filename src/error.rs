use std::path::PathBuf;

/// Run-fatal conditions. Anything that surfaces here aborts the run with exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error("No usable SQL Server instances: every discovered instance was unreachable or shared an earlier instance's log path")]
    NoUsableInstances,

    #[error("Failed to replace output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Instance {instance} has no resolvable log path and is not present in the existing inputs.conf")]
    MissingLogPath { instance: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PilotResult<T> = Result<T, PilotError>;
