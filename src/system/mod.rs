pub mod command;
pub mod service;

pub use command::{run_command, CommandError, CommandOutput};
pub use service::{PowerShellServiceControl, ServiceControl};
