pub mod cli;
pub mod config;
pub mod discovery;
pub mod emit;
pub mod error;
pub mod report;
pub mod runner;
pub mod system;

pub use error::{PilotError, PilotResult};
