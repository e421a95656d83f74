pub mod json;
pub mod terminal;

use serde::{Deserialize, Serialize};

use crate::discovery::{deduplicate_with_report, Exclusion, ResolvedInstance};

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// One discovered instance with its resolution and dedup outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceEntry {
    #[serde(flatten)]
    pub resolved: ResolvedInstance,

    /// Whether the instance would be monitored by `generate`
    pub kept: bool,

    /// Why it would not be, when `kept` is false
    pub skipped_reason: Option<String>,
}

/// Everything `discover` found, in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub hosts: Vec<String>,
    pub instances: Vec<InstanceEntry>,
}

impl DiscoveryReport {
    pub fn build(hosts: &[String], resolved: Vec<ResolvedInstance>) -> Self {
        let decisions = match deduplicate_with_report(resolved.clone()) {
            Ok(outcome) => outcome.decisions,
            // nothing usable: every entry is invalid or the list is empty
            Err(_) => vec![Some(Exclusion::InvalidLogPath); resolved.len()],
        };

        let instances = resolved
            .into_iter()
            .zip(decisions)
            .map(|(r, decision)| {
                let reason = decision.as_ref().map(describe);
                InstanceEntry {
                    kept: reason.is_none(),
                    skipped_reason: reason,
                    resolved: r,
                }
            })
            .collect();

        Self {
            hosts: hosts.to_vec(),
            instances,
        }
    }

    pub fn kept_count(&self) -> usize {
        self.instances.iter().filter(|i| i.kept).count()
    }
}

fn describe(reason: &Exclusion) -> String {
    match reason {
        Exclusion::InvalidLogPath => "no usable log path".to_string(),
        Exclusion::DuplicateOf { path } => format!("log path {} already monitored", path),
    }
}
