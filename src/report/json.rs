use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{DiscoveryReport, ReportResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub discovery: DiscoveryReport,
    pub summary: Summary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub tool_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Summary {
    pub discovered: usize,
    pub kept: usize,
    pub clustered: usize,
}

/// JSON rendering of a discovery run
pub struct JsonReporter;

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &DiscoveryReport) -> ReportResult<String> {
        let json = JsonReport {
            metadata: ReportMetadata {
                generated_at: Utc::now().to_rfc3339(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            summary: Summary {
                discovered: report.instances.len(),
                kept: report.kept_count(),
                clustered: report
                    .instances
                    .iter()
                    .filter(|i| i.resolved.instance.is_cluster)
                    .count(),
            },
            discovery: report.clone(),
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
