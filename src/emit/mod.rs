pub mod writer;

use crate::discovery::types::{MonitorEntry, ResolvedInstance, NAME_SEPARATOR};

pub use writer::{ConfigWriter, FileSystem, LocalFileSystem, WriteMode, WriteSummary};

pub const INPUTS_FILE: &str = "inputs.conf";
pub const PROPS_FILE: &str = "props.conf";

/// Primary diagnostic log of an instance
pub const ERROR_LOG_FILE: &str = "ERRORLOG";
/// SQL Server Agent log, written to the same directory
pub const AGENT_LOG_FILE: &str = "SQLAGENT.OUT";

/// Rendered contents of the two configuration files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    pub props: String,
    pub inputs: String,
}

/// Error-log and agent-log entries for an instance; `None` without a log path
pub fn monitor_entries(resolved: &ResolvedInstance) -> Option<[MonitorEntry; 2]> {
    let dir = resolved.log_path.as_deref()?;
    let instance = &resolved.instance;
    let host_override = if instance.is_cluster {
        instance.cluster_name.clone()
    } else {
        None
    };

    Some([
        MonitorEntry {
            path: format!("{}{}{}", dir, NAME_SEPARATOR, ERROR_LOG_FILE),
            source_label: instance.instance_name.clone(),
            host_override: host_override.clone(),
        },
        MonitorEntry {
            path: format!("{}{}{}", dir, NAME_SEPARATOR, AGENT_LOG_FILE),
            source_label: format!("{}(Agent)", instance.instance_name),
            host_override,
        },
    ])
}

pub fn render_stanza(entry: &MonitorEntry, index: &str, sourcetype: &str) -> String {
    let mut stanza = format!(
        "[monitor://{}]\ndisabled=false\nindex={}\nsourcetype={}\nsource={}\nfollowTail=false\n",
        entry.path, index, sourcetype, entry.source_label
    );
    if let Some(host) = &entry.host_override {
        stanza.push_str(&format!("host={}\n", host));
    }
    stanza
}

/// Both stanzas of one instance, error log first
pub fn render_instance(resolved: &ResolvedInstance, index: &str, sourcetype: &str) -> String {
    monitor_entries(resolved)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| render_stanza(entry, index, sourcetype))
                .collect()
        })
        .unwrap_or_default()
}

/// Sourcetype stanza of props.conf. SQL Server writes its ERRORLOG as UTF-16LE.
pub fn render_props(sourcetype: &str) -> String {
    format!(
        "[{}]\nSHOULD_LINEMERGE = true\nBREAK_ONLY_BEFORE_DATE = true\nMAX_TIMESTAMP_LOOKAHEAD = 22\nCHARSET = UTF-16LE\nNO_BINARY_CHECK = true\n",
        sourcetype
    )
}

pub fn render_inputs(kept: &[ResolvedInstance], index: &str, sourcetype: &str) -> String {
    kept.iter()
        .map(|resolved| render_instance(resolved, index, sourcetype))
        .collect()
}

/// Render props.conf and inputs.conf for the deduplicated instances
pub fn render(kept: &[ResolvedInstance], index: &str, sourcetype: &str) -> RenderedConfig {
    RenderedConfig {
        props: render_props(sourcetype),
        inputs: render_inputs(kept, index, sourcetype),
    }
}
