// Module declarations
pub mod catalog;
pub mod dedup;
pub mod log_path;
pub mod reg_query;
pub mod registry;
pub mod types;
pub mod version;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export types for convenience
pub use catalog::{CatalogError, InstanceCatalog};
pub use dedup::{deduplicate, deduplicate_with_report, DedupOutcome, Exclusion};
pub use log_path::{ErrorLogSource, LogPathResolver, SqlcmdErrorLogSource};
pub use reg_query::RegQueryStore;
pub use registry::{RegValue, RegistryError, RegistryKey, RegistryStore};
pub use types::{InstanceRecord, MonitorEntry, ResolvedInstance};
pub use version::{BinaryVersionReader, PowerShellVersionReader};
