use colored::Colorize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::{local_host, AppConfig};
use crate::discovery::{
    deduplicate_with_report, BinaryVersionReader, ErrorLogSource, Exclusion, InstanceCatalog, LogPathResolver,
    PowerShellVersionReader, RegQueryStore, RegistryStore, ResolvedInstance, SqlcmdErrorLogSource,
};
use crate::emit::{ConfigWriter, FileSystem, LocalFileSystem, WriteMode, WriteSummary};
use crate::error::PilotResult;
use crate::system::{PowerShellServiceControl, ServiceControl};

const BANNER_WIDTH: usize = 63;

/// External systems the generator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn RegistryStore>,
    pub versions: Arc<dyn BinaryVersionReader>,
    pub error_logs: Arc<dyn ErrorLogSource>,
    pub fs: Arc<dyn FileSystem>,
    pub services: Arc<dyn ServiceControl>,
}

impl Collaborators {
    /// The real registry, sqlcmd, filesystem and service manager
    pub fn system(config: &AppConfig) -> Self {
        let timeout = config.command_timeout();
        Self {
            registry: Arc::new(RegQueryStore::new(local_host(), timeout)),
            versions: Arc::new(PowerShellVersionReader::new(timeout)),
            error_logs: Arc::new(SqlcmdErrorLogSource::new(timeout)),
            fs: Arc::new(LocalFileSystem),
            services: Arc::new(PowerShellServiceControl::new(timeout)),
        }
    }
}

/// Result of a complete generate run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub discovered: usize,
    pub kept: Vec<String>,
    pub excluded: Vec<(String, Exclusion)>,
    pub write: WriteSummary,
    pub restarted: bool,
    pub duration_secs: u64,
}

/// Drives discovery, deduplication and publication of the monitoring config
pub struct Generator {
    config: AppConfig,
    parts: Collaborators,
}

impl Generator {
    pub fn new(config: AppConfig) -> Self {
        let parts = Collaborators::system(&config);
        Self { config, parts }
    }

    pub fn with_collaborators(config: AppConfig, parts: Collaborators) -> Self {
        Self { config, parts }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Discover instances on all configured hosts and resolve their log paths
    pub async fn discover(&self) -> Vec<ResolvedInstance> {
        let catalog = InstanceCatalog::new(self.parts.registry.clone(), self.parts.versions.clone());
        let instances = catalog.discover(&self.config.hosts).await;
        info!("Discovered {} instance(s) on {} host(s)", instances.len(), self.config.hosts.len());

        let resolver = LogPathResolver::new(self.parts.error_logs.clone());
        resolver.resolve_all(instances).await
    }

    /// Full run. Nothing is written unless at least one instance is usable.
    pub async fn run(&self) -> PilotResult<RunSummary> {
        let start_time = Instant::now();

        print_phase("PHASE 1: Discovering SQL Server Instances");
        let resolved = self.discover().await;
        for r in &resolved {
            let status = if r.has_valid_log_path { "✅" } else { "⚠️ " };
            println!(
                "  {} {} → {}",
                status,
                r.instance.full_name,
                r.log_path.as_deref().unwrap_or("(no log path)")
            );
        }

        print_phase("PHASE 2: Removing Duplicate Log Paths");
        let outcome = match deduplicate_with_report(resolved.clone()) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };
        for (r, reason) in &outcome.excluded {
            match reason {
                Exclusion::InvalidLogPath => println!("  • {} skipped: no usable log path", r.instance.full_name),
                Exclusion::DuplicateOf { path } => {
                    println!("  • {} skipped: {} is already monitored", r.instance.full_name, path)
                }
            }
        }
        println!("  {} instance(s) will be monitored", outcome.kept.len());

        print_phase("PHASE 3: Writing Forwarder Configuration");
        let writer = ConfigWriter::new(self.parts.fs.clone(), self.config.output_dir());
        let write = writer.write(&resolved, &outcome, &self.config.index, &self.config.sourcetype)?;
        match write.mode {
            WriteMode::Fresh => println!("  ✅ Recreated {}", write.directory.display()),
            WriteMode::Append => println!(
                "  ⚠️  Appended to {} ({} new, {} already present)",
                write.directory.display(),
                write.written.len(),
                write.already_present.len()
            ),
        }

        let restarted = if self.config.restart_service {
            print_phase("PHASE 4: Restarting Forwarder");
            match self.parts.services.restart(&self.config.service_name).await {
                Ok(()) => {
                    println!("  ✅ {} restarted", self.config.service_name);
                    true
                }
                Err(e) => {
                    warn!("Failed to restart {}: {}", self.config.service_name, e);
                    println!("  ❌ {} could not be restarted", self.config.service_name);
                    false
                }
            }
        } else {
            info!("Service restart disabled");
            false
        };

        let summary = RunSummary {
            discovered: resolved.len(),
            kept: outcome.kept.iter().map(|k| k.instance.full_name.clone()).collect(),
            excluded: outcome
                .excluded
                .iter()
                .map(|(r, reason)| (r.instance.full_name.clone(), reason.clone()))
                .collect(),
            write,
            restarted,
            duration_secs: start_time.elapsed().as_secs(),
        };

        println!();
        println!("{}", "═".repeat(BANNER_WIDTH).bright_blue());
        println!("{}", "                    CONFIGURATION COMPLETE!".bold());
        println!("{}", "═".repeat(BANNER_WIDTH).bright_blue());
        println!("  • Instances discovered: {}", summary.discovered);
        println!("  • Instances monitored: {}", summary.kept.len());
        println!("  • Output directory: {}", summary.write.directory.display());
        println!();

        Ok(summary)
    }
}

fn print_phase(title: &str) {
    println!();
    println!("{}", "═".repeat(BANNER_WIDTH).bright_blue());
    println!("{}", title.bold());
    println!("{}", "═".repeat(BANNER_WIDTH).bright_blue());
}
