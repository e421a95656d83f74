use colored::Colorize;

use super::{DiscoveryReport, InstanceEntry};

const TERMINAL_WIDTH: usize = 80;
const SEPARATOR_WIDTH: usize = 40;

/// Colored table of discovered instances
pub struct TerminalReporter {
    verbose: bool,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Also print edition and cluster membership
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn report(&self, report: &DiscoveryReport) {
        println!("\n{}", "═".repeat(TERMINAL_WIDTH).bright_blue());
        println!("{}", "SQL SERVER INSTANCES".bright_white().bold());
        println!("{}", "═".repeat(TERMINAL_WIDTH).bright_blue());
        println!("  Hosts scanned:   {}", report.hosts.join(", ").bright_cyan());

        if report.instances.is_empty() {
            println!("\n  {}", "No SQL Server instances found".bright_red());
            return;
        }

        for entry in &report.instances {
            self.print_instance(entry);
        }

        println!("\n{}", "─".repeat(SEPARATOR_WIDTH).bright_black());
        println!(
            "  Monitored: {} of {}",
            report.kept_count().to_string().bright_green().bold(),
            report.instances.len()
        );
    }

    fn print_instance(&self, entry: &InstanceEntry) {
        let instance = &entry.resolved.instance;
        let marker = if entry.kept { "✅" } else { "⏭️ " };

        println!("\n{} {}", marker, instance.full_name.bright_white().bold());
        println!("{}", "─".repeat(SEPARATOR_WIDTH).bright_black());
        println!(
            "  Version:         {} ({})",
            instance.caption.bright_cyan(),
            instance.version.as_deref().unwrap_or("unknown")
        );

        match &entry.resolved.log_path {
            Some(path) if entry.resolved.has_valid_log_path => println!("  Log path:        {}", path.bright_green()),
            Some(path) => println!("  Log path:        {}", path.bright_red()),
            None => println!("  Log path:        {}", "unresolved".bright_red()),
        }

        if instance.is_cluster {
            println!(
                "  Cluster:         {}",
                instance.cluster_name.as_deref().unwrap_or("(unnamed)").bright_yellow()
            );
        }

        if let Some(reason) = &entry.skipped_reason {
            println!("  Skipped:         {}", reason.bright_yellow());
        }

        if self.verbose {
            if let Some(edition) = &instance.edition {
                println!("  Edition:         {}", edition);
            }
            if !instance.cluster_nodes.is_empty() {
                let nodes: Vec<&str> = instance.cluster_nodes.iter().map(String::as_str).collect();
                println!("  Other nodes:     {}", nodes.join(", "));
            }
        }
    }
}
