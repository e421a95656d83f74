use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::env;

use crate::cli::commands::SettingsArgs;
use crate::config::{unique_hosts, AppConfig};

/// Layer command-line flags over the file/environment configuration
pub fn load_settings(settings: &SettingsArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(settings.config.as_deref()).context("Failed to load configuration")?;
    apply_settings(&mut config, settings);
    Ok(config)
}

pub fn apply_settings(config: &mut AppConfig, settings: &SettingsArgs) {
    if let Some(app_dir) = &settings.app_dir {
        config.app_dir = app_dir.clone();
    }
    if let Some(index) = &settings.index {
        config.index = index.clone();
    }
    if let Some(sourcetype) = &settings.sourcetype {
        config.sourcetype = sourcetype.clone();
    }
    if !settings.hosts.is_empty() {
        config.hosts = unique_hosts(settings.hosts.clone());
    }
    if let Some(timeout) = settings.timeout {
        config.command_timeout_secs = timeout;
    }
}

/// Load, override and validate
pub fn validated_settings(settings: &SettingsArgs) -> Result<AppConfig> {
    let config = load_settings(settings)?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

pub fn handle_config_command(settings: SettingsArgs) -> Result<()> {
    let env_file_loaded = dotenv::dotenv().is_ok();
    let config = load_settings(&settings)?;

    println!("🔧 MSSQLPilot Configuration");
    println!("═══════════════════════════════════════");
    println!();

    println!("📄 Sources:");
    match (&settings.config, AppConfig::default_config_path()) {
        (Some(path), _) => println!("  • Config file: {}", path.display()),
        (None, Some(path)) if path.exists() => println!("  • Config file: {}", path.display()),
        (None, Some(path)) => println!("  • Config file: ⚠️  None ({} not found)", path.display()),
        (None, None) => println!("  • Config file: ⚠️  None"),
    }
    if env_file_loaded {
        println!("  • .env file: ✅ Loaded");
    } else {
        println!("  • .env file: ⚠️  Not found (using system environment)");
    }
    match env::var("RUST_LOG") {
        Ok(val) => println!("  • RUST_LOG: {}", val),
        Err(_) => println!("  • RUST_LOG: info (default)"),
    }
    println!();

    println!("⚙️  Settings:");
    println!("  • Hosts: {}", config.hosts.join(", "));
    println!("  • Index: {}", config.index);
    println!("  • Sourcetype: {}", config.sourcetype);
    println!("  • App directory: {}", config.app_dir.display());
    println!("  • Output directory: {}", config.output_dir().display());
    println!("  • Forwarder service: {}", config.service_name);
    println!("  • Restart after writing: {}", config.restart_service);
    println!("  • Command timeout: {}s", config.command_timeout_secs);
    println!();

    match config.validate() {
        Ok(()) => println!("{}", "✅ Configuration is valid".green()),
        Err(e) => println!("{} {}", "❌ Configuration is invalid:".red(), e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_apply_settings_overrides_only_given_flags() {
        let mut config = AppConfig {
            index: "from_file".to_string(),
            hosts: vec!["SQLNODE1".to_string()],
            ..Default::default()
        };
        let settings = SettingsArgs {
            app_dir: Some(PathBuf::from("/opt/splunk/etc/apps/mssql")),
            sourcetype: Some("mssql:errorlog".to_string()),
            timeout: Some(15),
            ..Default::default()
        };

        apply_settings(&mut config, &settings);

        assert_eq!(config.index, "from_file");
        assert_eq!(config.hosts, vec!["SQLNODE1"]);
        assert_eq!(config.sourcetype, "mssql:errorlog");
        assert_eq!(config.command_timeout_secs, 15);
        assert_eq!(config.output_dir(), PathBuf::from("/opt/splunk/etc/apps/mssql/local"));
    }

    #[test]
    fn test_apply_settings_collapses_repeated_hosts() {
        let mut config = AppConfig::default();
        let settings = SettingsArgs {
            hosts: vec!["SQLHOST01".to_string(), "SQLHOST01".to_string()],
            ..Default::default()
        };

        apply_settings(&mut config, &settings);

        assert_eq!(config.hosts, vec!["SQLHOST01"]);
    }

    #[test]
    fn test_apply_settings_replaces_hosts() {
        let mut config = AppConfig::default();
        let settings = SettingsArgs {
            hosts: vec!["SQLNODE2".to_string(), "SQLNODE3".to_string()],
            ..Default::default()
        };

        apply_settings(&mut config, &settings);

        assert_eq!(config.hosts, vec!["SQLNODE2", "SQLNODE3"]);
    }
}
