use anyhow::Result;
use tracing::info;

use super::config::validated_settings;
use crate::cli::commands::SettingsArgs;
use crate::report::{DiscoveryReport, JsonReporter, TerminalReporter};
use crate::runner::Generator;

pub async fn handle_discover_command(settings: SettingsArgs, json: bool, verbose: bool) -> Result<()> {
    let config = validated_settings(&settings)?;
    info!("Discovering SQL Server instances on {}", config.hosts.join(", "));

    let generator = Generator::new(config);
    let resolved = generator.discover().await;
    let report = DiscoveryReport::build(&generator.config().hosts, resolved);

    if json {
        println!("{}", JsonReporter::new().render(&report)?);
    } else {
        TerminalReporter::new().with_verbose(verbose).report(&report);
    }

    Ok(())
}
