use anyhow::Result;
use tracing::info;

use super::config::validated_settings;
use crate::cli::commands::GenerateArgs;
use crate::runner::Generator;

pub async fn handle_generate_command(args: GenerateArgs) -> Result<()> {
    let mut config = validated_settings(&args.settings)?;
    if let Some(service_name) = args.service_name {
        config.service_name = service_name;
    }
    if args.no_restart {
        config.restart_service = false;
    }

    info!(
        "Generating monitoring configuration for {} host(s) into {}",
        config.hosts.len(),
        config.output_dir().display()
    );

    let generator = Generator::new(config);
    let summary = generator.run().await?;

    info!(
        "Run completed in {}s: {} of {} instance(s) monitored",
        summary.duration_secs,
        summary.kept.len(),
        summary.discovered
    );

    Ok(())
}
