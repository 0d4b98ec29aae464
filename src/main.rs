use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use tracing::info;

use certsmith::cli::Cli;
use certsmith::configs;
use certsmith::files::FileHandler;
use certsmith::generator::Generator;
use certsmith::logging;
use certsmith::process::OpenSslRunner;
use certsmith::resolver::Resolver;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log, cli.effective_log_level())?;

    let files = FileHandler;
    if !files.file_exists(&cli.openssl) {
        bail!("Cannot find the openssl binary at {}.", cli.openssl);
    }
    if !files.file_exists(&cli.config) {
        bail!("{} configuration file does not exist.", cli.config);
    }

    let actions = cli.actions();
    if !actions.any() {
        println!("--all or one of --key, --req and/or --sign is required.");
        Cli::command().print_help()?;
        return Ok(());
    }

    let config = configs::read_config(&cli.config)?;
    let resolved = Resolver::new(files).resolve(
        &config,
        cli.group_filter().as_ref(),
        cli.entity_filter().as_ref(),
    );
    if resolved.is_empty() {
        println!("No data found in configuration file.");
        return Ok(());
    }

    let generator = Generator::new(&cli.openssl, files, OpenSslRunner);
    for (group_name, group) in &resolved {
        info!("Generating files for group: {}.", group_name);
        generator.generate(&actions, group);
    }
    Ok(())
}
