//! avex - a static site generator for markdown content.

mod build;
mod cli;
mod compiler;
mod config;
mod logger;
mod serve;
mod template;
mod watch;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use std::path::Path;
use watch::watch_site;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Build { force } => build_site(&config, *force).map(|_| ()),
        Commands::Watch { .. } => watch_site(&config),
    }
}

/// Load and validate configuration from CLI arguments.
///
/// A missing config file means defaults.
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
