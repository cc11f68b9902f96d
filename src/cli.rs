//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::WatchBackend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// avex static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Layouts directory path (relative to project root)
    #[arg(short, long)]
    pub layouts: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the base URL written into pages and archive links
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Config file name (default: avex.toml)
    #[arg(short = 'C', long, default_value = "avex.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate the static site into the public directory
    Build {
        /// Rebuild all layouts/components/assets even if unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// Serve the public directory and rebuild when content/layouts change
    #[command(alias = "serve")]
    Watch {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// How changes are detected
        #[arg(short, long, value_enum)]
        backend: Option<WatchBackend>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_force() {
        let cli = Cli::try_parse_from(["avex", "build", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Build { force: true }));
    }

    #[test]
    fn test_parse_serve_alias() {
        let cli =
            Cli::try_parse_from(["avex", "serve", "--port", "9000", "--backend", "notify"])
                .unwrap();
        match cli.command {
            Commands::Watch { port, backend, .. } => {
                assert_eq!(port, Some(9000));
                assert_eq!(backend, Some(WatchBackend::Notify));
            }
            Commands::Build { .. } => panic!("expected watch"),
        }
    }

    #[test]
    fn test_global_path_overrides() {
        let cli = Cli::try_parse_from([
            "avex", "--content", "posts", "--base-url", "https://x.dev/", "build",
        ])
        .unwrap();
        assert_eq!(cli.content, Some(PathBuf::from("posts")));
        assert_eq!(cli.base_url.as_deref(), Some("https://x.dev/"));
        assert_eq!(cli.config, PathBuf::from("avex.toml"));
    }
}
