//! Site configuration management for `avex.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[build]`   | Content/layouts/output roots, base URL          |
//! | `[serve]`   | Preview server and watch loop                   |
//!
//! The file is optional: a project without `avex.toml` builds with defaults.
//!
//! # Example
//!
//! ```toml
//! [build]
//! content = "content"
//! layouts = "layouts"
//! output = "public"
//! base_url = "https://example.com"
//!
//! [serve]
//! port = 8000
//! backend = "poll"
//! ```

mod build;
pub mod defaults;
mod error;
mod paths;
mod serve;

pub use error::ConfigError;
pub use paths::{SitePaths, join_url, path_is_within};
pub use serve::WatchBackend;

use build::BuildConfig;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing avex.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Absolute site roots for one build.
    pub fn paths(&self) -> SitePaths {
        SitePaths::new(
            &self.build.content,
            &self.build.layouts,
            &self.build.output,
            &self.build.cache,
        )
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.build.base_url.trim().trim_end_matches('/')
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.layouts, cli.layouts.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.base_url, cli.base_url.as_ref());

        if let Commands::Watch {
            interface,
            port,
            backend,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.backend, backend.as_ref());
        }

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make every configured directory absolute against `root`.
    pub fn update_path_with_root(&mut self, root: &Path, config_name: &Path) {
        let root = Self::normalize_path(&Self::expand_tilde(root));
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(config_name));
        for dir in [
            &mut self.build.content,
            &mut self.build.layouts,
            &mut self.build.output,
            &mut self.build.cache,
        ] {
            *dir = Self::normalize_path(&root.join(Self::expand_tilde(dir)));
        }
    }

    /// Expand a leading `~` to the home directory.
    fn expand_tilde(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
            None => path.to_path_buf(),
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before building
    pub fn validate(&self) -> Result<()> {
        if self.serve.interval == 0 {
            bail!(ConfigError::Validation("[serve.interval] must be > 0".into()));
        }

        let base_url = self.base_url();
        if !base_url.is_empty() && !(base_url.starts_with("http") || base_url.starts_with('/')) {
            bail!(ConfigError::Validation(
                "[build.base_url] must start with http://, https:// or /".into()
            ));
        }

        if self.build.content == self.build.output {
            bail!(ConfigError::Validation(
                "[build.content] and [build.output] must differ".into()
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
