//! `[serve]` section configuration.
//!
//! Contains preview server and watch loop settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// How the watch loop learns that the source tree may have changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatchBackend {
    /// Rescan the watched roots every `interval` milliseconds.
    #[default]
    Poll,
    /// Rescan when the OS reports a filesystem event.
    Notify,
}

/// `[serve]` section in avex.toml - development server settings.
///
/// # Example
/// ```toml
/// [serve]
/// interface = "0.0.0.0"  # Listen on all interfaces
/// port = 3000
/// interval = 500         # Poll interval in ms
/// backend = "poll"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Network interface to bind.
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// HTTP port number (default: 8000).
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,

    /// Watch tick in milliseconds.
    #[serde(default = "defaults::serve::interval")]
    #[educe(Default = defaults::serve::interval())]
    pub interval: u64,

    /// Change detection backend.
    #[serde(default = "defaults::serve::backend")]
    #[educe(Default = defaults::serve::backend())]
    pub backend: WatchBackend,
}
