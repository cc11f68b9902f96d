//! Build error taxonomy.
//!
//! | Variant         | Severity | Handling                            |
//! |-----------------|----------|-------------------------------------|
//! | `MissingSource` | warn     | reference skipped or omitted        |
//! | `MissingLayout` | warn     | document skipped                    |
//! | `Io`            | error    | that artifact skipped               |
//! | `CreateDir`     | error    | that artifact skipped               |
//! | `PathTraversal` | error    | document skipped                    |
//!
//! Nothing here aborts a build: every variant is reported through
//! [`BuildError::report`] by the nearest orchestrator, which then moves on.

use crate::log;
use std::{error::Error as _, io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A referenced layout, component or sidecar is absent.
    #[error("{kind} not found: {}", path.display())]
    MissingSource { kind: &'static str, path: PathBuf },

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configured output file escapes the public root.
    #[error("output path escapes the public directory: {0}")]
    PathTraversal(String),

    /// Document without a `layout` front-matter key.
    #[error("no `layout` in front matter of {}", .0.display())]
    MissingLayout(PathBuf),
}

impl BuildError {
    pub fn missing(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::MissingSource {
            kind,
            path: path.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Expected gaps in the site sources, as opposed to failures.
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::MissingSource { .. } | Self::MissingLayout(_))
    }

    /// Emit this error as a one-line diagnostic.
    pub fn report(&self) {
        let message = match self.source() {
            Some(source) => format!("{self}: {source}"),
            None => self.to_string(),
        };
        if self.is_gap() {
            log!("warn"; "{message}");
        } else {
            log!("error"; "{message}");
        }
    }
}
