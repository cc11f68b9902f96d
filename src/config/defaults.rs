//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn layouts() -> PathBuf {
        "layouts".into()
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn cache() -> PathBuf {
        "storage/cache".into()
    }

    pub fn base_url() -> String {
        String::new()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    use crate::config::WatchBackend;

    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8000
    }

    /// Poll interval in milliseconds.
    pub fn interval() -> u64 {
        500
    }

    pub fn backend() -> WatchBackend {
        WatchBackend::default()
    }
}
