//! Directory paths used by the client.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Environment Overrides
//!
//! - `SEARSIA_CONFIG_DIR` overrides [`config_dir`]
//! - `SEARSIA_CACHE_DIR` overrides [`cache_dir`]

use std::path::PathBuf;

/// Directory holding `config.toml`.
///
/// Resolves to `$XDG_CONFIG_HOME/searsia/`, then `dirs::config_dir()/searsia/`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SEARSIA_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("searsia");
    }
    dirs::config_dir()
        .map(|d| d.join("searsia"))
        .unwrap_or_else(|| PathBuf::from("/tmp/searsia-config"))
}

/// Directory holding the persisted resource store.
///
/// Resolves to `dirs::cache_dir()/searsia/`.
#[must_use]
pub fn cache_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SEARSIA_CACHE_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::cache_dir()
        .map(|d| d.join("searsia"))
        .unwrap_or_else(|| PathBuf::from("/tmp/searsia-cache"))
}
