use std::{path::Path, path::PathBuf, time::Duration};

use anyhow::Context as _;

use crate::{
    foundation::error::{AvatarError, AvatarResult},
    render::BASE_SIZE,
    source::network::NETWORK_CACHE_CAPACITY,
};

/// Default number of concurrent background fetch workers.
pub const DEFAULT_WORKERS: usize = 10;
/// Default per-job fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Largest accepted avatar edge in pixels.
pub const MAX_AVATAR_SIZE: u32 = 4096;

/// Tunables of an [`crate::AvatarManager`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerOpts {
    /// Concurrent fetch workers.
    pub workers: usize,
    /// Per-job timeout in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Entries retained by each account's network avatar cache.
    pub network_cache_capacity: usize,
    /// Edge length of rendered avatars in pixels.
    pub avatar_size: u32,
    /// Font for generated glyphs. Without one, generated avatars carry no glyph layer.
    pub font_path: Option<PathBuf>,
}

impl Default for ManagerOpts {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            network_cache_capacity: NETWORK_CACHE_CAPACITY,
            avatar_size: BASE_SIZE,
            font_path: None,
        }
    }
}

impl ManagerOpts {
    /// Load options from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> AvatarResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manager options {}", path.display()))?;
        let opts: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse manager options {}", path.display()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Apply `AVATAR_WORKERS`, `AVATAR_FETCH_TIMEOUT_MS` and `AVATAR_CACHE_CAPACITY`.
    ///
    /// Unparseable or zero values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        fn env_positive<T>(name: &str) -> Option<T>
        where
            T: std::str::FromStr + PartialOrd + Default,
        {
            std::env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<T>().ok())
                .filter(|n| *n > T::default())
        }

        if let Some(n) = env_positive("AVATAR_WORKERS") {
            self.workers = n;
        }
        if let Some(ms) = env_positive("AVATAR_FETCH_TIMEOUT_MS") {
            self.fetch_timeout_ms = ms;
        }
        if let Some(n) = env_positive("AVATAR_CACHE_CAPACITY") {
            self.network_cache_capacity = n;
        }
        self
    }

    pub fn validate(&self) -> AvatarResult<()> {
        if self.workers == 0 {
            return Err(AvatarError::validation("workers must be > 0"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(AvatarError::validation("fetch_timeout_ms must be > 0"));
        }
        if self.network_cache_capacity == 0 {
            return Err(AvatarError::validation(
                "network_cache_capacity must be > 0",
            ));
        }
        if self.avatar_size == 0 || self.avatar_size > MAX_AVATAR_SIZE {
            return Err(AvatarError::validation(format!(
                "avatar_size must be in 1..={MAX_AVATAR_SIZE}"
            )));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
