//! Sort configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::budget::MemoryLimit;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Ceiling (in bytes) for the in-memory fast path. Growth beyond this
    /// makes the bounded sort fall back to the external merge sort.
    pub memory_ceiling_bytes: usize,

    /// Runtime memory limit reported by the process monitor. `None` means
    /// unlimited.
    pub runtime_memory_limit_bytes: Option<usize>,

    /// Directory for spill segments (legacy local-path configuration).
    pub spill_dir: String,

    /// Optional fully-qualified cache URI (`file:///tmp/x`, `memory://`).
    pub spill_uri: Option<String>,

    /// Segment compression: `none`, `zstd` or `lz4`.
    pub spill_codec: String,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: 256 * 1024 * 1024, // 256 MiB default
            runtime_memory_limit_bytes: None,
            spill_dir: "/tmp/spillsort".to_string(),
            spill_uri: None,
            spill_codec: "none".to_string(),
        }
    }
}

/// Snapshot consumed by the IO layer to build a chunked cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub uri: Option<String>,
    pub root: String,
    pub codec: String,
}

impl CacheConfig {
    /// Scheme of the configured URI, or `None` for no URI or a bare path.
    pub fn scheme(&self) -> Option<&str> {
        self.uri.as_deref().and_then(uri_scheme)
    }
}

impl SortConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SPILLSORT_MEMORY_CEILING_BYTES`: in-memory ceiling in bytes
    /// - `SPILLSORT_RUNTIME_MEMORY_LIMIT_BYTES`: runtime limit in bytes
    /// - `SPILLSORT_SPILL_DIR`: spill directory
    /// - `SPILLSORT_SPILL_URI`: cache URI
    /// - `SPILLSORT_SPILL_CODEC`: segment codec
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SortConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("SPILLSORT_MEMORY_CEILING_BYTES").and_then(|s| s.parse().ok()) {
            cfg.memory_ceiling_bytes = v;
        }

        if let Some(v) =
            lookup("SPILLSORT_RUNTIME_MEMORY_LIMIT_BYTES").and_then(|s| s.parse().ok())
        {
            cfg.runtime_memory_limit_bytes = Some(v);
        }

        if let Some(s) = lookup("SPILLSORT_SPILL_DIR") {
            cfg.spill_dir = s;
        }

        if let Some(s) = lookup("SPILLSORT_SPILL_URI") {
            cfg.spill_uri = Some(s);
        }

        if let Some(s) = lookup("SPILLSORT_SPILL_CODEC") {
            cfg.spill_codec = s.trim().to_ascii_lowercase();
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.memory_ceiling_bytes == 0 {
            return Err(Error::Config("memory_ceiling_bytes must be > 0".into()));
        }
        if self.runtime_memory_limit_bytes == Some(0) {
            return Err(Error::Config(
                "runtime_memory_limit_bytes must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn runtime_limit(&self) -> MemoryLimit {
        MemoryLimit::from_option(self.runtime_memory_limit_bytes)
    }

    /// Produce a cache configuration snapshot used by the IO layer.
    pub fn cache_config(&self) -> CacheConfig {
        let uri = self.spill_uri.as_deref().map(str::trim);
        let root = match (uri, uri.and_then(uri_scheme)) {
            (Some(uri), Some("file")) => {
                file_uri_to_path(uri).unwrap_or_else(|| self.spill_dir.clone())
            }
            // A bare path is a local spill directory.
            (Some(path), None) if !path.is_empty() => path.to_string(),
            _ => self.spill_dir.clone(),
        };

        CacheConfig {
            uri: self.spill_uri.clone(),
            root,
            codec: self.spill_codec.clone(),
        }
    }
}

fn uri_scheme(uri: &str) -> Option<&str> {
    uri.split_once("://")
        .map(|(scheme, _)| scheme.trim())
        .filter(|s| !s.is_empty())
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}
