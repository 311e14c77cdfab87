//! Remote storage configuration
//!
//! One explicit [`RemoteStorageConfig`] is constructed per storage engine and
//! passed by value into [`crate::sync::RemoteStorage`]. The engine itself
//! holds no global state.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

fn default_secure() -> bool {
    true
}

fn default_local_base_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Connection and scoping parameters for one remote storage bucket
///
/// `base_path` is the logical subtree prefix within the bucket; all push,
/// pull, and delete operations are scoped to it. For the bundled `local`
/// provider ([`crate::storage::fs::FsBackend`]), `key` is the root directory
/// under which buckets live.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteStorageConfig {
    /// Storage provider name, e.g. "s3", "azure_blobs", "google_storage", "local"
    pub provider: String,
    /// Bucket (container) name
    pub bucket: String,
    /// Access key; root directory for the `local` provider
    #[serde(default)]
    pub key: String,
    /// Access secret; never printed
    #[serde(default)]
    pub secret: String,
    /// Provider region, if any
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint host override, if any
    #[serde(default)]
    pub host: Option<String>,
    /// Endpoint port override, if any
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether to connect over TLS
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// Base path within the bucket scoping all operations (linux-style separators)
    #[serde(default)]
    pub base_path: String,
    /// Local directory that mirrors the remote base path
    #[serde(default = "default_local_base_dir")]
    pub local_base_dir: PathBuf,
}

impl RemoteStorageConfig {
    /// Create a configuration with defaults for everything but provider and bucket
    #[must_use]
    pub fn new(provider: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            bucket: bucket.into(),
            key: String::new(),
            secret: String::new(),
            region: None,
            host: None,
            port: None,
            secure: true,
            base_path: String::new(),
            local_base_dir: default_local_base_dir(),
        }
    }

    /// Load a configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Base path with surrounding whitespace and leading slashes removed
    ///
    /// Some backends (e.g. GCS) refuse to list paths starting with "/".
    #[must_use]
    pub fn normalized_base_path(&self) -> &str {
        self.base_path.trim().trim_start_matches('/')
    }
}

impl fmt::Debug for RemoteStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStorageConfig")
            .field("provider", &self.provider)
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("region", &self.region)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("base_path", &self.base_path)
            .field("local_base_dir", &self.local_base_dir)
            .finish()
    }
}
