use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    /// An external network is assumed to exist and is never created or
    /// removed by the stack.
    #[serde(default)]
    pub external: bool,
}

fn default_driver() -> String {
    "bridge".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            external: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeConfig {
    #[serde(default)]
    pub external: bool,
}

// ---------------------------------------------------------------------------
// VolumeStore
// ---------------------------------------------------------------------------

/// Host-side backing store for named volumes. Each volume is a directory
/// under `.slipway/volumes/<name>` that survives `down` unless volumes are
/// explicitly removed.
#[derive(Debug, Clone)]
pub struct VolumeStore {
    base: PathBuf,
}

impl VolumeStore {
    pub fn new(root: &Path) -> Self {
        Self {
            base: paths::volumes_dir(root),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_dir()
    }

    /// Create the volume's backing directory if needed and return its path.
    pub fn ensure(&self, name: &str) -> Result<PathBuf> {
        let path = self.path(name);
        crate::io::ensure_dir(&path)?;
        Ok(path)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        }
        Ok(())
    }
}
