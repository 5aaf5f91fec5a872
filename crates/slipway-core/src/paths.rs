use crate::error::{Result, SlipwayError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Per-project state directory, relative to the stack file.
pub const SLIPWAY_DIR: &str = ".slipway";

/// Default stack file names, probed in order.
pub const STACK_FILE: &str = "slipway.yaml";
pub const STACK_FILE_ALT: &str = "slipway.yml";

pub fn slipway_dir(root: &Path) -> PathBuf {
    root.join(SLIPWAY_DIR)
}

pub fn volumes_dir(root: &Path) -> PathBuf {
    slipway_dir(root).join("volumes")
}

pub fn runtime_file(root: &Path) -> PathBuf {
    slipway_dir(root).join("runtime.yaml")
}

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap())
}

/// Unit and network names are slugs: lowercase alphanumeric with interior
/// hyphens.
pub fn validate_unit_name(name: &str) -> Result<()> {
    if name_re().is_match(name) {
        Ok(())
    } else {
        Err(SlipwayError::InvalidUnitName(name.to_string()))
    }
}

static VOLUME_RE: OnceLock<Regex> = OnceLock::new();

/// Volume names additionally allow underscores (`postgres_data`).
pub fn validate_volume_name(name: &str) -> Result<()> {
    let re = VOLUME_RE
        .get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9_-]*[a-z0-9])?$").unwrap());
    if re.is_match(name) {
        Ok(())
    } else {
        Err(SlipwayError::InvalidUnitName(name.to_string()))
    }
}
