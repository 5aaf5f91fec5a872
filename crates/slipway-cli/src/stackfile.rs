use slipway_core::{paths, SlipwayError};
use std::path::{Path, PathBuf};

/// Locate the stack file: an explicit `--file` wins, otherwise walk up
/// from the current directory probing `slipway.yaml` then `slipway.yml`.
pub fn resolve(explicit: Option<&Path>) -> Result<PathBuf, SlipwayError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(SlipwayError::StackFileNotFound(path.to_path_buf()));
    }

    let cwd = std::env::current_dir()?;
    let mut dir: &Path = &cwd;
    loop {
        for candidate in [paths::STACK_FILE, paths::STACK_FILE_ALT] {
            let path = dir.join(candidate);
            if path.exists() {
                return Ok(path);
            }
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return Err(SlipwayError::StackFileNotFound(cwd.join(paths::STACK_FILE))),
        }
    }
}

/// Where `init` should write: an explicit `--file` target, or
/// `slipway.yaml` in the current directory.
pub fn init_target(explicit: Option<&Path>) -> Result<PathBuf, SlipwayError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(std::env::current_dir()?.join(paths::STACK_FILE)),
    }
}

/// The project root a stack file governs: its parent directory.
pub fn root_of(stack_file: &Path) -> PathBuf {
    stack_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
