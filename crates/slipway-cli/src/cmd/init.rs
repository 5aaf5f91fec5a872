use anyhow::bail;
use slipway_core::{config, io};
use std::path::Path;

pub fn run(target: &Path) -> anyhow::Result<()> {
    if !io::write_if_missing(target, config::scaffold_yaml())? {
        bail!(
            "{} already exists: remove it first or pass --file to write elsewhere",
            target.display()
        );
    }
    println!("created: {}", target.display());
    println!("Edit the file, then run `slipway up`.");
    Ok(())
}
