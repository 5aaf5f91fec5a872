use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use slipway_core::{StackConfig, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the stack as loaded, with variable references resolved
    Show,

    /// Validate the stack file for common mistakes
    Validate,
}

pub fn run(stack_file: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(stack_file, json),
        ConfigSubcommand::Validate => validate(stack_file, json),
    }
}

fn show(stack_file: &Path, json: bool) -> anyhow::Result<()> {
    let stack = StackConfig::load(stack_file).context("failed to load stack file")?;
    if json {
        print_json(&stack)?;
    } else {
        print!("{}", serde_yaml::to_string(&stack)?);
    }
    Ok(())
}

fn validate(stack_file: &Path, json: bool) -> anyhow::Result<()> {
    let loaded = StackConfig::load_reporting(stack_file).context("failed to load stack file")?;
    let mut warnings = loaded.stack.validate();
    for name in &loaded.missing_vars {
        warnings.push(slipway_core::ConfigWarning {
            level: WarnLevel::Warning,
            message: format!("environment variable '{name}' is unset (substituted as empty)"),
        });
    }

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Stack file is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("stack validation found errors");
    }
    Ok(())
}
