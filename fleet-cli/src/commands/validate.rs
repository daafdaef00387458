//! `fleet validate <spec>` — load a batch spec and report what it contains.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fleet_core::spec;

/// Arguments for `fleet validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the batch spec YAML file.
    pub spec: PathBuf,
}

impl ValidateArgs {
    pub fn run(self) -> Result<()> {
        let spec = spec::load_spec_at(&self.spec)
            .with_context(|| format!("invalid batch spec '{}'", self.spec.display()))?;

        let groups = spec
            .transform_changes
            .as_ref()
            .map_or(0, |t| t.group.len());
        let name = if spec.name.is_empty() {
            self.spec.display().to_string()
        } else {
            spec.name.clone()
        };

        println!("{} {}", "valid".green().bold(), name.bold());
        println!("  steps:             {}", spec.steps.len());
        println!("  workspace rules:   {}", spec.workspaces.len());
        println!("  branch groups:     {groups}");
        println!("  default branch:    {}", spec.changeset_template.branch);
        Ok(())
    }
}
