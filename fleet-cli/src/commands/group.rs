//! `fleet group` — show how `transformChanges` would split a diff into
//! branches for one repository.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use fleet_changes::{group_file_diffs, parse_file_diffs, validate_groups};
use fleet_core::spec;

/// Arguments for `fleet group`.
#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Unified diff to partition (as produced by `git diff`).
    pub diff: PathBuf,

    /// Path to the batch spec YAML file.
    #[arg(long)]
    pub spec: PathBuf,

    /// Repository name the diff belongs to, e.g. `github.com/acme/widgets`.
    #[arg(long)]
    pub repo: String,

    /// Emit a JSON object mapping each branch to its diff.
    #[arg(long)]
    pub json: bool,
}

impl GroupArgs {
    pub fn run(self) -> Result<()> {
        let spec = spec::load_spec_at(&self.spec)
            .with_context(|| format!("invalid batch spec '{}'", self.spec.display()))?;
        let diff = std::fs::read_to_string(&self.diff)
            .with_context(|| format!("failed to read diff '{}'", self.diff.display()))?;

        let default_branch = &spec.changeset_template.branch;
        let groups = spec.groups_for_repository(&self.repo);
        validate_groups(&self.repo, default_branch, &groups)?;

        let by_branch = group_file_diffs(&self.repo, &diff, default_branch, &groups)
            .with_context(|| format!("failed to split '{}'", self.diff.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&by_branch)
                    .context("failed to serialize branch JSON")?
            );
            return Ok(());
        }
        print_table(&by_branch)
    }
}

#[derive(Tabled)]
struct BranchRow {
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "files")]
    files: usize,
    #[tabled(rename = "paths")]
    paths: String,
}

fn print_table(by_branch: &BTreeMap<String, String>) -> Result<()> {
    let mut rows = Vec::with_capacity(by_branch.len());
    for (branch, diff) in by_branch {
        let files = parse_file_diffs(diff)?;
        rows.push(BranchRow {
            branch: branch.clone(),
            files: files.len(),
            paths: files
                .iter()
                .map(|f| f.path.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        });
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
