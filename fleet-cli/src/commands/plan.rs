//! `fleet plan` — resolve workspaces from local checkouts and show the tasks
//! a run would execute.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use fleet_core::types::Step;
use fleet_core::{cancellation, spec};
use fleet_workspace::{build_tasks, resolve, CheckoutDirectoryFinder, Task, TaskPlan};

/// Arguments for `fleet plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the batch spec YAML file.
    pub spec: PathBuf,

    /// YAML or JSON list of repositories (`id`, `name`, optional `rev`).
    #[arg(long)]
    pub repos: PathBuf,

    /// Directory holding one checkout per repository, at `<dir>/<repo name>`.
    #[arg(long)]
    pub checkouts: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let spec = spec::load_spec_at(&self.spec)
            .with_context(|| format!("invalid batch spec '{}'", self.spec.display()))?;
        let repos = spec::load_repositories_at(&self.repos)
            .with_context(|| format!("failed to load repositories '{}'", self.repos.display()))?;
        let finder = CheckoutDirectoryFinder::new(&self.checkouts);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let workspaces = runtime.block_on(async {
            let (handle, signal) = cancellation();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("received ctrl-c, cancelling");
                    handle.cancel();
                }
            });
            resolve(&spec, &finder, &repos, &signal).await
        });
        let workspaces = workspaces.context("workspace resolution failed")?;

        let plan = build_tasks(&spec, &repos, &workspaces);
        let failed = plan.failures.len();
        if self.json {
            print_json(&plan)?;
        } else {
            print_table(&plan);
        }

        if failed > 0 {
            bail!("{failed} repositories could not be planned");
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanJson<'a> {
    tasks: &'a [Task],
    failures: Vec<FailureJson>,
}

#[derive(Serialize)]
struct FailureJson {
    repository: String,
    error: String,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "fetch")]
    fetch: &'static str,
    #[tabled(rename = "steps")]
    steps: String,
}

fn print_json(plan: &TaskPlan) -> Result<()> {
    let payload = PlanJson {
        tasks: &plan.tasks,
        failures: plan
            .failures
            .iter()
            .map(|f| FailureJson {
                repository: f.repository.name.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

fn print_table(plan: &TaskPlan) {
    println!(
        "{} tasks | {} failed repositories",
        plan.tasks.len(),
        plan.failures.len()
    );

    if !plan.tasks.is_empty() {
        let rows: Vec<TaskRow> = plan
            .tasks
            .iter()
            .map(|task| TaskRow {
                repository: task.repository.name.clone(),
                path: display_path(&task.path),
                fetch: if task.only_fetch_workspace {
                    "workspace"
                } else {
                    "repository"
                },
                steps: task.steps.iter().map(step_line).collect::<Vec<_>>().join("\n"),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    for failure in &plan.failures {
        println!(
            "{} {}: {}",
            "failed".red().bold(),
            failure.repository.name,
            failure.error
        );
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}

fn step_line(step: &Step) -> String {
    let run = step.run.lines().next().unwrap_or_default();
    match step.condition() {
        Some(cond) => format!("{run} {}", format!("[if {cond}]").yellow()),
        None => run.to_string(),
    }
}
