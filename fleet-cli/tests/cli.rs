//! End-to-end runs of the `fleet` binary.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const SPEC: &str = r#"
name: go-imports
workspaces:
  - in: "github.com/acme/mono"
    rootAtLocationOf: go.mod
    onlyFetchWorkspace: true
steps:
  - run: goimports -w .
    container: golang:1.22
  - run: echo small only
    container: alpine:3
    if: ${{ eq repository.name "github.com/acme/small" }}
transformChanges:
  group:
    - directory: services/api
      branch: go-imports-api
changesetTemplate:
  title: Fix imports
  branch: go-imports
  commit:
    message: Fix imports
"#;

const REPOS: &str = r#"
- id: r1
  name: github.com/acme/mono
- id: r2
  name: github.com/acme/small
"#;

const DIFF: &str = "diff --git a/README.md b/README.md
index 1111111..2222222 100644
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-# Mono
+# Mono!
diff --git a/services/api/main.go b/services/api/main.go
index 1111111..2222222 100644
--- a/services/api/main.go
+++ b/services/api/main.go
@@ -1 +1 @@
-package api
+package main
";

fn fleet_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fleet"));
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, rel: &str, contents: &str) -> String {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, contents).expect("write fixture");
    path.display().to_string()
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_reports_spec_summary() {
    let tmp = TempDir::new().expect("tmp");
    let spec = write(tmp.path(), "batch.yaml", SPEC);

    fleet_cmd()
        .args(["validate", &spec])
        .assert()
        .success()
        .stdout(contains("valid"))
        .stdout(contains("go-imports"))
        .stdout(contains("branch groups:     1"));
}

#[test]
fn validate_rejects_spec_without_steps() {
    let tmp = TempDir::new().expect("tmp");
    let spec = write(tmp.path(), "batch.yaml", "changesetTemplate:\n  branch: x\n");

    fleet_cmd()
        .args(["validate", &spec])
        .assert()
        .failure()
        .stderr(contains("invalid batch spec"))
        .stderr(contains("at least one step"));
}

#[test]
fn validate_missing_file_fails() {
    let tmp = TempDir::new().expect("tmp");
    let missing = tmp.path().join("nope.yaml");

    fleet_cmd()
        .arg("validate")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(contains("not found"));
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

fn plan_fixture(tmp: &TempDir, spec: &str) -> (String, String, String) {
    let spec = write(tmp.path(), "batch.yaml", spec);
    let repos = write(tmp.path(), "repos.yaml", REPOS);
    let checkouts = tmp.path().join("checkouts");
    write(&checkouts, "github.com/acme/mono/services/api/go.mod", "module api\n");
    write(&checkouts, "github.com/acme/mono/services/web/go.mod", "module web\n");
    write(&checkouts, "github.com/acme/small/README.md", "# small\n");
    (spec, repos, checkouts.display().to_string())
}

#[test]
fn plan_json_lists_one_task_per_workspace() {
    let tmp = TempDir::new().expect("tmp");
    let (spec, repos, checkouts) = plan_fixture(&tmp, SPEC);

    let assert = fleet_cmd()
        .args(["plan", &spec, "--repos", &repos, "--checkouts", &checkouts, "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let plan: serde_json::Value = serde_json::from_str(&stdout).expect("plan json");

    let tasks = plan["tasks"].as_array().expect("tasks array");
    let summary: Vec<(&str, &str, usize)> = tasks
        .iter()
        .map(|t| {
            (
                t["repository"]["name"].as_str().expect("name"),
                t["path"].as_str().expect("path"),
                t["steps"].as_array().expect("steps").len(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("github.com/acme/mono", "services/api", 1),
            ("github.com/acme/mono", "services/web", 1),
            ("github.com/acme/small", "", 2),
        ]
    );
    assert_eq!(tasks[0]["onlyFetchWorkspace"], true);
    assert_eq!(tasks[2]["onlyFetchWorkspace"], false);
    assert!(plan["failures"].as_array().expect("failures").is_empty());
}

#[test]
fn plan_table_shows_workspaces() {
    let tmp = TempDir::new().expect("tmp");
    let (spec, repos, checkouts) = plan_fixture(&tmp, SPEC);

    fleet_cmd()
        .args(["plan", &spec, "--repos", &repos, "--checkouts", &checkouts])
        .assert()
        .success()
        .stdout(contains("3 tasks | 0 failed repositories"))
        .stdout(contains("services/web"))
        .stdout(contains("(root)"))
        .stdout(contains("echo small only"));
}

#[test]
fn plan_reports_repositories_that_fail_to_evaluate() {
    let tmp = TempDir::new().expect("tmp");
    let broken = SPEC.replace("eq repository.name", "frobnicate repository.name");
    let (spec, repos, checkouts) = plan_fixture(&tmp, &broken);

    fleet_cmd()
        .args(["plan", &spec, "--repos", &repos, "--checkouts", &checkouts])
        .assert()
        .failure()
        .stdout(contains("failed"))
        .stdout(contains("frobnicate"))
        .stderr(contains("2 repositories could not be planned"));
}

// ---------------------------------------------------------------------------
// group
// ---------------------------------------------------------------------------

#[test]
fn group_json_splits_diff_by_directory() {
    let tmp = TempDir::new().expect("tmp");
    let spec = write(tmp.path(), "batch.yaml", SPEC);
    let diff = write(tmp.path(), "change.diff", DIFF);

    let assert = fleet_cmd()
        .args(["group", &diff, "--spec", &spec, "--repo", "github.com/acme/mono", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let branches: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&stdout).expect("branch json");

    assert_eq!(branches.len(), 2);
    let default = branches["go-imports"].as_str().expect("default diff");
    let api = branches["go-imports-api"].as_str().expect("api diff");
    assert!(default.contains("README.md") && !default.contains("main.go"));
    assert!(api.contains("services/api/main.go") && !api.contains("README.md"));
    assert_eq!(format!("{default}{api}"), DIFF);
}

#[test]
fn group_table_counts_files_per_branch() {
    let tmp = TempDir::new().expect("tmp");
    let spec = write(tmp.path(), "batch.yaml", SPEC);
    let diff = write(tmp.path(), "change.diff", DIFF);

    fleet_cmd()
        .args(["group", &diff, "--spec", &spec, "--repo", "github.com/acme/mono"])
        .assert()
        .success()
        .stdout(contains("go-imports-api"))
        .stdout(contains("services/api/main.go"));
}

#[test]
fn group_rejects_branch_collisions() {
    let tmp = TempDir::new().expect("tmp");
    let colliding = SPEC.replace("branch: go-imports-api", "branch: go-imports");
    let spec = write(tmp.path(), "batch.yaml", &colliding);
    let diff = write(tmp.path(), "change.diff", DIFF);

    fleet_cmd()
        .args(["group", &diff, "--spec", &spec, "--repo", "github.com/acme/mono"])
        .assert()
        .failure()
        .stderr(contains(
            "transformChanges group branch for repository github.com/acme/mono is the same as branch \"go-imports\" in changesetTemplate",
        ));
}

#[test]
fn group_rejects_malformed_diff() {
    let tmp = TempDir::new().expect("tmp");
    let spec = write(tmp.path(), "batch.yaml", SPEC);
    let diff = write(tmp.path(), "change.diff", "this is not a diff\n");

    fleet_cmd()
        .args(["group", &diff, "--spec", &spec, "--repo", "github.com/acme/mono"])
        .assert()
        .failure()
        .stderr(contains("malformed diff at line 1"));
}
