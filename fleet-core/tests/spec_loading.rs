//! Batch spec and repository-list loading from disk.

use assert_fs::prelude::*;
use fleet_core::{
    spec,
    types::{Group, Step},
    SpecError,
};

const FULL_SPEC: &str = r#"
name: go-imports
description: Fix imports across services
workspaces:
  - in: "github.com/acme/*"
    rootAtLocationOf: go.mod
    onlyFetchWorkspace: true
steps:
  - run: goimports -w .
    container: golang:1.22
    env:
      GOFLAGS: -mod=mod
  - run: echo done
    container: alpine:3
    if: ${{ matches repository.name "github.com/acme/*" }}
transformChanges:
  group:
    - directory: services/api
      branch: go-imports-api
    - directory: services/web
      branch: go-imports-web
      repository: github.com/acme/monorepo
changesetTemplate:
  title: Fix imports
  body: Automated change
  branch: go-imports
  commit:
    message: Fix imports
    author:
      name: Fleet Bot
      email: bot@example.com
  published: false
"#;

// ---------------------------------------------------------------------------
// 1. Spec files
// ---------------------------------------------------------------------------

#[test]
fn loads_full_spec_from_disk() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("batch.yaml");
    file.write_str(FULL_SPEC).expect("write");

    let spec = spec::load_spec_at(file.path()).expect("load");
    assert_eq!(spec.name, "go-imports");
    assert_eq!(spec.workspaces.len(), 1);
    assert!(spec.workspaces[0].only_fetch_workspace);
    assert_eq!(spec.workspaces[0].root_at_location_of, "go.mod");
    assert_eq!(spec.steps[0].env.get("GOFLAGS").map(String::as_str), Some("-mod=mod"));
    assert_eq!(
        spec.steps[1].condition(),
        Some(r#"${{ matches repository.name "github.com/acme/*" }}"#)
    );
    assert_eq!(spec.changeset_template.branch, "go-imports");
    assert_eq!(
        spec.changeset_template.commit.author.as_ref().map(|a| a.email.as_str()),
        Some("bot@example.com")
    );

    let groups = &spec.transform_changes.as_ref().expect("transform").group;
    assert_eq!(groups[0], Group::new("services/api", "go-imports-api"));
    assert_eq!(groups[1].repository.as_deref(), Some("github.com/acme/monorepo"));
}

#[test]
fn corrupt_spec_reports_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("broken.yaml");
    file.write_str("steps: [unclosed").expect("write");

    let err = spec::load_spec_at(file.path()).unwrap_err();
    assert!(matches!(err, SpecError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.yaml"));
}

#[test]
fn wrong_shape_spec_is_a_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("list.yaml");
    file.write_str("- this is a list, not a mapping\n").expect("write");

    let err = spec::load_spec_at(file.path()).unwrap_err();
    assert!(matches!(err, SpecError::Parse { .. }), "got: {err}");
}

#[test]
fn empty_group_branch_is_invalid() {
    let yaml = FULL_SPEC.replace("branch: go-imports-api", "branch: \"\"");
    let err = spec::parse_spec(&yaml).unwrap_err();
    assert!(err.to_string().contains("services/api"), "got: {err}");
}

#[test]
fn spec_roundtrips_through_yaml() {
    let spec = spec::parse_spec(FULL_SPEC).expect("parse");
    let yaml = serde_yaml::to_string(&spec).expect("serialize");
    let again = spec::parse_spec(&yaml).expect("reparse");
    assert_eq!(spec, again);
    assert_eq!(again.steps[0], {
        let mut s = Step::new("goimports -w .").with_container("golang:1.22");
        s.env.insert("GOFLAGS".into(), "-mod=mod".into());
        s
    });
}

// ---------------------------------------------------------------------------
// 2. Repository lists
// ---------------------------------------------------------------------------

#[test]
fn loads_repository_list() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("repos.yaml");
    file.write_str(
        "- id: repo-id-0\n  name: github.com/acme/widgets\n  rev: deadbeef\n  fileMatches: [go.mod]\n\
         - id: repo-id-1\n  name: github.com/acme/gadgets\n",
    )
    .expect("write");

    let repos = spec::load_repositories_at(file.path()).expect("load");
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].rev.as_deref(), Some("deadbeef"));
    assert_eq!(repos[0].file_matches, vec!["go.mod".to_string()]);
    assert!(repos[1].file_matches.is_empty());
}

#[test]
fn corrupt_repository_list_reports_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("repos.yaml");
    file.write_str("id: not-a-list\n").expect("write");

    let err = spec::load_repositories_at(file.path()).unwrap_err();
    assert!(matches!(err, SpecError::RepositoryParse { .. }), "got: {err}");
    assert!(err.to_string().contains("repos.yaml"));
    assert!(err.to_string().contains("repository list"), "got: {err}");
}
