//! Step planning and task assembly.

use fleet_core::types::{BatchSpec, RepoId, RepoWorkspace, Repository, Step};
use fleet_workspace::{build_tasks, steps_for_repo};
use rstest::rstest;

fn src_cli() -> Repository {
    Repository::new("repo-id-1", "github.com/sourcegraph/src-cli")
}

fn run(cmd: &str) -> Step {
    Step::new(cmd)
}

fn run_if(cmd: &str, cond: &str) -> Step {
    Step::new(cmd).with_condition(cond)
}

// ---------------------------------------------------------------------------
// steps_for_repo
// ---------------------------------------------------------------------------

#[rstest]
#[case::no_if(vec![run("echo 1")], vec![run("echo 1")])]
#[case::static_true(vec![run_if("echo 1", "true")], vec![run_if("echo 1", "true")])]
#[case::one_of_many_static_true(
    vec![run("echo 1"), run_if("echo 2", "true"), run("echo 3")],
    vec![run("echo 1"), run_if("echo 2", "true"), run("echo 3")]
)]
#[case::static_non_true(vec![run_if("echo 1", "this is not true")], vec![])]
#[case::one_of_many_static_non_true(
    vec![run("echo 1"), run_if("echo 2", "every type system needs generics"), run("echo 3")],
    vec![run("echo 1"), run("echo 3")]
)]
#[case::evaluates_to_true(
    vec![run_if("echo 1", r#"${{ matches repository.name "github.com/sourcegraph/src*" }}"#)],
    vec![run_if("echo 1", r#"${{ matches repository.name "github.com/sourcegraph/src*" }}"#)]
)]
#[case::evaluates_to_false(
    vec![run_if("echo 1", r#"${{ matches repository.name "horse" }}"#)],
    vec![]
)]
#[case::cannot_be_evaluated(
    vec![run_if("echo 1", r#"${{ eq outputs.value "foobar" }}"#)],
    vec![run_if("echo 1", r#"${{ eq outputs.value "foobar" }}"#)]
)]
fn plans_steps(#[case] steps: Vec<Step>, #[case] want: Vec<Step>) {
    let spec = BatchSpec::with_steps(steps);
    assert_eq!(steps_for_repo(&spec, &src_cli()).expect("plan"), want);
}

#[test]
fn planning_is_idempotent() {
    let spec = BatchSpec::with_steps(vec![
        run("echo 1"),
        run_if("echo 2", "every type system needs generics"),
        run_if("echo 3", r#"${{ and (matches repository.name "*src-cli") (eq outputs.x "y") }}"#),
        run_if("echo 4", r#"${{ eq outputs.value "foobar" }}"#),
        run_if("echo 5", "true"),
    ]);
    let once = steps_for_repo(&spec, &src_cli()).expect("plan");
    let twice = steps_for_repo(&BatchSpec::with_steps(once.clone()), &src_cli()).expect("plan");
    assert_eq!(once, twice);
    assert_eq!(once.len(), 4);
}

#[test]
fn malformed_condition_fails_planning() {
    let spec = BatchSpec::with_steps(vec![run_if("echo 1", "${{ eq 1 ")]);
    assert!(steps_for_repo(&spec, &src_cli()).is_err());
}

// ---------------------------------------------------------------------------
// build_tasks
// ---------------------------------------------------------------------------

fn workspace(repo: &str, path: &str, steps: &[Step]) -> RepoWorkspace {
    RepoWorkspace {
        repo_id: RepoId::from(repo),
        path: path.into(),
        steps: steps.to_vec(),
        only_fetch_workspace: !path.is_empty(),
    }
}

#[test]
fn tasks_share_repository_plan_across_workspaces() {
    let steps = vec![
        run("echo 1"),
        run_if("echo 2", r#"${{ matches repository.name "*src-cli" }}"#),
    ];
    let spec = BatchSpec::with_steps(steps.clone());
    let repos = vec![
        src_cli(),
        Repository::new("repo-id-2", "github.com/acme/widgets"),
    ];
    let workspaces = vec![
        workspace("repo-id-1", "a", &steps),
        workspace("repo-id-1", "b", &steps),
        workspace("repo-id-2", "", &steps),
    ];

    let plan = build_tasks(&spec, &repos, &workspaces);
    assert!(plan.failures.is_empty());
    assert_eq!(plan.tasks.len(), 3);
    assert_eq!(plan.tasks[0].steps, steps);
    assert_eq!(plan.tasks[1].steps, steps);
    assert!(plan.tasks[1].only_fetch_workspace);
    assert_eq!(plan.tasks[2].steps, vec![run("echo 1")]);
    assert_eq!(plan.tasks[2].repository.name, "github.com/acme/widgets");
}

#[test]
fn repositories_without_steps_get_no_task() {
    let steps = vec![run_if("echo 1", r#"${{ matches repository.name "*src-cli" }}"#)];
    let spec = BatchSpec::with_steps(steps.clone());
    let repos = vec![src_cli(), Repository::new("repo-id-2", "github.com/acme/widgets")];
    let workspaces = vec![workspace("repo-id-1", "", &steps), workspace("repo-id-2", "", &steps)];

    let plan = build_tasks(&spec, &repos, &workspaces);
    assert_eq!(plan.tasks.len(), 1);
    assert_eq!(plan.tasks[0].repository.id, RepoId::from("repo-id-1"));
}

#[test]
fn evaluation_failure_is_isolated_to_its_repository() {
    let steps = vec![run_if(
        "echo 1",
        r#"${{ eq repository.name "github.com/acme/widgets" 1 }}"#,
    )];
    let spec = BatchSpec::with_steps(steps.clone());
    let repos = vec![
        Repository::new("repo-id-2", "github.com/acme/widgets"),
        src_cli(),
    ];
    let workspaces = vec![workspace("repo-id-2", "", &steps), workspace("repo-id-1", "", &steps)];

    let plan = build_tasks(&spec, &repos, &workspaces);
    // `eq` stops at the first equal operand for widgets, so only src-cli
    // reaches the int comparison.
    assert_eq!(plan.failures.len(), 1);
    assert_eq!(plan.failures[0].repository.id, RepoId::from("repo-id-1"));
    assert_eq!(plan.tasks.len(), 1);
    assert_eq!(plan.tasks[0].repository.id, RepoId::from("repo-id-2"));
}
