//! Install orchestration against an in-memory registry and a real temp
//! filesystem.
//!
//! Covers fresh installs, re-installs over an existing registration, per
//! definition skips and best-effort continuation after wrapper failures.

mod support;

use std::fs;

use support::{FakeRegistry, Fixture, FlakyTree, write_file};
use svcdeploy_core::error::{DeployError, Severity};
use svcdeploy_core::orchestration::{InstallOrchestrator, Step};

fn orchestrator<'a>(
    tree: &'a FlakyTree,
    registry: &'a FakeRegistry,
    fixture: &Fixture,
) -> InstallOrchestrator<'a> {
    InstallOrchestrator::new(tree, registry, registry, fixture.config.timings())
}

// =========================================================================
// Happy Path
// =========================================================================

#[test]
fn fresh_install_registers_configures_and_starts() {
    let fixture = Fixture::new(&["A"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    assert!(run.succeeded);
    assert!(registry.is_running("A"));
    assert_eq!(
        registry.calls(),
        vec![
            "query A",
            "register A",
            "set-app-directory A",
            "set-auto-start A",
            "start A",
        ]
    );
    assert!(fixture.destination("A").join("A.exe").is_file());
    assert!(
        fixture
            .destination("A")
            .join("config")
            .join("settings.json")
            .is_file()
    );
}

#[test]
fn register_is_called_exactly_once_without_prior_registration() {
    let fixture = Fixture::new(&["A", "B"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();

    orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    assert_eq!(registry.count("register A"), 1);
    assert_eq!(registry.count("register B"), 1);
    assert_eq!(registry.count("unregister A"), 0);
    assert_eq!(registry.count("stop A"), 0);
}

#[test]
fn install_twice_converges_to_same_state() {
    let fixture = Fixture::new(&["A"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();
    let orch = orchestrator(&tree, &registry, &fixture);

    let first = orch.install_all(&fixture.config);
    let second = orch.install_all(&fixture.config);

    assert!(first.succeeded);
    assert!(second.succeeded);
    assert!(registry.is_running("A"));

    // Second run tears the running registration down before re-registering.
    let report = second.definition("A").unwrap();
    assert!(report.ran(Step::Stop));
    assert!(report.ran(Step::Unregister));
    assert_eq!(registry.count("register A"), 2);
    assert_eq!(registry.count("unregister A"), 1);
}

#[test]
fn stopped_registration_is_unregistered_without_stop() {
    let fixture = Fixture::new(&["A"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new().with_service("A", false);

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    assert!(run.succeeded);
    assert_eq!(registry.count("stop A"), 0);
    assert_eq!(registry.count("unregister A"), 1);
    assert!(registry.is_running("A"));
}

#[test]
fn staging_replaces_stale_files() {
    let fixture = Fixture::new(&["A"]);
    let stale = fixture.destination("A").join("old-build.dll");
    write_file(&stale, "stale");
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();

    orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    assert!(!stale.exists(), "stale file should not survive staging");
    assert!(fixture.destination("A").join("A.exe").is_file());
}

// =========================================================================
// Skips and Continuation
// =========================================================================

#[test]
fn missing_source_skips_definition_and_continues() {
    let fixture = Fixture::new(&["A", "B"]);
    fs::remove_dir_all(fixture.source("A")).unwrap();
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    let a = run.definition("A").unwrap();
    assert!(a.skipped);
    assert!(matches!(
        a.issues[0].error,
        DeployError::MissingSource { .. }
    ));
    assert!(!a.ran(Step::Register));
    assert!(!registry.is_registered("A"));

    let b = run.definition("B").unwrap();
    assert!(b.succeeded());
    assert!(registry.is_running("B"));

    assert!(!run.succeeded, "final status is the AND of all definitions");
}

#[test]
fn file_at_source_path_keeps_deployed_payload() {
    let fixture = Fixture::new(&["A"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();
    assert!(
        orchestrator(&tree, &registry, &fixture)
            .install_all(&fixture.config)
            .succeeded
    );

    fs::remove_dir_all(fixture.source("A")).unwrap();
    write_file(&fixture.source("A"), "not a directory");

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    let a = run.definition("A").unwrap();
    assert!(a.skipped);
    assert_eq!(a.issues[0].error.kind(), "missing_source");
    assert!(!a.ran(Step::Stage));
    assert!(fixture.destination("A").join("A.exe").is_file());
    assert!(registry.is_running("A"));
}

#[test]
fn unknown_registry_status_is_warned_and_install_proceeds() {
    let fixture = Fixture::new(&["A"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();
    registry.query_fails_for("A");

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    let a = run.definition("A").unwrap();
    let warnings: Vec<_> = a.warnings().collect();
    assert!(
        warnings
            .iter()
            .any(|w| matches!(w.error, DeployError::RegistryQueryFailure { .. }))
    );
    // Teardown was attempted on the assumption the service exists; its
    // failures do not count against the definition.
    assert_eq!(registry.count("stop A"), 1);
    assert_eq!(registry.count("unregister A"), 1);
    assert!(a.succeeded());
    assert!(registry.is_running("A"));
}

#[test]
fn wrapper_failure_is_logged_and_later_steps_still_run() {
    let fixture = Fixture::new(&["A"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();
    registry.fail("set-app-directory A");

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    let a = run.definition("A").unwrap();
    assert!(!a.succeeded());
    assert!(!a.skipped);
    assert!(a.ran(Step::SetAutoStart));
    assert!(a.ran(Step::Start));
    let error = a.errors().next().unwrap();
    assert_eq!(error.severity, Severity::Error);
    assert!(matches!(
        error.error,
        DeployError::WrapperCommandFailure { .. }
    ));
    assert!(!run.succeeded);
}

#[test]
fn start_failure_fails_definition() {
    let fixture = Fixture::new(&["A", "B"]);
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();
    registry.fail("start A");

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    let a = run.definition("A").unwrap();
    assert!(matches!(
        a.errors().next().unwrap().error,
        DeployError::ServiceCommandFailure { .. }
    ));
    assert!(run.definition("B").unwrap().succeeded());
    assert_eq!(run.failed_definitions().count(), 1);
}

#[test]
fn missing_executable_is_a_warning() {
    let fixture = Fixture::new(&["A"]);
    fs::remove_file(fixture.source("A").join("A.exe")).unwrap();
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);

    let a = run.definition("A").unwrap();
    assert!(
        a.warnings()
            .any(|w| matches!(w.error, DeployError::MissingExecutable { .. }))
    );
    assert!(a.ran(Step::Register));
    assert!(run.succeeded);
}

#[test]
fn run_report_serializes_for_json_output() {
    let fixture = Fixture::new(&["A"]);
    fs::remove_dir_all(fixture.source("A")).unwrap();
    let tree = FlakyTree::new();
    let registry = FakeRegistry::new();

    let run = orchestrator(&tree, &registry, &fixture).install_all(&fixture.config);
    let value = serde_json::to_value(&run).unwrap();

    assert_eq!(value["action"], "install");
    assert_eq!(value["succeeded"], false);
    assert_eq!(value["definitions"][0]["name"], "A");
    assert_eq!(value["definitions"][0]["issues"][0]["kind"], "missing_source");
    assert_eq!(value["definitions"][0]["issues"][0]["severity"], "error");
}
