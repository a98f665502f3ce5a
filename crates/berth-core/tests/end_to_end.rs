//! Descriptor file to filesystem and registry, and back.

use std::fs;
use std::sync::Arc;

use berth_core::deployer::{Deployer, DeployerConfig};
use berth_core::descriptor::read_descriptor;
use berth_core::error::DeployError;
use berth_core::registry::FileRegistry;
use tempfile::TempDir;

const DESCRIPTOR: &str = r#"
name = "greeter"

[[item]]
kind = "directory"
path = "/logs"

[[item]]
kind = "configfile"
path = "/etc/${service}.cfg"

[[item]]
kind = "property"
name = "level"
value = "debug"

[[item]]
kind = "property"
name = "${service}.LogDir"
value = "${datadir}/logs"

[[item]]
kind = "offer"
name = "Greeter"
reference = "${service}:tcp -h localhost -p 10000"
"#;

struct Fixture {
    _temp: TempDir,
    root: std::path::PathBuf,
    descriptor: std::path::PathBuf,
    registry: Arc<FileRegistry>,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    // Configuration files never create their parent directory.
    fs::create_dir_all(root.join("etc")).unwrap();

    let descriptor = temp.path().join("greeter.toml");
    fs::write(&descriptor, DESCRIPTOR).unwrap();

    let registry = Arc::new(FileRegistry::new(temp.path().join("offers.json")));
    Fixture {
        root,
        descriptor,
        registry,
        _temp: temp,
    }
}

fn config(fixture: &Fixture) -> DeployerConfig {
    DeployerConfig::new(&fixture.root)
        .with_registry(fixture.registry.clone())
        .with_variable("service", "greeter")
}

#[test]
fn deploy_then_undeploy_round_trip() {
    let fixture = fixture();
    let events = read_descriptor(&fixture.descriptor).unwrap();
    let deployment = Deployer::new(config(&fixture)).parse(events).unwrap();

    let report = deployment.deploy().unwrap();
    assert_eq!(report.applied, 3);

    assert!(fixture.root.join("logs").is_dir());
    let written = fs::read_to_string(fixture.root.join("etc/greeter.cfg")).unwrap();
    let expected = format!(
        "greeter.LogDir={}/logs\nlevel=debug\n",
        fixture.root.to_string_lossy()
    );
    assert_eq!(written, expected);

    let offers = fixture.registry.list().unwrap();
    assert_eq!(
        offers["Greeter"][0].reference,
        "greeter:tcp -h localhost -p 10000"
    );

    let undeploy = deployment.undeploy();
    assert!(undeploy.is_clean());
    assert_eq!(undeploy.reverted, 3);
    assert!(!fixture.root.join("logs").exists());
    assert!(!fixture.root.join("etc/greeter.cfg").exists());
    assert!(fixture.root.join("etc").is_dir());
    assert!(fixture.registry.list().unwrap().is_empty());
}

#[test]
fn second_deploy_fails_and_leaves_first_intact() {
    let fixture = fixture();
    let first = Deployer::new(config(&fixture))
        .parse(read_descriptor(&fixture.descriptor).unwrap())
        .unwrap();
    first.deploy().unwrap();

    let second = Deployer::new(config(&fixture))
        .parse(read_descriptor(&fixture.descriptor).unwrap())
        .unwrap();
    let err = second.deploy().unwrap_err();

    // The directory already exists, so nothing from the second run was applied.
    assert!(matches!(err, DeployError::DeploymentFailed { index: 0, .. }));
    assert!(fixture.root.join("logs").is_dir());
    assert!(fixture.root.join("etc/greeter.cfg").is_file());
    assert_eq!(fixture.registry.list().unwrap()["Greeter"].len(), 1);
}

#[test]
fn undeploy_without_deploy_reports_failures_but_finishes() {
    let fixture = fixture();
    let deployment = Deployer::new(config(&fixture))
        .parse(read_descriptor(&fixture.descriptor).unwrap())
        .unwrap();

    let report = deployment.undeploy();

    assert_eq!(report.reverted, 0);
    assert_eq!(report.already_absent, 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[1].index, 0);
}

const LOGS_AND_CONFIG: &str = r#"
[[item]]
kind = "directory"
path = "/logs"

[[item]]
kind = "configfile"
path = "/etc/app.cfg"

[[item]]
kind = "property"
name = "level"
value = "debug"
"#;

fn logs_and_config(root: &std::path::Path) -> berth_core::deployer::Deployment {
    let descriptor = root.with_extension("toml");
    fs::write(&descriptor, LOGS_AND_CONFIG).unwrap();
    Deployer::new(DeployerConfig::new(root))
        .parse(read_descriptor(&descriptor).unwrap())
        .unwrap()
}

#[test]
fn logs_and_config_deploy_and_undeploy() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    // Configuration files never create their parent directory.
    fs::create_dir_all(root.join("etc")).unwrap();
    let deployment = logs_and_config(&root);

    deployment.deploy().unwrap();
    assert!(root.join("logs").is_dir());
    assert_eq!(
        fs::read_to_string(root.join("etc/app.cfg")).unwrap(),
        "level=debug\n"
    );

    let report = deployment.undeploy();
    assert!(report.is_clean());
    assert!(!root.join("etc/app.cfg").exists());
    assert!(!root.join("logs").exists());
}

#[test]
fn config_file_in_missing_directory_rolls_back() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir_all(&root).unwrap();
    let deployment = logs_and_config(&root);

    let err = deployment.deploy().unwrap_err();

    assert!(matches!(err, DeployError::DeploymentFailed { index: 1, .. }));
    assert!(!root.join("logs").exists());
    assert!(!root.join("etc").exists());
}
