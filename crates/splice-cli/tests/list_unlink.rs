//! Integration tests for `splice list` and `splice unlink`.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "splice-cli", "--bin", "splice", "--"]);
    cmd
}

fn write_pkg(dir: &Path, manifest: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("package.json"), manifest).unwrap();
}

fn workspace(root: &Path) {
    fs::write(
        root.join("splice.json"),
        r#"{"projects": [{"folder": "alpha"}, {"folder": "beta", "cyclicDependencies": ["alpha"]}]}"#,
    )
    .unwrap();
    write_pkg(
        &root.join("alpha"),
        r#"{"name": "alpha", "version": "1.0.0", "dependencies": {"lodash": "^4.0.0"}}"#,
    );
    write_pkg(&root.join("beta"), r#"{"name": "beta", "version": "2.0.0"}"#);

    let store = root.join("common/store");
    write_pkg(
        &store.join("@splice-proxy/alpha"),
        r#"{"name": "@splice-proxy/alpha", "version": "0.0.0", "dependencies": {"lodash": "^4.0.0"}}"#,
    );
    write_pkg(
        &store.join("@splice-proxy/beta"),
        r#"{"name": "@splice-proxy/beta", "version": "0.0.0"}"#,
    );
    write_pkg(
        &store.join("lodash"),
        r#"{"name": "lodash", "version": "4.17.21"}"#,
    );
}

#[test]
fn test_list_json_shape() {
    let dir = tempdir().unwrap();
    workspace(dir.path());

    let output = cargo_bin()
        .args(["--json", "list", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run splice list");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|_| panic!("stdout should be valid JSON: {stdout}"));

    assert_eq!(json["ok"], true);
    let projects = json["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 2);
    // Sorted by name
    assert_eq!(projects[0]["name"], "alpha");
    assert_eq!(projects[1]["name"], "beta");
    assert_eq!(projects[1]["cyclicDependencies"][0], "alpha");
}

#[test]
fn test_list_text_output() {
    let dir = tempdir().unwrap();
    workspace(dir.path());

    let output = cargo_bin()
        .args(["list", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run splice list");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Projects (2):"));
    assert!(stdout.contains("alpha @ 1.0.0"));
    assert!(stdout.contains("beta @ 2.0.0"));
}

#[test]
fn test_unlink_after_link() {
    let dir = tempdir().unwrap();
    workspace(dir.path());

    let link = cargo_bin()
        .args(["link", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run splice link");
    assert!(link.status.success());
    assert!(dir.path().join("alpha/node_modules/lodash").exists());
    assert!(dir.path().join("common/splice-link.json").exists());

    let unlink = cargo_bin()
        .args(["--json", "unlink", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run splice unlink");
    assert!(unlink.status.success());

    let stdout = String::from_utf8_lossy(&unlink.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["removed"][0], "alpha");

    assert!(!dir.path().join("alpha/node_modules").exists());
    assert!(!dir.path().join("common/splice-link.json").exists());
}

#[test]
fn test_version_runs() {
    let output = cargo_bin()
        .arg("version")
        .output()
        .expect("Failed to run splice version");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("splice "));
}
