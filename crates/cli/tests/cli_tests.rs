//! CLI integration tests

use std::process::{Command, Output};

fn hwctl(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut command = Command::new("cargo");
    command.args(["run", "-q", "-p", "hostwatch-cli", "--"]).args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.output().expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = hwctl(&["--help"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Hostwatch"), "Should show app name");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("model"), "Should show model command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("thresholds"), "Should show thresholds command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = hwctl(&["--version"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("hwctl"), "Should show binary name");
}

#[test]
fn test_model_help() {
    let output = hwctl(&["model", "--help"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("train"), "Should show train subcommand");
    assert!(stdout.contains("inspect"), "Should show inspect subcommand");
}

#[test]
fn test_classify_help() {
    let output = hwctl(&["classify", "--help"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--cpu"), "Should show cpu option");
    assert!(stdout.contains("--memory"), "Should show memory option");
    assert!(stdout.contains("--load"), "Should show load option");
}

#[test]
fn test_classify_requires_all_metrics() {
    let output = hwctl(&["classify", "--cpu", "50"], &[]);
    assert!(!output.status.success(), "Missing metrics should fail");
}

#[test]
fn test_thresholds_from_environment() {
    let output = hwctl(
        &["thresholds", "--format", "json"],
        &[
            ("CPU_ALERT_THRESHOLD", "90"),
            ("MEMORY_ALERT_THRESHOLD", "oops"),
            ("GMAIL_USERNAME", ""),
        ],
    );
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["cpu_threshold"], 90.0);
    assert_eq!(json["memory_threshold"], 80.0);
    assert_eq!(json["load_threshold"], 5.0);
    assert_eq!(json["alerts_enabled"], false);
}

#[test]
fn test_train_inspect_classify_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("models").join("anomaly_model.bin");
    let path = path.to_str().unwrap();
    let envs = [("MODEL_TRAINING_SAMPLES", "300"), ("MODEL_TREES", "25")];

    let output = hwctl(&["model", "train", "--path", path, "--format", "json"], &envs);
    assert!(output.status.success(), "Training should succeed");
    let trained: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(trained["n_trees"], 25);

    let output = hwctl(&["model", "inspect", "--path", path, "--format", "json"], &envs);
    assert!(output.status.success(), "Inspect should succeed");
    let inspected: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(inspected["checksum"], trained["checksum"]);

    let output = hwctl(
        &[
            "classify", "--cpu", "99", "--memory", "98", "--load", "9.5", "--path", path,
            "--format", "json",
        ],
        &envs,
    );
    assert!(output.status.success(), "Classify should succeed");
    let verdict: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(verdict["anomaly_detected"], true);
}
