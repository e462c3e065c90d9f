use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("worthmeter-{nanos}-{file_name}"))
}

fn run(store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_worthmeter"))
        .args(args)
        .env("WORTHMETER_STORE_PATH", store_path)
        .env("WORTHMETER_CONFIG_PATH", temp_path("missing-config.json"))
        .env("TZ", "UTC")
        .output()
        .expect("failed to run worthmeter")
}

#[test]
fn help_lists_commands() {
    let store_path = temp_path("cli-help.json");
    let output = run(&store_path, &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status"));
    assert!(stdout.contains("penalty"));
    assert!(stdout.contains("watch"));
    assert!(!store_path.exists());
}

#[test]
fn unknown_command_reports_invalid_input() {
    let store_path = temp_path("cli-unknown.json");
    let output = run(&store_path, &["bogus"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("ERROR: invalid_input - "), "{stderr}");
}

#[test]
fn status_without_target_shows_zero_worth() {
    let store_path = temp_path("cli-status-empty.json");
    let output = run(&store_path, &["status"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Current Worth: $0.00"));
    assert!(stdout.contains("No target set"));
}

#[test]
fn status_json_without_target_is_zero() {
    let store_path = temp_path("cli-status-empty-json.json");
    let output = run(&store_path, &["status", "--json"]);

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["worth"].as_f64(), Some(0.0));
    assert!(payload["target"].is_null());
    assert!(payload["adjusted_date"].is_null());
    assert!(payload["day_number"].is_null());
}

#[test]
fn corrupt_store_is_reported() {
    let store_path = temp_path("cli-corrupt.json");
    std::fs::write(&store_path, "{ not json").unwrap();

    let output = run(&store_path, &["status"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("ERROR: invalid_data - "), "{stderr}");
}
