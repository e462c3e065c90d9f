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

fn json_of(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

fn add_task(store_path: &Path, title: &str) -> String {
    let payload = json_of(&run(store_path, &["task", "add", title, "--json"]));
    payload["id"].as_str().expect("task id").to_string()
}

#[test]
fn target_set_then_show() {
    let store_path = temp_path("cli-target.json");

    let set = run(
        &store_path,
        &["target", "set", "1000", "2099-12-31", "--start", "250"],
    );
    assert!(set.status.success());
    assert!(String::from_utf8_lossy(&set.stdout).contains("Target set: $1,000.00 by 12/31/2099"));

    let shown = json_of(&run(&store_path, &["target", "show", "--json"]));
    let plain = run(&store_path, &["target", "show"]);
    std::fs::remove_file(&store_path).ok();

    assert_eq!(shown["target_amount"].as_f64(), Some(1000.0));
    assert_eq!(shown["start_amount"].as_f64(), Some(250.0));
    assert_eq!(shown["target_date"], "2099-12-31T00:00:00Z");
    assert!(shown["id"].as_str().unwrap().starts_with("target-"));

    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("Start: $250.00"));
    assert!(stdout.contains("Daily rate: $"));
}

#[test]
fn target_set_rejects_past_date_and_bad_amount() {
    let store_path = temp_path("cli-target-invalid.json");

    let past = run(&store_path, &["target", "set", "1000", "2000-01-01"]);
    let zero = run(&store_path, &["target", "set", "0", "2099-12-31"]);
    let garbled = run(&store_path, &["target", "set", "lots", "2099-12-31"]);

    assert!(!past.status.success());
    assert_eq!(
        String::from_utf8_lossy(&past.stderr).trim(),
        "ERROR: invalid_input - target date must be in the future"
    );
    assert_eq!(
        String::from_utf8_lossy(&zero.stderr).trim(),
        "ERROR: invalid_input - target amount must be positive"
    );
    assert_eq!(
        String::from_utf8_lossy(&garbled.stderr).trim(),
        "ERROR: invalid_input - target amount must be a number"
    );
    assert!(!store_path.exists());
}

#[test]
fn task_add_requires_target() {
    let store_path = temp_path("cli-task-no-target.json");
    let output = run(&store_path, &["task", "add", "Run"]);

    assert!(!output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "ERROR: invalid_input - no target set"
    );
}

#[test]
fn task_list_empty_message() {
    let store_path = temp_path("cli-task-empty.json");
    run(&store_path, &["target", "set", "500", "2099-12-31"]);

    let output = run(&store_path, &["task", "list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No non-negotiables yet."));
}

#[test]
fn tasks_can_be_added_moved_and_removed() {
    let store_path = temp_path("cli-task-lifecycle.json");
    run(&store_path, &["target", "set", "500", "2099-12-31"]);

    let run_id = add_task(&store_path, "Run");
    let read_id = add_task(&store_path, "Read 20 pages");
    let save_id = add_task(&store_path, "No takeout");

    let moved = json_of(&run(&store_path, &["task", "move", &save_id, "1", "--json"]));
    assert_eq!(
        moved,
        serde_json::json!([save_id.clone(), run_id.clone(), read_id.clone()])
    );

    let removed = json_of(&run(&store_path, &["task", "remove", &run_id, "--json"]));
    assert_eq!(removed["active"], false);

    let listed = json_of(&run(&store_path, &["task", "list", "--json"]));
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|view| view["task"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["No takeout", "Read 20 pages"]);

    let table = run(&store_path, &["task", "list"]);
    let table = String::from_utf8_lossy(&table.stdout);
    assert!(table.contains("Non-negotiable"));
    assert!(table.contains("Read 20 pages"));
    assert!(!table.contains(" Run "));

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert_eq!(stored["schema_version"], 1);
    assert_eq!(stored["tasks"].as_array().unwrap().len(), 3);
    let kept = stored["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|task| task["id"] == run_id.as_str())
        .expect("removed task kept");
    assert_eq!(kept["active"], false);
}

#[test]
fn task_errors_are_reported() {
    let store_path = temp_path("cli-task-errors.json");
    run(&store_path, &["target", "set", "500", "2099-12-31"]);
    let id = add_task(&store_path, "Run");

    let out_of_range = run(&store_path, &["task", "move", &id, "4"]);
    let missing = run(&store_path, &["task", "remove", "nn-missing"]);
    run(&store_path, &["task", "remove", &id]);
    let twice = run(&store_path, &["task", "remove", &id]);
    std::fs::remove_file(&store_path).ok();

    assert_eq!(
        String::from_utf8_lossy(&out_of_range.stderr).trim(),
        "ERROR: invalid_input - position must be between 1 and 1"
    );
    assert_eq!(
        String::from_utf8_lossy(&missing.stderr).trim(),
        "ERROR: not_found - task not found: nn-missing"
    );
    assert_eq!(
        String::from_utf8_lossy(&twice.stderr).trim(),
        "ERROR: invalid_input - task was removed"
    );
}
