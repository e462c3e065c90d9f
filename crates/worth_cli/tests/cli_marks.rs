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

fn setup(store_path: &Path, titles: &[&str]) -> Vec<String> {
    let target = run(store_path, &["target", "set", "1000", "2099-12-31"]);
    assert!(target.status.success());

    titles
        .iter()
        .map(|title| {
            let output = run(store_path, &["task", "add", title, "--json"]);
            let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
            payload["id"].as_str().unwrap().to_string()
        })
        .collect()
}

fn stored(store_path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(store_path).unwrap()).unwrap()
}

#[test]
fn done_records_completion_for_today() {
    let store_path = temp_path("cli-done.json");
    let ids = setup(&store_path, &["Run"]);

    let output = run(&store_path, &["done", &ids[0], "-m", "5k before work"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Completed task:"));

    let listed = run(&store_path, &["task", "list"]);
    let records = stored(&store_path);
    std::fs::remove_file(&store_path).ok();

    let table = String::from_utf8_lossy(&listed.stdout);
    assert!(table.contains("done"));
    assert!(table.contains("5k before work"));

    let completions = records["completions"].as_array().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0]["task_id"], ids[0].as_str());
    assert_eq!(completions[0]["status"], "completed");
    assert_eq!(completions[0]["note"], "5k before work");
    assert_eq!(completions[0]["date"].as_str().unwrap().len(), 10);
}

#[test]
fn marking_again_replaces_the_days_mark() {
    let store_path = temp_path("cli-remark.json");
    let ids = setup(&store_path, &["Run"]);

    run(&store_path, &["done", &ids[0]]);
    let missed = run(&store_path, &["miss", &ids[0], "-m", "sick", "--json"]);
    let records = stored(&store_path);
    std::fs::remove_file(&store_path).ok();

    let payload: serde_json::Value = serde_json::from_slice(&missed.stdout).unwrap();
    assert_eq!(payload["status"], "missed");
    assert_eq!(payload["note"], "sick");

    let completions = records["completions"].as_array().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0]["status"], "missed");
}

#[test]
fn note_and_clear_work_on_todays_mark() {
    let store_path = temp_path("cli-note-clear.json");
    let ids = setup(&store_path, &["Read"]);

    let unmarked_note = run(&store_path, &["note", &ids[0], "chapter 3"]);
    assert!(!unmarked_note.status.success());
    assert_eq!(
        String::from_utf8_lossy(&unmarked_note.stderr).trim(),
        "ERROR: invalid_input - task is not marked today"
    );

    run(&store_path, &["done", &ids[0]]);
    let noted = run(&store_path, &["note", &ids[0], "chapter 3"]);
    assert!(noted.status.success());
    assert_eq!(stored(&store_path)["completions"][0]["note"], "chapter 3");

    let cleared = run(&store_path, &["clear", &ids[0]]);
    assert!(cleared.status.success());
    assert!(String::from_utf8_lossy(&cleared.stdout).contains("Cleared task:"));
    assert!(
        stored(&store_path)["completions"]
            .as_array()
            .unwrap()
            .is_empty()
    );

    let again = run(&store_path, &["clear", &ids[0]]);
    std::fs::remove_file(&store_path).ok();
    assert!(!again.status.success());
}

#[test]
fn marking_unknown_task_is_not_found() {
    let store_path = temp_path("cli-done-missing.json");
    setup(&store_path, &["Run"]);

    let output = run(&store_path, &["done", "nn-nope"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "ERROR: not_found - task not found: nn-nope"
    );
}

#[test]
fn marking_removed_task_is_rejected() {
    let store_path = temp_path("cli-done-removed.json");
    let ids = setup(&store_path, &["Run"]);
    run(&store_path, &["task", "remove", &ids[0]]);

    let output = run(&store_path, &["miss", &ids[0]]);
    std::fs::remove_file(&store_path).ok();

    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "ERROR: invalid_input - task was removed"
    );
}

#[test]
fn status_today_counts_marks() {
    let store_path = temp_path("cli-status-today.json");
    let ids = setup(&store_path, &["Run", "Read", "Stretch"]);

    run(&store_path, &["done", &ids[0]]);
    run(&store_path, &["miss", &ids[1]]);

    let output = run(&store_path, &["status", "--json"]);
    std::fs::remove_file(&store_path).ok();

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["today"]["done"], 1);
    assert_eq!(payload["today"]["missed"], 1);
    assert_eq!(payload["today"]["total"], 3);
    assert_eq!(payload["day_number"], 1);
    assert!(payload["adjusted_date"].is_null());
    assert!(payload["worth"].as_f64().unwrap() > 0.0);
}

#[test]
fn day_view_for_today_shows_marks() {
    let store_path = temp_path("cli-day-today.json");
    let ids = setup(&store_path, &["Run", "Read"]);
    run(&store_path, &["done", &ids[0], "-m", "easy pace"]);

    let today = time::OffsetDateTime::now_utc().date().to_string();
    let output = run(&store_path, &["day", &today]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Day 1 - Today"));
    assert!(stdout.contains("[x] Run (easy pace)"));
    assert!(stdout.contains("[ ] Read"));
}
