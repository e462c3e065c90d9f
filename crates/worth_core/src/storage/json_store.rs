use crate::config;
use crate::error::AppError;
use crate::model::{DailyCompletion, NonNegotiable, Penalty, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "records.json";
const STORE_ENV_VAR: &str = "WORTHMETER_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecords {
    schema_version: u32,
    #[serde(default)]
    targets: Vec<Target>,
    #[serde(default)]
    tasks: Vec<NonNegotiable>,
    #[serde(default)]
    completions: Vec<DailyCompletion>,
    #[serde(default)]
    penalties: Vec<Penalty>,
}

/// Every record kind the application persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordState {
    pub targets: Vec<Target>,
    pub tasks: Vec<NonNegotiable>,
    pub completions: Vec<DailyCompletion>,
    pub penalties: Vec<Penalty>,
}

impl RecordState {
    /// Most recently created target.
    pub fn current_target(&self) -> Option<&Target> {
        self.targets.iter().max_by_key(|target| target.created_at)
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    config::user_file(STORE_ENV_VAR, STORE_FILE_NAME)
}

pub fn load_state(path: &Path) -> Result<RecordState, AppError> {
    if !path.exists() {
        log::debug!("no record store at {}, starting empty", path.display());
        return Ok(RecordState::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let stored: StoredRecords =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    let task_ids: HashSet<&str> = stored.tasks.iter().map(|task| task.id.as_str()).collect();
    if let Some(orphan) = stored
        .completions
        .iter()
        .find(|completion| !task_ids.contains(completion.task_id.as_str()))
    {
        return Err(AppError::invalid_data(format!(
            "completion references unknown task: {}",
            orphan.task_id
        )));
    }

    log::debug!(
        "loaded {} targets, {} tasks, {} completions, {} penalties from {}",
        stored.targets.len(),
        stored.tasks.len(),
        stored.completions.len(),
        stored.penalties.len(),
        path.display()
    );

    Ok(RecordState {
        targets: stored.targets,
        tasks: stored.tasks,
        completions: stored.completions,
        penalties: stored.penalties,
    })
}

pub fn save_state(path: &Path, state: &RecordState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredRecords {
        schema_version: SCHEMA_VERSION,
        targets: state.targets.clone(),
        tasks: state.tasks.clone(),
        completions: state.completions.clone(),
        penalties: state.penalties.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    log::debug!("saved record store to {}", path.display());
    Ok(())
}
