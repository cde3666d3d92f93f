use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::types::TaskList;

#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("test plan file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("failed to read test plan {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse test plan {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("test plan {path} contains no tasks")]
    Empty { path: PathBuf },
}

pub fn load_task_list(path: &Path) -> Result<TaskList, PlanLoadError> {
    if !path.is_file() {
        return Err(PlanLoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read_to_string(path).map_err(|source| PlanLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let plan = parse_task_list(&raw).map_err(|message| PlanLoadError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    if plan.tasks.is_empty() {
        return Err(PlanLoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    info!(
        path = %path.display(),
        task_count = plan.tasks.len(),
        action_count = plan.action_count(),
        "test_plan_loaded"
    );
    Ok(plan)
}

pub fn parse_task_list(raw: &str) -> Result<TaskList, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, TaskList>(&mut deserializer) {
        Ok(plan) => Ok(plan),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(source.to_string())
            } else {
                Err(format!("at {path}: {source}"))
            }
        }
    }
}
