use std::path::{Path, PathBuf};

pub const DEFAULT_CSV_FILE: &str = "student_commute.csv";
pub const DEFAULT_DB_FILE: &str = "commute.sqlite3";

pub const ENV_WORKSPACE: &str = "COMMUTED_WORKSPACE";
pub const ENV_CSV_FILE: &str = "COMMUTED_CSV_FILE";
pub const ENV_DB_FILE: &str = "COMMUTED_DB_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
}

fn resolve(root: &Path, name: Option<&str>, default: &str) -> PathBuf {
    match name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(n) => root.join(n),
        None => root.join(default),
    }
}

impl WorkspaceConfig {
    /// Relative file names resolve against `root`; absolute ones are kept as-is.
    pub fn new(root: impl Into<PathBuf>, csv_file: Option<&str>, db_file: Option<&str>) -> Self {
        let root = root.into();
        Self {
            csv_path: resolve(&root, csv_file, DEFAULT_CSV_FILE),
            db_path: resolve(&root, db_file, DEFAULT_DB_FILE),
            root,
        }
    }

    pub fn from_params(params: &serde_json::Value) -> Option<Self> {
        let path = params
            .get("path")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some(Self::new(
            path,
            params.get("csvFile").and_then(|v| v.as_str()),
            params.get("dbFile").and_then(|v| v.as_str()),
        ))
    }

    /// Bootstrap workspace from the environment, if one is configured.
    pub fn from_env() -> Option<Self> {
        let root = std::env::var(ENV_WORKSPACE).ok()?;
        if root.trim().is_empty() {
            return None;
        }
        let csv = std::env::var(ENV_CSV_FILE).ok();
        let db = std::env::var(ENV_DB_FILE).ok();
        Some(Self::new(root.trim(), csv.as_deref(), db.as_deref()))
    }
}
