use crate::config::WorkspaceConfig;
use crate::db;
use crate::flatfile::{FlatMirror, LoadWarning};
use crate::sync::SyncEngine;
use anyhow::Context;
use rusqlite::Connection;
use serde::Serialize;

/// An open workspace: the relational table plus its flat mirror.
pub struct Workspace {
    pub config: WorkspaceConfig,
    pub conn: Connection,
    pub mirror: FlatMirror,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSummary {
    pub rows_read: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub warnings: Vec<LoadWarning>,
}

impl Workspace {
    pub fn open(config: WorkspaceConfig) -> anyhow::Result<Self> {
        let conn = db::open_db(&config.db_path)
            .with_context(|| format!("failed to open {}", config.db_path.to_string_lossy()))?;
        let mirror = FlatMirror::new(config.csv_path.clone());
        Ok(Self {
            config,
            conn,
            mirror,
        })
    }

    /// Mirrors the flat file into the table. Existing student ids are left
    /// alone, so calling this again on the same file adds nothing. An absent
    /// flat file is treated as empty.
    pub fn initialize(&mut self) -> anyhow::Result<InitSummary> {
        let report = self.mirror.load()?;
        for w in &report.warnings {
            log::debug!("[init] line {}: {} {:?}", w.line, w.code, w.column);
        }
        if !report.warnings.is_empty() {
            log::warn!(
                "[init] {}: {} field(s) coerced or rows skipped",
                self.mirror.path().to_string_lossy(),
                report.warnings.len()
            );
        }

        let bulk = db::bulk_insert(&mut self.conn, &report.records)?;
        log::info!(
            "[init] {} rows read, {} inserted, {} already present",
            report.rows_read,
            bulk.inserted,
            bulk.skipped
        );
        Ok(InitSummary {
            rows_read: report.rows_read,
            inserted: bulk.inserted,
            skipped: bulk.skipped,
            warnings: report.warnings,
        })
    }

    pub fn sync(&self) -> SyncEngine<'_> {
        SyncEngine::new(&self.conn, &self.mirror)
    }
}
