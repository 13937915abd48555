//! Keeps the flat mirror and the relational table in lockstep for single
//! record adds and deletes. Bulk load bypasses this module.
//!
//! Writes go to the table first, then the mirror. The two writes are not
//! atomic: a crash between them leaves the stores disagreeing, and nothing
//! here detects or repairs that.

use crate::db::{self, InsertOutcome};
use crate::flatfile::FlatMirror;
use crate::record::CommuteRecord;
use anyhow::anyhow;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AddOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub removed_from_table: bool,
    pub removed_from_mirror: bool,
}

pub struct SyncEngine<'a> {
    conn: &'a Connection,
    mirror: &'a FlatMirror,
}

impl<'a> SyncEngine<'a> {
    pub fn new(conn: &'a Connection, mirror: &'a FlatMirror) -> Self {
        Self { conn, mirror }
    }

    /// The mirror decides existence. A record already there is reported as
    /// `AlreadyExists` and neither store is touched.
    pub fn add(&self, record: &CommuteRecord) -> anyhow::Result<AddOutcome> {
        let student_id = record.student_id.trim();
        if student_id.is_empty() {
            return Err(anyhow!("student_id must not be empty"));
        }
        let mut record = record.clone();
        record.student_id = student_id.to_string();

        if self.mirror.contains(&record.student_id)? {
            log::info!("[sync] add {}: already in mirror", record.student_id);
            return Ok(AddOutcome::AlreadyExists);
        }

        // The table may already hold the id after an earlier partial add.
        if db::insert_record(self.conn, &record)? == InsertOutcome::Duplicate {
            log::warn!(
                "[sync] add {}: table already had the id; mirror was behind",
                record.student_id
            );
        }

        if !self.mirror.contains(&record.student_id)? {
            self.mirror.append(&record)?;
        }
        log::info!("[sync] add {}: inserted", record.student_id);
        Ok(AddOutcome::Inserted)
    }

    /// Both removals always run, so deleting twice is harmless.
    pub fn delete(&self, student_id: &str) -> anyhow::Result<DeleteOutcome> {
        let student_id = student_id.trim();
        let removed_from_table = db::delete_record(self.conn, student_id)?;
        let removed_from_mirror = self.mirror.remove(student_id)?;
        log::info!(
            "[sync] delete {}: table={} mirror={}",
            student_id,
            removed_from_table,
            removed_from_mirror
        );
        Ok(DeleteOutcome {
            removed_from_table,
            removed_from_mirror,
        })
    }
}
