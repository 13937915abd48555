use crate::query::{FilterColumn, Predicate};
use crate::record::CommuteRecord;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use std::path::Path;

pub fn open_db(db_path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_commute(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL UNIQUE,
            gender TEXT,
            branch TEXT,
            year_of_study TEXT,
            area TEXT,
            distance_km REAL,
            mode_of_transport TEXT,
            travel_time_min INTEGER,
            travel_cost_rs REAL,
            monthly_pass TEXT,
            satisfaction_rating INTEGER
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_commute_year ON student_commute(year_of_study)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_commute_mode ON student_commute(mode_of_transport)",
        [],
    )?;
    Ok(())
}

const INSERT_COLUMNS: &str = "student_id, gender, branch, year_of_study, area, distance_km,
     mode_of_transport, travel_time_min, travel_cost_rs, monthly_pass, satisfaction_rating";

const SELECT_RECORD: &str = "SELECT student_id, gender, branch, year_of_study, area, distance_km,
        mode_of_transport, travel_time_min, travel_cost_rs, monthly_pass, satisfaction_rating
     FROM student_commute";

fn insert_sql(verb: &str) -> String {
    format!(
        "{} INTO student_commute ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        verb, INSERT_COLUMNS
    )
}

fn bind_record(r: &CommuteRecord) -> impl rusqlite::Params + '_ {
    (
        &r.student_id,
        &r.gender,
        &r.branch,
        &r.year_of_study,
        &r.area,
        r.distance_km,
        &r.mode_of_transport,
        r.travel_time_min,
        r.travel_cost_rs,
        &r.monthly_pass,
        r.satisfaction_rating,
    )
}

/// Text columns may hold NULL when the table was populated by another tool.
fn text_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CommuteRecord> {
    Ok(CommuteRecord {
        student_id: row.get(0)?,
        gender: text_col(row, 1)?,
        branch: text_col(row, 2)?,
        year_of_study: text_col(row, 3)?,
        area: text_col(row, 4)?,
        distance_km: row.get(5)?,
        mode_of_transport: text_col(row, 6)?,
        travel_time_min: row.get(7)?,
        travel_cost_rs: row.get(8)?,
        monthly_pass: text_col(row, 9)?,
        satisfaction_rating: row.get(10)?,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Inserts every record whose student id is not already in the table.
/// Running it again over the same input inserts nothing.
pub fn bulk_insert(conn: &mut Connection, records: &[CommuteRecord]) -> anyhow::Result<BulkInsertSummary> {
    let tx = conn.transaction()?;
    let mut summary = BulkInsertSummary::default();
    {
        let mut stmt = tx.prepare(&insert_sql("INSERT OR IGNORE"))?;
        for r in records {
            let n = stmt.execute(bind_record(r))?;
            if n > 0 {
                summary.inserted += 1;
            } else {
                summary.skipped += 1;
            }
        }
    }
    tx.commit()?;
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

pub fn insert_record(conn: &Connection, record: &CommuteRecord) -> anyhow::Result<InsertOutcome> {
    match conn.execute(&insert_sql("INSERT"), bind_record(record)) {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn delete_record(conn: &Connection, student_id: &str) -> anyhow::Result<bool> {
    let n = conn.execute(
        "DELETE FROM student_commute WHERE student_id = ?",
        [student_id],
    )?;
    Ok(n > 0)
}

#[cfg(test)]
pub fn student_ids(conn: &Connection) -> anyhow::Result<std::collections::HashSet<String>> {
    let mut stmt = conn.prepare("SELECT student_id FROM student_commute")?;
    let ids = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<std::collections::HashSet<_>, _>>()?;
    Ok(ids)
}

pub fn count_records(conn: &Connection) -> anyhow::Result<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM student_commute", [], |r| r.get(0))?;
    Ok(n as usize)
}

/// Rows matching the predicate, oldest first.
pub fn query_records(conn: &Connection, pred: &Predicate) -> anyhow::Result<Vec<CommuteRecord>> {
    let (clause, values) = pred.where_clause();
    let sql = format!("{} {} ORDER BY id", SELECT_RECORD, clause);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Distinct non-empty values of a filter column, in first-seen order.
pub fn distinct_values(conn: &Connection, column: FilterColumn) -> anyhow::Result<Vec<String>> {
    let col = column.sql_name();
    let sql = format!(
        "SELECT {col} FROM student_commute
         WHERE {col} IS NOT NULL AND {col} <> ''
         GROUP BY {col}
         ORDER BY MIN(id)"
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}
