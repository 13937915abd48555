//! The flat mirror: a comma-separated copy of every record, one row per
//! student, with a fixed header row.

use crate::record::{coerce_int, coerce_real, CommuteRecord, COLUMNS};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn header_line() -> String {
    COLUMNS.join(",")
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                buf.push('"');
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }
        if ch == ',' && !in_quotes {
            out.push(buf);
            buf = String::new();
            i += 1;
            continue;
        }
        buf.push(ch);
        i += 1;
    }
    out.push(buf);
    out
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadWarning {
    pub line: usize,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<CommuteRecord>,
    pub warnings: Vec<LoadWarning>,
    pub rows_read: usize,
}

/// Maps each known column to its index in the file's header, if present.
struct HeaderMap {
    idx: [Option<usize>; 11],
    width: usize,
}

impl HeaderMap {
    fn parse(header: &str) -> Self {
        let names: Vec<String> = parse_csv_record(header)
            .into_iter()
            .map(|s| s.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        let mut idx = [None; 11];
        for (slot, col) in idx.iter_mut().zip(COLUMNS.iter()) {
            *slot = names.iter().position(|n| n == col);
        }
        Self {
            idx,
            width: names.len(),
        }
    }

    /// The header of `text`: its first non-blank line.
    fn of_text(text: &str) -> Option<Self> {
        text.lines()
            .find(|l| !l.trim().is_empty())
            .map(Self::parse)
    }

    fn has_student_id(&self) -> bool {
        self.idx[0].is_some()
    }

    fn get<'a>(&self, fields: &'a [String], col: usize) -> &'a str {
        self.idx[col]
            .and_then(|i| fields.get(i))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    fn student_id(&self, line: &str) -> String {
        self.get(&parse_csv_record(line), 0).trim().to_string()
    }

    /// `record` laid out in this header's column order. Columns the header
    /// does not name are dropped; unknown header columns stay empty.
    fn row_line(&self, record: &CommuteRecord) -> String {
        let fields = record.to_fields();
        let mut out = vec![String::new(); self.width];
        for (col, slot) in self.idx.iter().enumerate() {
            if let Some(i) = slot {
                out[*i] = csv_quote(&fields[col]);
            }
        }
        out.join(",")
    }
}

/// Parses flat-mirror text. Numeric fields that fail coercion become null and
/// are reported as warnings; a row is only skipped when it has no student id.
pub fn parse_records(text: &str) -> LoadReport {
    let mut report = LoadReport::default();
    let mut lines = text.lines().enumerate();
    let Some((_, header)) = lines.find(|(_, l)| !l.trim().is_empty()) else {
        return report;
    };
    let header = HeaderMap::parse(header);

    for (line_no, raw_line) in lines {
        if raw_line.trim().is_empty() {
            continue;
        }
        report.rows_read += 1;
        let line = line_no + 1;
        let fields = parse_csv_record(raw_line);
        let text_at = |col: usize| header.get(&fields, col).trim().to_string();

        let student_id = text_at(0);
        if student_id.is_empty() {
            report.warnings.push(LoadWarning {
                line,
                code: "missing_student_id",
                column: None,
            });
            continue;
        }

        let mut real_at = |col: usize| {
            let raw = header.get(&fields, col);
            let v = coerce_real(raw);
            if v.is_none() && !raw.trim().is_empty() {
                report.warnings.push(LoadWarning {
                    line,
                    code: "coerced_null",
                    column: Some(COLUMNS[col]),
                });
            }
            v
        };
        let distance_km = real_at(5);
        let travel_cost_rs = real_at(8);

        let mut int_at = |col: usize| {
            let raw = header.get(&fields, col);
            let v = coerce_int(raw);
            if v.is_none() && !raw.trim().is_empty() {
                report.warnings.push(LoadWarning {
                    line,
                    code: "coerced_null",
                    column: Some(COLUMNS[col]),
                });
            }
            v
        };
        let travel_time_min = int_at(7);
        let satisfaction_rating = int_at(10);

        report.records.push(CommuteRecord {
            student_id,
            gender: text_at(1),
            branch: text_at(2),
            year_of_study: text_at(3),
            area: text_at(4),
            distance_km,
            mode_of_transport: text_at(6),
            travel_time_min,
            travel_cost_rs,
            monthly_pass: text_at(9),
            satisfaction_rating,
        });
    }
    report
}

pub fn load_all(path: &Path) -> anyhow::Result<LoadReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    Ok(parse_records(&text))
}

/// Handle on the flat mirror file. Every operation re-reads the file so that
/// edits made outside the process are observed.
#[derive(Debug, Clone)]
pub struct FlatMirror {
    path: PathBuf,
}

impl FlatMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_text(&self) -> anyhow::Result<Option<String>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.to_string_lossy()))?;
        Ok(Some(text))
    }

    /// Records in the mirror; an absent file is an empty mirror.
    pub fn load(&self) -> anyhow::Result<LoadReport> {
        if !self.path.is_file() {
            return Ok(LoadReport::default());
        }
        load_all(&self.path)
    }

    pub fn student_ids(&self) -> anyhow::Result<HashSet<String>> {
        let Some(text) = self.read_text()? else {
            return Ok(HashSet::new());
        };
        let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
        let Some(header) = lines.next().map(HeaderMap::parse) else {
            return Ok(HashSet::new());
        };
        Ok(lines
            .map(|l| header.student_id(l))
            .filter(|id| !id.is_empty())
            .collect())
    }

    pub fn contains(&self, student_id: &str) -> anyhow::Result<bool> {
        Ok(self.student_ids()?.contains(student_id))
    }

    /// Appends one row, laid out to match the header already in the file.
    pub fn append(&self, record: &CommuteRecord) -> anyhow::Result<()> {
        let existing = self.read_text()?.unwrap_or_default();
        let header = match HeaderMap::of_text(&existing) {
            Some(h) if !h.has_student_id() => {
                return Err(anyhow!(
                    "{} has no student_id column",
                    self.path.to_string_lossy()
                ));
            }
            Some(h) => h,
            None => HeaderMap::parse(&header_line()),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        let mut out = String::new();
        if existing.trim().is_empty() {
            out.push_str(&header_line());
            out.push('\n');
        } else if !existing.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&header.row_line(record));
        out.push('\n');

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(!existing.trim().is_empty())
            .write(true)
            .truncate(existing.trim().is_empty())
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.to_string_lossy()))?;
        f.write_all(out.as_bytes())
            .with_context(|| format!("failed to write {}", self.path.to_string_lossy()))?;
        Ok(())
    }

    /// Drops every data line keyed by `student_id`, found through the file's
    /// header; other lines are kept verbatim.
    pub fn remove(&self, student_id: &str) -> anyhow::Result<bool> {
        let Some(text) = self.read_text()? else {
            return Ok(false);
        };
        if student_id.is_empty() {
            return Ok(false);
        }
        let mut kept = String::with_capacity(text.len());
        let mut removed = false;
        let mut header: Option<HeaderMap> = None;
        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(['\r', '\n']);
            if let Some(h) = &header {
                if h.student_id(content) == student_id {
                    removed = true;
                    continue;
                }
            } else if !content.trim().is_empty() {
                header = Some(HeaderMap::parse(content));
            }
            kept.push_str(line);
        }
        if removed {
            std::fs::write(&self.path, kept)
                .with_context(|| format!("failed to write {}", self.path.to_string_lossy()))?;
        }
        Ok(removed)
    }
}
