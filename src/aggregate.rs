use crate::db;
use crate::query::{FilterColumn, FilterState, Predicate, ALL};
use crate::record::CommuteRecord;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

pub const Y_LABEL: &str = "Number of Students";
pub const NO_DATA: &str = "No data for the selected filters";

/// Half-away-from-zero rounding to 2 decimals.
pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default)]
struct MeanAcc {
    sum: f64,
    count: usize,
}

impl MeanAcc {
    fn push(&mut self, v: Option<f64>) {
        if let Some(v) = v {
            self.sum += v;
            self.count += 1;
        }
    }

    /// Null when no non-null value was seen.
    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(round_2(self.sum / self.count as f64))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStats {
    pub mode: String,
    pub avg_time: Option<f64>,
    pub avg_cost: Option<f64>,
    pub avg_rating: Option<f64>,
}

/// Per-mode means over `rows`. Nulls are left out of each field's mean.
pub fn summarize_by_mode(rows: &[CommuteRecord]) -> Vec<ModeStats> {
    let mut groups: BTreeMap<&str, [MeanAcc; 3]> = BTreeMap::new();
    for r in rows {
        let acc = groups.entry(r.mode_of_transport.as_str()).or_default();
        acc[0].push(r.travel_time_min.map(|v| v as f64));
        acc[1].push(r.travel_cost_rs);
        acc[2].push(r.satisfaction_rating.map(|v| v as f64));
    }
    groups
        .into_iter()
        .map(|(mode, acc)| ModeStats {
            mode: mode.to_string(),
            avg_time: acc[0].mean(),
            avg_cost: acc[1].mean(),
            avg_rating: acc[2].mean(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub count: usize,
}

/// What the chart groups by and which rows it counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPlan {
    pub group_by: FilterColumn,
    pub predicate: Predicate,
    pub title: &'static str,
    pub x_label: &'static str,
}

/// Chart dimension selection. Grouping stays on transport mode unless the
/// mode filter alone is active: a single-mode chart would be one bar, so it
/// pivots to year of study. A year filter never pivots.
pub fn chart_plan(filter: &FilterState) -> ChartPlan {
    let group_by = match (filter.year(), filter.mode()) {
        (None, Some(_)) => FilterColumn::YearOfStudy,
        _ => FilterColumn::ModeOfTransport,
    };
    let (title, x_label) = match group_by {
        FilterColumn::ModeOfTransport => ("Students per Transport Mode", "Transport Mode"),
        FilterColumn::YearOfStudy => ("Students per Year of Study", "Year of Study"),
    };
    ChartPlan {
        group_by,
        predicate: filter.predicate(),
        title,
        x_label,
    }
}

pub fn chart_series(rows: &[CommuteRecord], group_by: FilterColumn) -> Vec<ChartPoint> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rows {
        let key = match group_by {
            FilterColumn::ModeOfTransport => r.mode_of_transport.as_str(),
            FilterColumn::YearOfStudy => r.year_of_study.as_str(),
        };
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| ChartPoint {
            label: label.to_string(),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub group_by: FilterColumn,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    /// Set when there is nothing to plot; the renderer shows it instead of axes.
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub rows: Vec<CommuteRecord>,
    pub stats: Vec<ModeStats>,
    pub chart_series: Vec<ChartPoint>,
    pub chart: ChartMeta,
    pub years: Vec<String>,
    pub modes: Vec<String>,
    pub selected_year: String,
    pub selected_mode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub years: Vec<String>,
    pub modes: Vec<String>,
}

fn with_all(values: Vec<String>) -> Vec<String> {
    std::iter::once(ALL.to_string()).chain(values).collect()
}

/// Filter choices, each led by the `"All"` sentinel.
pub fn filter_options(conn: &Connection) -> anyhow::Result<FilterOptions> {
    Ok(FilterOptions {
        years: with_all(db::distinct_values(conn, FilterColumn::YearOfStudy)?),
        modes: with_all(db::distinct_values(conn, FilterColumn::ModeOfTransport)?),
    })
}

pub fn dashboard(conn: &Connection, filter: &FilterState) -> anyhow::Result<Dashboard> {
    let options = filter_options(conn)?;
    let list_pred = filter.predicate();
    let rows = db::query_records(conn, &list_pred)?;

    let stats = summarize_by_mode(&rows);
    let plan = chart_plan(filter);
    let chart_series = if plan.predicate == list_pred {
        chart_series(&rows, plan.group_by)
    } else {
        chart_series(&db::query_records(conn, &plan.predicate)?, plan.group_by)
    };

    Ok(Dashboard {
        chart: ChartMeta {
            group_by: plan.group_by,
            title: plan.title,
            x_label: plan.x_label,
            y_label: Y_LABEL,
            placeholder: chart_series.is_empty().then_some(NO_DATA),
        },
        rows,
        stats,
        chart_series,
        years: options.years,
        modes: options.modes,
        selected_year: filter.selected_year.clone(),
        selected_mode: filter.selected_mode.clone(),
    })
}
