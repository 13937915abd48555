use rusqlite::types::Value;
use serde::Serialize;

/// Filter value meaning "no constraint on this column".
pub const ALL: &str = "All";

/// Columns the dashboard can filter and group by. Column names only ever
/// reach SQL text through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterColumn {
    YearOfStudy,
    ModeOfTransport,
}

impl FilterColumn {
    pub fn sql_name(self) -> &'static str {
        match self {
            FilterColumn::YearOfStudy => "year_of_study",
            FilterColumn::ModeOfTransport => "mode_of_transport",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub column: FilterColumn,
    pub value: String,
}

/// Conjunction of equality constraints. Empty means every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    constraints: Vec<Constraint>,
}

impl Predicate {
    #[cfg(test)]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    #[cfg(test)]
    pub fn value_for(&self, column: FilterColumn) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.value.as_str())
    }

    /// Adds `column = value`; a later constraint on the same column replaces
    /// the earlier one.
    pub fn with(mut self, column: FilterColumn, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.constraints.iter_mut().find(|c| c.column == column) {
            Some(c) => c.value = value,
            None => self.constraints.push(Constraint { column, value }),
        }
        self
    }

    /// `WHERE a = ?1 AND b = ?2` (or nothing) plus the values to bind, in order.
    pub fn where_clause(&self) -> (String, Vec<Value>) {
        if self.constraints.is_empty() {
            return (String::new(), Vec::new());
        }
        let parts: Vec<String> = self
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c.column.sql_name(), i + 1))
            .collect();
        let values = self
            .constraints
            .iter()
            .map(|c| Value::Text(c.value.clone()))
            .collect();
        (format!("WHERE {}", parts.join(" AND ")), values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub selected_year: String,
    pub selected_mode: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_year: ALL.to_string(),
            selected_mode: ALL.to_string(),
        }
    }
}

fn normalize(v: &str) -> String {
    if v.is_empty() {
        ALL.to_string()
    } else {
        v.to_string()
    }
}

impl FilterState {
    pub fn new(selected_year: &str, selected_mode: &str) -> Self {
        Self {
            selected_year: normalize(selected_year),
            selected_mode: normalize(selected_mode),
        }
    }

    /// Reads `selectedYear`/`selectedMode` from request params; missing,
    /// null or empty values mean `"All"`.
    pub fn from_params(params: &serde_json::Value) -> Self {
        let get = |key: &str| params.get(key).and_then(|v| v.as_str()).unwrap_or(ALL);
        Self::new(get("selectedYear"), get("selectedMode"))
    }

    pub fn year(&self) -> Option<&str> {
        (self.selected_year != ALL).then_some(self.selected_year.as_str())
    }

    pub fn mode(&self) -> Option<&str> {
        (self.selected_mode != ALL).then_some(self.selected_mode.as_str())
    }

    pub fn predicate(&self) -> Predicate {
        let mut pred = Predicate::default();
        if let Some(y) = self.year() {
            pred = pred.with(FilterColumn::YearOfStudy, y);
        }
        if let Some(m) = self.mode() {
            pred = pred.with(FilterColumn::ModeOfTransport, m);
        }
        pred
    }
}
