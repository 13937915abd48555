use serde::{Deserialize, Serialize};

/// Column order of the flat mirror, which is also the column order of the
/// `student_commute` table after its surrogate key.
pub const COLUMNS: [&str; 11] = [
    "student_id",
    "gender",
    "branch",
    "year_of_study",
    "area",
    "distance_km",
    "mode_of_transport",
    "travel_time_min",
    "travel_cost_rs",
    "monthly_pass",
    "satisfaction_rating",
];

/// One survey response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommuteRecord {
    pub student_id: String,
    pub gender: String,
    pub branch: String,
    pub year_of_study: String,
    pub area: String,
    pub distance_km: Option<f64>,
    pub mode_of_transport: String,
    pub travel_time_min: Option<i64>,
    pub travel_cost_rs: Option<f64>,
    pub monthly_pass: String,
    pub satisfaction_rating: Option<i64>,
}

/// Lenient real coercion: blank, unparseable, non-finite or negative input is null.
pub fn coerce_real(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => None,
    }
}

/// Lenient integer coercion. Spreadsheet exports write integral columns as
/// `12.0`, so an integral float is accepted; anything fractional is null.
pub fn coerce_int(raw: &str) -> Option<i64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(v) = t.parse::<i64>() {
        return if v >= 0 { Some(v) } else { None };
    }
    let v = coerce_real(t)?;
    if v.fract() == 0.0 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

pub fn format_real(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

pub fn format_int(v: Option<i64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

impl CommuteRecord {
    /// Field values in `COLUMNS` order, as they are written to the flat mirror.
    pub fn to_fields(&self) -> [String; 11] {
        [
            self.student_id.clone(),
            self.gender.clone(),
            self.branch.clone(),
            self.year_of_study.clone(),
            self.area.clone(),
            format_real(self.distance_km),
            self.mode_of_transport.clone(),
            format_int(self.travel_time_min),
            format_real(self.travel_cost_rs),
            self.monthly_pass.clone(),
            format_int(self.satisfaction_rating),
        ]
    }
}
