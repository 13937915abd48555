use crate::ipc::error::{ok, store_err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::record::{coerce_int, coerce_real, CommuteRecord};
use crate::sync::AddOutcome;
use serde_json::json;

fn text_param(params: &serde_json::Value, key: &str) -> String {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Same coercion as the flat-file load: a JSON number or numeric string is
/// accepted, anything else is null.
fn real_param(params: &serde_json::Value, key: &str) -> Option<f64> {
    match params.get(key)? {
        serde_json::Value::Number(n) => n.as_f64().and_then(|v| coerce_real(&v.to_string())),
        serde_json::Value::String(s) => coerce_real(s),
        _ => None,
    }
}

fn int_param(params: &serde_json::Value, key: &str) -> Option<i64> {
    match params.get(key)? {
        serde_json::Value::Number(n) => coerce_int(&n.to_string()),
        serde_json::Value::String(s) => coerce_int(s),
        _ => None,
    }
}

fn student_id_param(req: &Request) -> Result<String, HandlerErr> {
    let id = text_param(&req.params, "studentId");
    if id.is_empty() {
        return Err(HandlerErr::new("bad_params", "missing studentId"));
    }
    Ok(id)
}

fn record_from_params(req: &Request) -> Result<CommuteRecord, HandlerErr> {
    let p = &req.params;
    Ok(CommuteRecord {
        student_id: student_id_param(req)?,
        gender: text_param(p, "gender"),
        branch: text_param(p, "branch"),
        year_of_study: text_param(p, "yearOfStudy"),
        area: text_param(p, "area"),
        distance_km: real_param(p, "distanceKm"),
        mode_of_transport: text_param(p, "modeOfTransport"),
        travel_time_min: int_param(p, "travelTimeMin"),
        travel_cost_rs: real_param(p, "travelCostRs"),
        monthly_pass: text_param(p, "monthlyPass"),
        satisfaction_rating: int_param(p, "satisfactionRating"),
    })
}

fn add_record(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(ws) = state.workspace.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let record = record_from_params(req)?;
    let outcome = ws.sync().add(&record).map_err(store_err)?;
    let status = match outcome {
        AddOutcome::Inserted => "inserted",
        AddOutcome::AlreadyExists => "alreadyExists",
    };
    Ok(json!({ "status": status, "studentId": record.student_id }))
}

fn delete_record(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(ws) = state.workspace.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let student_id = student_id_param(req)?;
    let out = ws.sync().delete(&student_id).map_err(store_err)?;
    Ok(json!({
        "studentId": student_id,
        "removedFromTable": out.removed_from_table,
        "removedFromMirror": out.removed_from_mirror,
    }))
}

fn respond(
    req: &Request,
    result: Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.add" => Some(respond(req, add_record(state, req))),
        "records.delete" => Some(respond(req, delete_record(state, req))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(params: serde_json::Value) -> Request {
        Request {
            id: "t".into(),
            method: "records.add".into(),
            params,
        }
    }

    #[test]
    fn numeric_params_accept_numbers_and_strings() {
        let r = record_from_params(&req(json!({
            "studentId": " S7 ",
            "distanceKm": "4.25",
            "travelTimeMin": 35,
            "travelCostRs": 60,
            "satisfactionRating": "4",
        })))
        .unwrap_or_else(|e| panic!("{}", e.message));
        assert_eq!(r.student_id, "S7");
        assert_eq!(r.distance_km, Some(4.25));
        assert_eq!(r.travel_time_min, Some(35));
        assert_eq!(r.travel_cost_rs, Some(60.0));
        assert_eq!(r.satisfaction_rating, Some(4));
    }

    #[test]
    fn unparseable_or_missing_numbers_become_null() {
        let r = record_from_params(&req(json!({
            "studentId": "S8",
            "distanceKm": "far",
            "travelTimeMin": 12.5,
            "travelCostRs": null,
            "satisfactionRating": true,
        })))
        .unwrap_or_else(|e| panic!("{}", e.message));
        assert_eq!(r.distance_km, None);
        assert_eq!(r.travel_time_min, None);
        assert_eq!(r.travel_cost_rs, None);
        assert_eq!(r.satisfaction_rating, None);
    }

    #[test]
    fn blank_student_id_is_bad_params() {
        let e = record_from_params(&req(json!({ "studentId": "   " })))
            .err()
            .expect("error");
        assert_eq!(e.code, "bad_params");
    }
}
