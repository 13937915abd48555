use crate::aggregate;
use crate::ipc::error::{ok, store_err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::query::FilterState;
use serde_json::json;

fn handle_dashboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return HandlerErr::new("no_workspace", "select a workspace first").response(&req.id);
    };
    let filter = FilterState::from_params(&req.params);
    let dashboard = match aggregate::dashboard(&ws.conn, &filter) {
        Ok(d) => d,
        Err(e) => return store_err(e).response(&req.id),
    };
    match serde_json::to_value(&dashboard) {
        Ok(v) => ok(&req.id, v),
        Err(e) => HandlerErr::new("internal", e.to_string()).response(&req.id),
    }
}

fn handle_filter_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return HandlerErr::new("no_workspace", "select a workspace first").response(&req.id);
    };
    match aggregate::filter_options(&ws.conn) {
        Ok(opts) => ok(&req.id, json!({ "years": opts.years, "modes": opts.modes })),
        Err(e) => store_err(e).response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "commute.dashboard" => Some(handle_dashboard(state, req)),
        "commute.filterOptions" => Some(handle_filter_options(state, req)),
        _ => None,
    }
}
