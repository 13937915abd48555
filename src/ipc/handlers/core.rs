use crate::config::WorkspaceConfig;
use crate::db;
use crate::ipc::error::{ok, store_err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{InitSummary, Workspace};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = state.workspace.as_ref();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": ws.map(|w| w.config.root.to_string_lossy().to_string()),
            "recordCount": ws.and_then(|w| db::count_records(&w.conn).ok()),
        }),
    )
}

/// Opens the workspace and runs the one-time flat-file import. The previous
/// workspace, if any, stays selected when this fails.
pub fn select_workspace(
    state: &mut AppState,
    config: WorkspaceConfig,
) -> Result<InitSummary, HandlerErr> {
    let mut ws = Workspace::open(config)
        .map_err(|e| HandlerErr::from_anyhow("db_open_failed", e))?;
    let summary = ws.initialize().map_err(store_err)?;
    state.workspace = Some(ws);
    Ok(summary)
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(config) = WorkspaceConfig::from_params(&req.params) else {
        return HandlerErr::new("bad_params", "missing params.path").response(&req.id);
    };
    let root = config.root.to_string_lossy().to_string();
    let csv_path = config.csv_path.to_string_lossy().to_string();
    let db_path = config.db_path.to_string_lossy().to_string();

    match select_workspace(state, config) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "workspacePath": root,
                "csvPath": csv_path,
                "dbPath": db_path,
                "rowsRead": summary.rows_read,
                "inserted": summary.inserted,
                "skipped": summary.skipped,
                "warnings": summary.warnings,
            }),
        ),
        Err(e) => e
            .with_details(json!({ "workspacePath": root }))
            .response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
