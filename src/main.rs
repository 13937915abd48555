mod aggregate;
mod config;
mod db;
mod flatfile;
mod ipc;
mod query;
mod record;
mod store;
mod sync;

use std::io::{self, BufRead, Write};

fn main() {
    // stdout carries the protocol, so logs must stay on stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut state = ipc::AppState::default();

    if let Some(cfg) = config::WorkspaceConfig::from_env() {
        let root = cfg.root.to_string_lossy().to_string();
        match ipc::select_workspace(&mut state, cfg) {
            Ok(summary) => log::info!(
                "[boot] workspace {} ready ({} rows in mirror)",
                root,
                summary.rows_read
            ),
            Err(e) => log::error!("[boot] workspace {} failed: {}", root, e.message),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                log::error!("[ipc] stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                log::warn!("[ipc] unparseable request: {}", e);
                ipc::bad_json(e.to_string())
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
