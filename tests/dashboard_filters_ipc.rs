use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_commuted");
    let mut child = Command::new(exe)
        .env_remove("COMMUTED_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn commuted");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

const SURVEY: &str = "\
student_id,gender,branch,year_of_study,area,distance_km,mode_of_transport,travel_time_min,travel_cost_rs,monthly_pass,satisfaction_rating
S01,M,CSE,1st Year,Dadar,4,Bus,30,20,Yes,3
S02,F,ECE,2nd Year,Thane,12,Train,55,150,Yes,4
S03,F,IT,2nd Year,Kurla,6,Bus,40,25,No,2
S04,M,Mech,2nd Year,Andheri,5,Bus,,30,No,5
S05,M,CSE,3rd Year,Sion,1,Walk,10,0,No,5
S06,F,Civil,1st Year,Vashi,18,Train,70,200,Yes,
";

fn chart_points(dash: &serde_json::Value) -> Vec<(String, i64)> {
    dash["chartSeries"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|p| {
            (
                p["label"].as_str().unwrap_or("").to_string(),
                p["count"].as_i64().unwrap_or(-1),
            )
        })
        .collect()
}

fn stat_for<'a>(dash: &'a serde_json::Value, mode: &str) -> &'a serde_json::Value {
    dash["stats"]
        .as_array()
        .and_then(|s| s.iter().find(|row| row["mode"] == json!(mode)))
        .unwrap_or_else(|| panic!("no stats for {}", mode))
}

fn open_seeded() -> (PathBuf, Child, ChildStdin, BufReader<ChildStdout>) {
    let workspace = temp_dir("commuted-dashboard");
    std::fs::write(workspace.join("student_commute.csv"), SURVEY).expect("seed csv");
    let (child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "init",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    (workspace, child, stdin, reader)
}

#[test]
fn dimension_selection_follows_active_filters() {
    let (workspace, mut child, mut stdin, mut reader) = open_seeded();

    let all = request_ok(&mut stdin, &mut reader, "1", "commute.dashboard", json!({}));
    assert_eq!(all["chart"]["groupBy"], json!("mode_of_transport"));
    assert_eq!(all["rows"].as_array().map(|r| r.len()), Some(6));
    assert_eq!(
        chart_points(&all),
        vec![
            ("Bus".to_string(), 3),
            ("Train".to_string(), 2),
            ("Walk".to_string(), 1)
        ]
    );
    assert_eq!(all["years"], json!(["All", "1st Year", "2nd Year", "3rd Year"]));
    assert_eq!(all["modes"], json!(["All", "Bus", "Train", "Walk"]));

    let year = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "commute.dashboard",
        json!({ "selectedYear": "2nd Year", "selectedMode": "All" }),
    );
    assert_eq!(year["chart"]["groupBy"], json!("mode_of_transport"));
    assert_eq!(year["chart"]["xLabel"], json!("Transport Mode"));
    assert_eq!(
        chart_points(&year),
        vec![("Bus".to_string(), 2), ("Train".to_string(), 1)]
    );

    let mode = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "commute.dashboard",
        json!({ "selectedYear": "All", "selectedMode": "Bus" }),
    );
    assert_eq!(mode["chart"]["groupBy"], json!("year_of_study"));
    assert_eq!(mode["chart"]["title"], json!("Students per Year of Study"));
    assert_eq!(
        chart_points(&mode),
        vec![("1st Year".to_string(), 1), ("2nd Year".to_string(), 2)]
    );

    let both = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "commute.dashboard",
        json!({ "selectedYear": "2nd Year", "selectedMode": "Bus" }),
    );
    assert_eq!(both["chart"]["groupBy"], json!("mode_of_transport"));
    assert_eq!(chart_points(&both), vec![("Bus".to_string(), 2)]);
    assert_eq!(both["selectedYear"], json!("2nd Year"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn stats_skip_nulls_and_round_to_two_places() {
    let (workspace, mut child, mut stdin, mut reader) = open_seeded();

    let all = request_ok(&mut stdin, &mut reader, "1", "commute.dashboard", json!({}));
    let bus = stat_for(&all, "Bus");
    // S04 has no travel time: (30 + 40) / 2, not (30 + 40 + 0) / 3.
    assert_eq!(bus["avgTime"], json!(35.0));
    assert_eq!(bus["avgCost"], json!(25.0));
    assert_eq!(bus["avgRating"], json!(3.33));

    let train = stat_for(&all, "Train");
    assert_eq!(train["avgRating"], json!(4.0));
    assert_eq!(train["avgCost"], json!(175.0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn empty_selection_yields_placeholder_not_error() {
    let (workspace, mut child, mut stdin, mut reader) = open_seeded();

    let none = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "commute.dashboard",
        json!({ "selectedYear": "3rd Year", "selectedMode": "Train" }),
    );
    assert_eq!(none["rows"], json!([]));
    assert_eq!(none["stats"], json!([]));
    assert_eq!(none["chartSeries"], json!([]));
    assert_eq!(
        none["chart"]["placeholder"],
        json!("No data for the selected filters")
    );

    let hostile = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "commute.dashboard",
        json!({ "selectedYear": "All", "selectedMode": "Bus' OR '1'='1" }),
    );
    assert_eq!(hostile["rows"], json!([]));

    let after = request_ok(&mut stdin, &mut reader, "3", "commute.filterOptions", json!({}));
    assert_eq!(after["modes"], json!(["All", "Bus", "Train", "Walk"]));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
