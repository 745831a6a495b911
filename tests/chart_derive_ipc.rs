use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradechartd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradechartd");
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn strs(v: &serde_json::Value) -> Vec<String> {
    v.as_array()
        .expect("array")
        .iter()
        .map(|x| x.as_str().expect("string").to_string())
        .collect()
}

fn nums(v: &serde_json::Value) -> Vec<f64> {
    v.as_array()
        .expect("array")
        .iter()
        .map(|x| x.as_f64().expect("number"))
        .collect()
}

#[test]
fn gpa_distribution_renders_as_bar_on_four_point_axis() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let spec = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "chart.derive",
        json!({
            "filter": "all",
            "labels": ["0-1", "1-2", "2-3", "3-4"],
            "values": [2, 5, 10, 3],
            "gpaMode": true
        }),
    );
    assert_eq!(spec["status"], "ready");
    assert_eq!(spec["chartKind"], "bar");
    assert_eq!(spec["effectiveFilter"], "all");
    assert_eq!(spec["axis"], json!({ "kind": "fixed", "min": 0.0, "max": 4.0 }));
    assert_eq!(spec["datasetLabel"], "Student count");
    assert_eq!(spec["title"], "Overall distribution");
    assert_eq!(spec["colors"], json!({ "shared": "#4e73df" }));
    assert_eq!(strs(&spec["labels"]), vec!["0-1", "1-2", "2-3", "3-4"]);
    assert!(spec["insightMessage"].is_null());

    let pct = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "chart.derive",
        json!({ "filter": "subject", "labels": ["Math"], "values": [72.5] }),
    );
    assert_eq!(pct["axis"]["max"], 100.0);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn role_default_applies_only_without_explicit_filter() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let explicit = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "chart.derive",
        json!({
            "filter": "predict",
            "viewerRole": "student",
            "labels": ["T1", "T2"],
            "values": [2.5, 3.0]
        }),
    );
    assert_eq!(explicit["effectiveFilter"], "predict");
    assert_eq!(explicit["chartKind"], "line");

    let defaulted = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "chart.derive",
        json!({
            "roleDefault": "student",
            "labels": ["Math", "Art", "PE"],
            "values": [90, 40, 75],
            "studentName": "Alice (K24001)"
        }),
    );
    assert_eq!(defaulted["effectiveFilter"], "student");
    assert_eq!(defaulted["chartKind"], "doughnut");
    assert_eq!(defaulted["axis"], json!({ "kind": "none" }));
    assert_eq!(strs(&defaulted["labels"]), vec!["Math", "PE", "Art"]);
    assert_eq!(nums(&defaulted["values"]), vec![90.0, 75.0, 40.0]);
    assert_eq!(defaulted["title"], "Score distribution for Alice");
    let msg = defaulted["insightMessage"].as_str().expect("message");
    assert!(msg.contains("strongest in Math"), "{}", msg);
    assert!(msg.contains("weakest in Art"), "{}", msg);
    assert_eq!(
        defaulted["colors"]["perPoint"].as_array().map(|a| a.len()),
        Some(3)
    );

    let none = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "chart.derive",
        json!({ "labels": ["a"], "values": [1] }),
    );
    assert_eq!(none["effectiveFilter"], "all");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn empty_and_mismatched_series_report_no_data() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let cases = [
        json!({ "filter": "student", "labels": [], "values": [] }),
        json!({ "filter": "predict", "labels": ["a", "b"], "values": [1] }),
        json!({ "filter": "subject" }),
    ];
    for (i, params) in cases.iter().enumerate() {
        let spec = request_ok(
            &mut stdin,
            &mut reader,
            &format!("nd{}", i),
            "chart.derive",
            params.clone(),
        );
        assert_eq!(
            spec,
            json!({ "status": "noData", "message": "no data to display" })
        );
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn derive_is_idempotent_across_calls() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let params = json!({
        "filter": "student",
        "labels": ["Math", "Art", "PE", "Music"],
        "values": [80, 80, 60, 95],
        "message": "Precomputed"
    });
    let a = request_ok(&mut stdin, &mut reader, "a", "chart.derive", params.clone());
    let b = request_ok(&mut stdin, &mut reader, "b", "chart.derive", params);
    assert_eq!(a, b);
    assert_eq!(a["insightMessage"], "Precomputed");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn predict_window_bounds_the_data() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let w = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "chart.predictWindow",
        json!({ "values": [2.95, 3.10, 3.40] }),
    );
    let min = w["min"].as_f64().expect("min");
    let max = w["max"].as_f64().expect("max");
    assert!(min <= 2.80 && min >= 0.0, "min {}", min);
    assert!(max >= 3.55 && max <= 4.0, "max {}", max);
    assert!(max - min >= 0.4);

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "chart.predictWindow",
        json!({ "values": [] }),
    );
    assert!(empty.is_null());

    drop(stdin);
    let _ = child.wait();
}
