use crate::chart::Series;
use crate::gpa::{self, GradeRecord};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn parse_records(req: &Request) -> Result<Vec<GradeRecord>, serde_json::Value> {
    let Some(raw) = req.params.get("records") else {
        return Err(err(&req.id, "bad_params", "missing records", None));
    };
    let records: Vec<GradeRecord> = serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            "records must be an array of grade records",
            Some(json!({ "reason": e.to_string() })),
        )
    })?;
    gpa::check_records(&records).map_err(|msg| err(&req.id, "bad_params", msg, None))?;
    Ok(records)
}

fn series_json(s: &Series) -> serde_json::Value {
    json!({ "labels": s.labels, "values": s.values })
}

fn handle_series(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = match required_str(req, "view") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match parse_records(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let series = match view.as_str() {
        "distribution" => gpa::gpa_distribution(&records),
        "subjects" => gpa::subject_averages(&records),
        "student" => {
            let student_id = match required_str(req, "studentId") {
                Ok(v) => v,
                Err(e) => return e,
            };
            gpa::student_subject_scores(&records, &student_id)
        }
        "creditPointsByStudent" => gpa::credit_points(&records).by_student,
        "creditPointsBySubject" => gpa::credit_points(&records).by_subject,
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown view: {}", other),
                None,
            )
        }
    };
    ok(&req.id, series_json(&series))
}

fn handle_gpa(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match parse_records(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "gpa": gpa::student_gpa(&records, &student_id),
        }),
    )
}

fn handle_strengths(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match parse_records(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let report = gpa::strengths_and_weaknesses(&records, &student_id);
    match serde_json::to_value(&report) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.series" => Some(handle_series(state, req)),
        "analytics.gpa" => Some(handle_gpa(state, req)),
        "analytics.strengths" => Some(handle_strengths(state, req)),
        _ => None,
    }
}
