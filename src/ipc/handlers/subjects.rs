use crate::cascade::{self, LookupOutcome};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn optional_id(req: &Request, key: &str) -> Option<String> {
    match req.params.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn handle_choices(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = optional_id(req, "studentId");
    let selected = optional_id(req, "selectedSubjectId");
    // No status means the lookup never completed.
    let outcome = match req.params.get("httpStatus").and_then(|v| v.as_u64()) {
        Some(status) => {
            let status = u16::try_from(status).unwrap_or(u16::MAX);
            Some(LookupOutcome::from_response(status, req.params.get("body")))
        }
        None => None,
    };
    let choices =
        cascade::resolve_subject_choices(student_id.as_deref(), outcome, selected.as_deref());
    match serde_json::to_value(&choices) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.choices" => Some(handle_choices(state, req)),
        _ => None,
    }
}
