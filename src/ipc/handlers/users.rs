use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::users;
use serde_json::json;

fn handle_route(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let user_id = req.params.get("userId").and_then(|v| v.as_str());
    let route = users::submission_route(user_id);
    ok(&req.id, json!({ "method": route.method, "path": route.path }))
}

fn handle_outcome(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(status) = req
        .params
        .get("httpStatus")
        .and_then(|v| v.as_u64())
        .and_then(|v| u16::try_from(v).ok())
    else {
        return err(&req.id, "bad_params", "missing httpStatus", None);
    };
    let outcome = users::outcome(status, req.params.get("body"));
    ok(
        &req.id,
        json!({ "ok": outcome.ok, "message": outcome.message }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.route" => Some(handle_route(state, req)),
        "users.outcome" => Some(handle_outcome(state, req)),
        _ => None,
    }
}
