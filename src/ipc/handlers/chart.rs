use crate::chart::{self, ChartContext, Filter, ParamError};
use crate::ipc::error::{err, ok, param_err};
use crate::ipc::handlers::setup;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn optional_str(req: &Request, key: &str) -> Result<Option<String>, ParamError> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ParamError::bad_params(format!("{} must be a string", key))),
    }
}

/// `roleDefault` names a filter; `viewerRole: "student"` is shorthand for it.
fn parse_role_default(req: &Request) -> Result<Option<Filter>, ParamError> {
    if let Some(filter) = chart::parse_filter_param(req.params.get("roleDefault"))? {
        return Ok(Some(filter));
    }
    match optional_str(req, "viewerRole")?.as_deref() {
        Some("student") => Ok(Some(Filter::Student)),
        _ => Ok(None),
    }
}

fn parse_context(req: &Request) -> Result<ChartContext, ParamError> {
    let gpa_mode = match req.params.get("gpaMode") {
        None | Some(serde_json::Value::Null) => false,
        Some(v) => v
            .as_bool()
            .ok_or_else(|| ParamError::bad_params("gpaMode must be a boolean"))?,
    };
    Ok(ChartContext {
        message: optional_str(req, "message")?,
        student_name: optional_str(req, "studentName")?,
        gpa_mode,
        role_default: parse_role_default(req)?,
    })
}

fn handle_chart_derive(state: &mut AppState, req: &Request) -> serde_json::Value {
    let filter = match chart::parse_filter_param(req.params.get("filter")) {
        Ok(v) => v,
        Err(e) => return param_err(&req.id, e),
    };
    let series = match chart::parse_series(req.params.get("labels"), req.params.get("values")) {
        Ok(v) => v,
        Err(e) => return param_err(&req.id, e),
    };
    let ctx = match parse_context(req) {
        Ok(v) => v,
        Err(e) => return param_err(&req.id, e),
    };
    let settings = match setup::chart_settings(state) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let spec = chart::derive_plot_spec(filter, &series, &ctx, &settings);
    if !spec.is_ready() {
        tracing::debug!(
            labels = series.labels.len(),
            values = series.values.len(),
            "chart.derive: no data"
        );
    }
    match serde_json::to_value(&spec) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

fn handle_predict_window(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let values = match chart::parse_values(req.params.get("values")) {
        Ok(v) => v,
        Err(e) => return param_err(&req.id, e),
    };
    match chart::predict_window(&values) {
        Some((min, max)) => ok(&req.id, json!({ "min": min, "max": max })),
        None => ok(&req.id, serde_json::Value::Null),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "chart.derive" => Some(handle_chart_derive(state, req)),
        "chart.predictWindow" => Some(handle_predict_window(state, req)),
        _ => None,
    }
}
