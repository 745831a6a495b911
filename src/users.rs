use serde::Serialize;

pub const MSG_SAVED: &str = "user saved";
pub const MSG_SAVE_FAILED: &str = "registration failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub method: &'static str,
    pub path: String,
}

/// `POST /user/create` for a new user, `POST /user/{id}/edit` for an existing one.
pub fn submission_route(user_id: Option<&str>) -> Route {
    let path = match user_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("/user/{}/edit", urlencoding::encode(id)),
        None => "/user/create".to_string(),
    };
    Route {
        method: "POST",
        path,
    }
}

fn non_empty_str<'a>(body: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

pub fn failure_message(body: Option<&serde_json::Value>) -> String {
    body.and_then(|b| non_empty_str(b, "description").or_else(|| non_empty_str(b, "error")))
        .unwrap_or(MSG_SAVE_FAILED)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub ok: bool,
    pub message: String,
}

pub fn outcome(status: u16, body: Option<&serde_json::Value>) -> Outcome {
    if (200..300).contains(&status) {
        Outcome {
            ok: true,
            message: MSG_SAVED.to_string(),
        }
    } else {
        Outcome {
            ok: false,
            message: failure_message(body),
        }
    }
}
