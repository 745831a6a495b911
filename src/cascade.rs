use serde::{Deserialize, Serialize};

pub const MSG_SELECT_STUDENT: &str = "select a student first";
pub const MSG_SELECT_SUBJECT: &str = "select a subject";
pub const MSG_NO_SUBJECTS: &str = "no enrolled subjects";
pub const MSG_FETCH_FAILED: &str = "failed to load subjects";

/// One row of `GET /grade/enrolled_subjects/{studentId}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrolledSubject {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub credits: Option<i64>,
}

fn id_as_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "subject id must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// Non-2xx status or a body that is not a subject array.
    Failed,
    Loaded(Vec<EnrolledSubject>),
}

impl LookupOutcome {
    pub fn from_response(status: u16, body: Option<&serde_json::Value>) -> Self {
        if !(200..300).contains(&status) {
            return Self::Failed;
        }
        match body {
            Some(v) => match serde_json::from_value::<Vec<EnrolledSubject>>(v.clone()) {
                Ok(rows) => Self::Loaded(rows),
                Err(_) => Self::Failed,
            },
            None => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOption {
    pub id: String,
    pub text: String,
    pub credits: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectChoices {
    pub enabled: bool,
    /// Text of the leading empty option.
    pub placeholder: String,
    pub options: Vec<SubjectOption>,
    pub selected_id: Option<String>,
    pub credits: Option<i64>,
}

impl SubjectChoices {
    fn disabled(message: &str) -> Self {
        Self {
            enabled: false,
            placeholder: message.to_string(),
            options: Vec::new(),
            selected_id: None,
            credits: None,
        }
    }
}

pub fn resolve_subject_choices(
    student_id: Option<&str>,
    outcome: Option<LookupOutcome>,
    selected_subject_id: Option<&str>,
) -> SubjectChoices {
    if student_id.map(str::trim).unwrap_or("").is_empty() {
        return SubjectChoices::disabled(MSG_SELECT_STUDENT);
    }
    let rows = match outcome {
        None | Some(LookupOutcome::Failed) => return SubjectChoices::disabled(MSG_FETCH_FAILED),
        Some(LookupOutcome::Loaded(rows)) => rows,
    };
    if rows.is_empty() {
        return SubjectChoices::disabled(MSG_NO_SUBJECTS);
    }

    let options: Vec<SubjectOption> = rows
        .into_iter()
        .map(|s| SubjectOption {
            text: format!("{} ({})", s.name, s.id),
            id: s.id,
            credits: s.credits,
        })
        .collect();
    let selected = selected_subject_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| options.iter().find(|o| o.id == id));
    let selected_id = selected.map(|o| o.id.clone());
    let credits = selected.and_then(|o| o.credits);

    SubjectChoices {
        enabled: true,
        placeholder: MSG_SELECT_SUBJECT.to_string(),
        options,
        selected_id,
        credits,
    }
}
