use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Profile of the signed-in expert as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Expert {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub specialization: String,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub profile_pic: Option<String>,
}

/// Editable subset of the profile, sent back on save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub specialization: String,
    pub address: String,
    pub gender: String,
    pub profile_pic: Option<String>,
}

impl ProfileUpdate {
    pub const DEFAULT_GENDER: &'static str = "Male";
    pub const DEFAULT_PICTURE: &'static str = "/default.png";

    /// Seed an edit draft from the server profile, filling the form defaults.
    pub fn from_expert(expert: &Expert) -> Self {
        Self {
            name: expert.name.clone(),
            specialization: expert.specialization.clone(),
            address: expert.address.clone().unwrap_or_default(),
            gender: expert
                .gender
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_GENDER.to_string()),
            profile_pic: Some(
                expert
                    .profile_pic
                    .clone()
                    .unwrap_or_else(|| Self::DEFAULT_PICTURE.to_string()),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
    ReportSent,
    Other(String),
}

impl From<String> for AppointmentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => AppointmentStatus::Pending,
            "confirmed" => AppointmentStatus::Confirmed,
            "rejected" => AppointmentStatus::Rejected,
            "report sent" => AppointmentStatus::ReportSent,
            _ => AppointmentStatus::Other(raw),
        }
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::ReportSent => "report sent",
            AppointmentStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn display_date(&self) -> String {
        display_date(&self.date)
    }

    /// Whether the feedback report for this appointment can still be filled in.
    pub fn awaiting_feedback(&self) -> bool {
        self.status != AppointmentStatus::ReportSent
    }
}

/// Appointment list as grouped by the server.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppointmentBook {
    #[serde(default)]
    pub pending: Vec<Appointment>,
    #[serde(default)]
    pub confirmed: Vec<Appointment>,
}

/// Outcome chosen by the expert for a pending appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Confirmed,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Confirmed => "confirmed",
            Decision::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub appointment_id: String,
    #[serde(default)]
    pub created_at: String,
    /// JSON-encoded text blob, parsed by [`crate::summary::parse_summary`]
    #[serde(default)]
    pub summary: String,
}

impl Summary {
    pub fn display_date(&self) -> String {
        display_date(&self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "text")]
    Text,
    #[serde(other)]
    Unsupported,
}

/// One node of the server-owned feedback decision graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    #[serde(rename = "questionId")]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    /// Answer value to next question id
    #[serde(default, rename = "nextRule")]
    pub next_rule: HashMap<String, String>,
    #[serde(default)]
    pub terminal: bool,
}

impl Question {
    pub fn is_free_text(&self) -> bool {
        self.kind == QuestionKind::Text
    }

    /// A terminal node ends the questionnaire once answered.
    pub fn is_terminal(&self) -> bool {
        self.terminal || self.is_free_text()
    }

    pub fn next_for(&self, answer: &str) -> Option<&str> {
        self.next_rule.get(answer).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub appointment_id: String,
    pub responses: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    /// User object as sent by the server; kept opaque and persisted verbatim
    #[serde(default)]
    pub user: serde_json::Value,
}

/// Render a server timestamp or date as `M/D/YYYY`, leaving unparseable input untouched.
pub fn display_date(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%-m/%-d/%Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%-m/%-d/%Y").to_string();
    }
    raw.to_string()
}
