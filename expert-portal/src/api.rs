use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    error::{PortalError, Result},
    models::{
        Appointment, AppointmentBook, AppointmentStatus, Credentials, Decision, Expert,
        FeedbackSubmission, LoginRequest, ProfileUpdate, Question, SignupRequest, Summary,
    },
    session::ExpertSession,
};

/// The remote portal API.
///
/// Authenticated calls take the [`ExpertSession`] explicitly; the feedback endpoints and
/// the status update are unauthenticated on the server side.
#[async_trait]
pub trait ExpertApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<Credentials>;

    async fn signup(&self, request: &SignupRequest) -> Result<()>;

    async fn profile(&self, session: &ExpertSession) -> Result<Expert>;

    async fn update_profile(&self, session: &ExpertSession, update: &ProfileUpdate)
    -> Result<Expert>;

    async fn appointments(&self, session: &ExpertSession) -> Result<AppointmentBook>;

    /// Confirm or reject a pending appointment. Returns the server's view of the appointment.
    async fn decide_appointment(
        &self,
        session: &ExpertSession,
        appointment_id: &str,
        decision: Decision,
    ) -> Result<Appointment>;

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: &AppointmentStatus,
    ) -> Result<()>;

    async fn summaries(&self, session: &ExpertSession) -> Result<Vec<Summary>>;

    async fn feedback_start(&self, appointment_id: &str) -> Result<Question>;

    /// Fetch `next_question_id`, telling the server which question and answer led there.
    async fn feedback_next(
        &self,
        next_question_id: &str,
        appointment_id: &str,
        current_question_id: &str,
        answer: &str,
    ) -> Result<Question>;

    async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<()>;
}

/// Common response shape: `{ success, message, ...payload }`.
///
/// The payload stays as raw JSON until the success flag has been checked, since a
/// failed reply carries no payload fields at all.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Payload, provided the server explicitly reported success.
    pub fn require_success<T: DeserializeOwned>(self) -> Result<T> {
        match self.success {
            Some(true) => self.into_payload(),
            _ => Err(PortalError::Rejected {
                message: self.message,
            }),
        }
    }

    /// Payload unless the server explicitly reported failure.
    pub fn unless_failed<T: DeserializeOwned>(self) -> Result<T> {
        match self.success {
            Some(false) => Err(PortalError::Rejected {
                message: self.message,
            }),
            _ => self.into_payload(),
        }
    }

    fn into_payload<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.payload))?)
    }
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct Empty {}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpertPayload {
    pub expert: Expert,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentsPayload {
    #[serde(default)]
    pub appointments: AppointmentBook,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentPayload {
    pub appointment: Appointment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummariesPayload {
    #[serde(default)]
    pub summaries: Vec<Summary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionPayload {
    pub question: Question,
}
