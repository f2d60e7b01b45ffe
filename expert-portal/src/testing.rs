//! Test doubles shared by the screen tests.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    api::ExpertApi,
    error::{PortalError, Result},
    models::{
        Appointment, AppointmentBook, AppointmentStatus, Credentials, Decision, Expert,
        FeedbackSubmission, LoginRequest, ProfileUpdate, Question, QuestionKind, SignupRequest,
        Summary,
    },
    route::{Navigator, Route},
    session::ExpertSession,
};

#[derive(Debug, Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    Reject(Option<String>),
    Status(u16, Option<String>),
}

impl<T: Clone> Reply<T> {
    fn produce(&self) -> Result<T> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Reject(message) => Err(PortalError::Rejected {
                message: message.clone(),
            }),
            Reply::Status(status, message) => Err(PortalError::Status {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

pub(crate) struct Script {
    pub login: Reply<Credentials>,
    pub signup: Reply<()>,
    pub profile: Reply<Expert>,
    /// `None` echoes the update back as the saved profile
    pub update_profile: Option<Reply<Expert>>,
    pub update_delay: Duration,
    pub appointments: Reply<AppointmentBook>,
    /// `None` answers with the appointment in the decided status
    pub decide: Option<Reply<Appointment>>,
    pub decide_delay: Duration,
    pub status_update: Reply<()>,
    pub summaries: Reply<Vec<Summary>>,
    pub start_question: Option<String>,
    pub questions: HashMap<String, Question>,
    pub next_failure: Option<Reply<Question>>,
    pub next_delay: Duration,
    pub submit: Reply<()>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            login: Reply::Ok(Credentials {
                token: "token-1".to_string(),
                user: json!({ "name": "Dr. Rao", "email": "rao@example.com" }),
            }),
            signup: Reply::Ok(()),
            profile: Reply::Ok(expert()),
            update_profile: None,
            update_delay: Duration::ZERO,
            appointments: Reply::Ok(AppointmentBook::default()),
            decide: None,
            decide_delay: Duration::ZERO,
            status_update: Reply::Ok(()),
            summaries: Reply::Ok(Vec::new()),
            start_question: None,
            questions: HashMap::new(),
            next_failure: None,
            next_delay: Duration::ZERO,
            submit: Reply::Ok(()),
        }
    }
}

/// In-memory [`ExpertApi`] that answers from a [`Script`] and records every call.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
    submissions: Mutex<Vec<FeedbackSubmission>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, edit: impl FnOnce(&mut Script)) {
        edit(&mut self.script.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn submissions(&self) -> Vec<FeedbackSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ExpertApi for ScriptedApi {
    async fn login(&self, _request: &LoginRequest) -> Result<Credentials> {
        self.record("login");
        self.script.lock().unwrap().login.produce()
    }

    async fn signup(&self, _request: &SignupRequest) -> Result<()> {
        self.record("signup");
        self.script.lock().unwrap().signup.produce()
    }

    async fn profile(&self, _session: &ExpertSession) -> Result<Expert> {
        self.record("profile");
        self.script.lock().unwrap().profile.produce()
    }

    async fn update_profile(
        &self,
        _session: &ExpertSession,
        update: &ProfileUpdate,
    ) -> Result<Expert> {
        self.record("update_profile");
        let (delay, reply) = {
            let script = self.script.lock().unwrap();
            (script.update_delay, script.update_profile.clone())
        };
        pause(delay).await;
        match reply {
            Some(reply) => reply.produce(),
            None => Ok(Expert {
                name: update.name.clone(),
                email: "rao@example.com".to_string(),
                specialization: update.specialization.clone(),
                address: Some(update.address.clone()),
                gender: Some(update.gender.clone()),
                profile_pic: update.profile_pic.clone(),
            }),
        }
    }

    async fn appointments(&self, _session: &ExpertSession) -> Result<AppointmentBook> {
        self.record("appointments");
        self.script.lock().unwrap().appointments.produce()
    }

    async fn decide_appointment(
        &self,
        _session: &ExpertSession,
        appointment_id: &str,
        decision: Decision,
    ) -> Result<Appointment> {
        self.record(format!("decide:{}:{}", appointment_id, decision.as_str()));
        let (delay, reply) = {
            let script = self.script.lock().unwrap();
            (script.decide_delay, script.decide.clone())
        };
        pause(delay).await;
        match reply {
            Some(reply) => reply.produce(),
            None => Ok(appointment(
                appointment_id,
                AppointmentStatus::from(decision.as_str().to_string()),
            )),
        }
    }

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: &AppointmentStatus,
    ) -> Result<()> {
        self.record(format!("status:{}:{}", appointment_id, status));
        self.script.lock().unwrap().status_update.produce()
    }

    async fn summaries(&self, _session: &ExpertSession) -> Result<Vec<Summary>> {
        self.record("summaries");
        self.script.lock().unwrap().summaries.produce()
    }

    async fn feedback_start(&self, appointment_id: &str) -> Result<Question> {
        self.record(format!("feedback_start:{}", appointment_id));
        let script = self.script.lock().unwrap();
        script
            .start_question
            .as_ref()
            .and_then(|id| script.questions.get(id))
            .cloned()
            .ok_or(PortalError::Rejected { message: None })
    }

    async fn feedback_next(
        &self,
        next_question_id: &str,
        _appointment_id: &str,
        current_question_id: &str,
        answer: &str,
    ) -> Result<Question> {
        self.record(format!(
            "feedback_next:{}<-{}={}",
            next_question_id, current_question_id, answer
        ));
        let delay = self.script.lock().unwrap().next_delay;
        pause(delay).await;
        let script = self.script.lock().unwrap();
        if let Some(failure) = &script.next_failure {
            return failure.produce();
        }
        script
            .questions
            .get(next_question_id)
            .cloned()
            .ok_or(PortalError::Rejected { message: None })
    }

    async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<()> {
        self.record("submit");
        self.submissions.lock().unwrap().push(submission.clone());
        self.script.lock().unwrap().submit.produce()
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

pub(crate) fn expert() -> Expert {
    Expert {
        name: "Dr. Rao".to_string(),
        email: "rao@example.com".to_string(),
        specialization: "Cardiology".to_string(),
        address: None,
        gender: None,
        profile_pic: None,
    }
}

pub(crate) fn appointment(id: &str, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: id.to_string(),
        date: "2025-03-07T00:00:00.000Z".to_string(),
        time: "10:30".to_string(),
        status,
    }
}

pub(crate) fn choice(id: &str, rules: &[(&str, &str)]) -> Question {
    Question {
        id: id.to_string(),
        text: format!("Question {}", id),
        kind: QuestionKind::MultipleChoice,
        options: rules.iter().map(|(answer, _)| answer.to_string()).collect(),
        next_rule: rules
            .iter()
            .map(|(answer, next)| (answer.to_string(), next.to_string()))
            .collect(),
        terminal: false,
    }
}

pub(crate) fn free_text(id: &str) -> Question {
    Question {
        id: id.to_string(),
        text: format!("Question {}", id),
        kind: QuestionKind::Text,
        options: Vec::new(),
        next_rule: HashMap::new(),
        terminal: false,
    }
}
