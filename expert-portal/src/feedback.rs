//! Feedback questionnaire.
//!
//! The question graph lives on the server; the flow holds one node at a time plus the
//! answers given so far. Each answer either ends the questionnaire or fetches the node
//! named by the current node's `nextRule` for that answer.
//!
//! Submission happens when the number of answers reaches the configured maximum, or
//! when the answered node is terminal (free-text, or flagged `terminal` by the server),
//! whichever comes first. A successful submission marks the appointment as
//! "report sent" and navigates to the completion screen.
//!
//! Failures are final: the flow moves to [`FeedbackState::Failed`] and issues no
//! further requests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::{
    api::ExpertApi,
    config::PortalConfig,
    error::{PortalError, Result},
    inflight::InFlight,
    models::{AppointmentStatus, FeedbackSubmission, Question, QuestionKind},
    route::{Navigator, Route},
};

pub const NO_START_QUESTION: &str = "No starting question found.";
pub const START_FAILED: &str = "Failed to load the starting question.";
pub const INVALID_NEXT_QUESTION: &str = "Invalid next question.";
pub const NEXT_NOT_FOUND: &str = "Next question not found.";
pub const NEXT_FAILED: &str = "Error fetching the next question.";
pub const SUBMIT_FAILED: &str = "Error submitting feedback.";

const ANSWER_KEY: &str = "feedback:answer";

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackState {
    /// No appointment id in the route; nothing will load
    AwaitingAppointment,
    LoadingQuestion,
    Presenting(Question),
    SubmittingAnswer(Question),
    Submitting,
    Completed,
    Failed(String),
}

impl FeedbackState {
    pub fn question(&self) -> Option<&Question> {
        match self {
            FeedbackState::Presenting(q) | FeedbackState::SubmittingAnswer(q) => Some(q),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, FeedbackState::Completed | FeedbackState::Failed(_))
    }
}

#[derive(Debug)]
struct FlowInner {
    state: FeedbackState,
    responses: BTreeMap<String, String>,
    answered: usize,
    draft: String,
}

pub struct FeedbackFlow {
    api: Arc<dyn ExpertApi>,
    navigator: Arc<dyn Navigator>,
    appointment_id: Option<String>,
    max_questions: usize,
    inner: Mutex<FlowInner>,
    in_flight: InFlight,
}

impl FeedbackFlow {
    pub fn new(
        api: Arc<dyn ExpertApi>,
        navigator: Arc<dyn Navigator>,
        appointment_id: Option<String>,
        config: &PortalConfig,
    ) -> Self {
        Self {
            api,
            navigator,
            appointment_id: appointment_id.filter(|id| !id.is_empty()),
            max_questions: config.max_feedback_questions,
            inner: Mutex::new(FlowInner {
                state: FeedbackState::AwaitingAppointment,
                responses: BTreeMap::new(),
                answered: 0,
                draft: String::new(),
            }),
            in_flight: InFlight::new(),
        }
    }

    /// Build the flow for a route, reading its `appointmentId` parameter.
    pub fn for_route(
        api: Arc<dyn ExpertApi>,
        navigator: Arc<dyn Navigator>,
        route: &Route,
        config: &PortalConfig,
    ) -> Self {
        let appointment_id = match route {
            Route::Feedback { appointment_id } => appointment_id.clone(),
            _ => None,
        };
        Self::new(api, navigator, appointment_id, config)
    }

    fn inner(&self) -> MutexGuard<'_, FlowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn appointment_id(&self) -> Option<&str> {
        self.appointment_id.as_deref()
    }

    pub fn state(&self) -> FeedbackState {
        self.inner().state.clone()
    }

    pub fn responses(&self) -> BTreeMap<String, String> {
        self.inner().responses.clone()
    }

    pub fn answered(&self) -> usize {
        self.inner().answered
    }

    pub fn draft(&self) -> String {
        self.inner().draft.clone()
    }

    /// Stage free-text input before submitting it with [`FeedbackFlow::submit_draft`].
    pub fn set_draft(&self, text: impl Into<String>) {
        self.inner().draft = text.into();
    }

    fn set_state(&self, state: FeedbackState) -> FeedbackState {
        self.inner().state = state.clone();
        state
    }

    fn fail(&self, message: &str) -> FeedbackState {
        self.set_state(FeedbackState::Failed(message.to_string()))
    }

    /// Fetch the first question. Does nothing without an appointment id or once loaded.
    pub async fn load(&self) -> FeedbackState {
        let Some(appointment_id) = self.appointment_id.as_deref() else {
            debug!("No appointment id, feedback stays idle");
            return FeedbackState::AwaitingAppointment;
        };

        let Ok(_ticket) = self.in_flight.try_begin(ANSWER_KEY) else {
            return self.state();
        };
        {
            let mut inner = self.inner();
            if inner.state != FeedbackState::AwaitingAppointment {
                return inner.state.clone();
            }
            inner.state = FeedbackState::LoadingQuestion;
        }

        match self.api.feedback_start(appointment_id).await {
            Ok(question) => {
                info!(appointment_id, question_id = %question.id, "Feedback started");
                self.set_state(FeedbackState::Presenting(question))
            }
            Err(PortalError::Rejected { .. }) => self.fail(NO_START_QUESTION),
            Err(e) => {
                error!("Failed to load the starting question: {}", e);
                self.fail(START_FAILED)
            }
        }
    }

    /// Answer the presented question with its staged draft text.
    pub async fn submit_draft(&self) -> Result<FeedbackState> {
        let draft = self.draft();
        self.answer(draft).await
    }

    /// Answer the presented question and advance the flow.
    ///
    /// Returns an error, without touching the flow, when no question is presented,
    /// another answer is still in flight, or a multiple-choice answer is not one of
    /// the question's options.
    pub async fn answer(&self, answer: impl Into<String>) -> Result<FeedbackState> {
        let answer = answer.into();
        let Some(appointment_id) = self.appointment_id.clone() else {
            return Err(PortalError::InvalidAnswer(
                "no appointment selected".to_string(),
            ));
        };
        let _ticket = self.in_flight.try_begin(ANSWER_KEY)?;

        let (question, answered, responses) = {
            let mut inner = self.inner();
            let FeedbackState::Presenting(question) = &inner.state else {
                return Err(PortalError::InvalidAnswer(
                    "no question is being presented".to_string(),
                ));
            };
            let question = question.clone();
            validate_answer(&question, &answer)?;

            inner.responses.insert(question.id.clone(), answer.clone());
            inner.answered += 1;
            inner.draft.clear();
            inner.state = FeedbackState::SubmittingAnswer(question.clone());
            (question, inner.answered, inner.responses.clone())
        };

        debug!(question_id = %question.id, answered, "Answer recorded");

        if answered >= self.max_questions || question.is_terminal() {
            return Ok(self.submit(appointment_id, responses).await);
        }

        let Some(next_id) = question.next_for(&answer) else {
            warn!(question_id = %question.id, answer = %answer, "No next question for answer");
            return Ok(self.fail(INVALID_NEXT_QUESTION));
        };

        let next = self
            .api
            .feedback_next(next_id, &appointment_id, &question.id, &answer)
            .await;

        Ok(match next {
            Ok(next) => self.set_state(FeedbackState::Presenting(next)),
            Err(PortalError::Rejected { .. }) => self.fail(NEXT_NOT_FOUND),
            Err(e) => {
                error!("Error fetching the next question: {}", e);
                self.fail(NEXT_FAILED)
            }
        })
    }

    async fn submit(
        &self,
        appointment_id: String,
        responses: BTreeMap<String, String>,
    ) -> FeedbackState {
        self.set_state(FeedbackState::Submitting);
        let count = responses.len();
        let submission = FeedbackSubmission {
            appointment_id,
            responses,
        };

        if let Err(e) = self.api.submit_feedback(&submission).await {
            error!("Error in feedback submission: {}", e);
            return self.fail(SUBMIT_FAILED);
        }
        info!(appointment_id = %submission.appointment_id, count, "Feedback submitted");

        if let Err(e) = self
            .api
            .update_appointment_status(&submission.appointment_id, &AppointmentStatus::ReportSent)
            .await
        {
            warn!("Feedback stored but status update failed: {}", e);
        }

        let state = self.set_state(FeedbackState::Completed);
        self.navigator.navigate(Route::FeedbackCompletion);
        state
    }
}

fn validate_answer(question: &Question, answer: &str) -> Result<()> {
    match question.kind {
        QuestionKind::Text => Ok(()),
        QuestionKind::MultipleChoice => {
            let listed = question.options.iter().any(|o| o == answer);
            let routed = question.options.is_empty() && question.next_rule.contains_key(answer);
            if listed || routed {
                Ok(())
            } else {
                Err(PortalError::InvalidAnswer(format!(
                    "'{}' is not an option of question {}",
                    answer, question.id
                )))
            }
        }
        QuestionKind::Unsupported => Err(PortalError::InvalidAnswer(format!(
            "question {} has an unsupported type",
            question.id
        ))),
    }
}
