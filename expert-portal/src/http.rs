//! reqwest-backed [`ExpertApi`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::{
    api::{
        AppointmentPayload, AppointmentsPayload, Empty, Envelope, ExpertApi, ExpertPayload,
        QuestionPayload, SummariesPayload,
    },
    config::PortalConfig,
    error::{PortalError, Result},
    models::{
        Appointment, AppointmentBook, AppointmentStatus, Credentials, Decision, Expert,
        FeedbackSubmission, LoginRequest, ProfileUpdate, Question, SignupRequest, Summary,
    },
    session::ExpertSession,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpExpertApi {
    client: Client,
    base_url: String,
}

impl HttpExpertApi {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` followed by `segment` as a single percent-encoded path segment.
    fn segment_url(&self, path: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| PortalError::Config(format!("invalid api url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PortalError::Config("api url cannot take a path".to_string()))?
            .push(segment);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, session: &ExpertSession) -> RequestBuilder {
        request.header(AUTHORIZATION, session.bearer())
    }

    /// Send a request and decode the JSON envelope.
    ///
    /// Non-2xx responses become [`PortalError::Status`] with the server's `message`
    /// when the body carries one.
    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Envelope> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("api_request", endpoint, request_id = %request_id);

        async move {
            let response = request
                .header(REQUEST_ID_HEADER, request_id.as_str())
                .send()
                .await
                .map_err(|e| {
                    warn!("Request to {} failed: {}", endpoint, e);
                    PortalError::Transport(e)
                })?;

            let status = response.status();
            let body = response.bytes().await?;
            debug!(status = status.as_u16(), bytes = body.len(), "Response received");

            if !status.is_success() {
                let message = serde_json::from_slice::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.message);
                warn!(status = status.as_u16(), "Request to {} was refused", endpoint);
                return Err(PortalError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            Ok(serde_json::from_slice::<Envelope>(&body)?)
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl ExpertApi for HttpExpertApi {
    async fn login(&self, request: &LoginRequest) -> Result<Credentials> {
        let req = self.client.post(self.url("/expert/login")).json(request);
        self.send("expert_login", req)
            .await?
            .unless_failed::<Credentials>()
    }

    async fn signup(&self, request: &SignupRequest) -> Result<()> {
        let req = self.client.post(self.url("/expert/signup")).json(request);
        self.send("expert_signup", req)
            .await?
            .unless_failed::<Empty>()
            .map(|_| ())
    }

    async fn profile(&self, session: &ExpertSession) -> Result<Expert> {
        let req = self.authorized(self.client.get(self.url("/expert/profile")), session);
        Ok(self
            .send("expert_profile", req)
            .await?
            .require_success::<ExpertPayload>()?
            .expert)
    }

    async fn update_profile(
        &self,
        session: &ExpertSession,
        update: &ProfileUpdate,
    ) -> Result<Expert> {
        let req = self.authorized(
            self.client.put(self.url("/expert/profile")).json(update),
            session,
        );
        Ok(self
            .send("expert_profile_update", req)
            .await?
            .require_success::<ExpertPayload>()?
            .expert)
    }

    async fn appointments(&self, session: &ExpertSession) -> Result<AppointmentBook> {
        let req = self.authorized(self.client.get(self.url("/appointments/expert")), session);
        Ok(self
            .send("expert_appointments", req)
            .await?
            .require_success::<AppointmentsPayload>()?
            .appointments)
    }

    async fn decide_appointment(
        &self,
        session: &ExpertSession,
        appointment_id: &str,
        decision: Decision,
    ) -> Result<Appointment> {
        let body = json!({ "appointmentId": appointment_id, "status": decision });
        let req = self.authorized(
            self.client.post(self.url("/expert/confirm")).json(&body),
            session,
        );
        Ok(self
            .send("expert_confirm", req)
            .await?
            .require_success::<AppointmentPayload>()?
            .appointment)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: &AppointmentStatus,
    ) -> Result<()> {
        let body = json!({ "appointmentId": appointment_id, "status": status });
        let req = self
            .client
            .post(self.url("/appointments/updateStatus"))
            .json(&body);
        self.send("appointment_status", req)
            .await?
            .unless_failed::<Empty>()
            .map(|_| ())
    }

    async fn summaries(&self, session: &ExpertSession) -> Result<Vec<Summary>> {
        let req = self.authorized(self.client.get(self.url("/expert/summary")), session);
        Ok(self
            .send("expert_summaries", req)
            .await?
            .require_success::<SummariesPayload>()?
            .summaries)
    }

    async fn feedback_start(&self, appointment_id: &str) -> Result<Question> {
        let req = self
            .client
            .get(self.url("/feedback/start"))
            .query(&[("appointmentId", appointment_id)]);
        Ok(self
            .send("feedback_start", req)
            .await?
            .require_success::<QuestionPayload>()?
            .question)
    }

    async fn feedback_next(
        &self,
        next_question_id: &str,
        appointment_id: &str,
        current_question_id: &str,
        answer: &str,
    ) -> Result<Question> {
        let url = self.segment_url("/feedback", next_question_id)?;
        let req = self.client.get(url).query(&[
            ("appointmentId", appointment_id),
            ("currentQuestionId", current_question_id),
            ("answer", answer),
        ]);
        Ok(self
            .send("feedback_next", req)
            .await?
            .require_success::<QuestionPayload>()?
            .question)
    }

    async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<()> {
        let req = self
            .client
            .post(self.url("/feedback/submit"))
            .json(submission);
        self.send("feedback_submit", req)
            .await?
            .require_success::<Empty>()
            .map(|_| ())
    }
}
