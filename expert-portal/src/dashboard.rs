//! Profile dashboard.
//!
//! Every tab is fetched lazily when it is selected and re-fetched on every switch;
//! nothing is cached between switches. The confirmed appointments shown in the
//! feedback tab are loaded once at mount.
//!
//! Methods take `&self` so several controls can be awaited at once; per-action
//! [`InFlight`] guards refuse a repeated action until the first one resolves.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::{
    api::ExpertApi,
    error::PortalError,
    inflight::InFlight,
    models::{Appointment, Decision, Expert, ProfileUpdate, Summary},
    route::{Navigator, Route},
    session::{ExpertSession, SessionManager},
    summary::{SummaryContent, parse_summary},
};

pub const PROFILE_LOAD_FAILED: &str = "Failed to load expert data.";
pub const PROFILE_FETCH_ERROR: &str = "Error fetching expert data.";
pub const PROFILE_UPDATED: &str = "Profile updated successfully!";
pub const PROFILE_UPDATE_ERROR: &str = "Error updating profile.";
pub const APPOINTMENTS_ERROR: &str = "Error fetching appointments.";
pub const DECISION_APPLIED: &str = "Appointment status updated successfully!";
pub const DECISION_FAILED: &str = "Failed to update appointment status.";
pub const NO_SUMMARIES: &str = "No summaries found. They may have been deleted.";
pub const SUMMARIES_ERROR: &str = "Error fetching summaries.";
pub const LOGOUT_FAILED: &str = "Could not sign out.";
pub const FEEDBACK_UNAVAILABLE: &str = "Feedback is not available for this appointment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    PendingAppointments,
    ConfirmedAppointments,
    Summary,
    Feedback,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Dashboard,
        Tab::PendingAppointments,
        Tab::ConfirmedAppointments,
        Tab::Summary,
        Tab::Feedback,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::PendingAppointments => "pendingAppointments",
            Tab::ConfirmedAppointments => "confirmedAppointments",
            Tab::Summary => "summary",
            Tab::Feedback => "feedback",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::PendingAppointments => "Pending Appointments",
            Tab::ConfirmedAppointments => "Confirmed Appointments",
            Tab::Summary => "Summary",
            Tab::Feedback => "Feedback Report",
        }
    }
}

/// A summary ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub appointment_id: String,
    pub created: String,
    pub content: SummaryContent,
}

impl From<Summary> for SummaryEntry {
    fn from(summary: Summary) -> Self {
        Self {
            created: summary.display_date(),
            content: parse_summary(&summary.summary),
            appointment_id: summary.appointment_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub active_tab: Tab,
    pub expert: Option<Expert>,
    pub editing: bool,
    pub draft: Option<ProfileUpdate>,
    pub pending: Vec<Appointment>,
    pub confirmed: Vec<Appointment>,
    pub summaries: Vec<SummaryEntry>,
    pub loading_appointments: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Failed,
    /// Not attempted: the action is not offered, or the same one is still awaiting the server
    Refused,
}

pub struct Dashboard {
    api: Arc<dyn ExpertApi>,
    sessions: SessionManager,
    navigator: Arc<dyn Navigator>,
    session: ExpertSession,
    state: Mutex<DashboardState>,
    in_flight: InFlight,
}

impl Dashboard {
    /// Open the dashboard for the stored session.
    ///
    /// Without a session this navigates to the login screen and returns `None`.
    pub async fn mount(
        api: Arc<dyn ExpertApi>,
        sessions: SessionManager,
        navigator: Arc<dyn Navigator>,
    ) -> Option<Self> {
        let session = match sessions.current().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                navigator.navigate(Route::Login);
                return None;
            }
            Err(e) => {
                warn!("Could not read stored session: {}", e);
                navigator.navigate(Route::Login);
                return None;
            }
        };

        let dashboard = Self {
            api,
            sessions,
            navigator,
            session,
            state: Mutex::new(DashboardState::default()),
            in_flight: InFlight::new(),
        };

        dashboard.load_profile().await;
        dashboard.load_confirmed_for_feedback().await;
        Some(dashboard)
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state().clone()
    }

    pub fn session(&self) -> &ExpertSession {
        &self.session
    }

    pub fn is_deciding(&self, appointment_id: &str) -> bool {
        self.in_flight.is_active(&decision_key(appointment_id))
    }

    pub async fn switch_tab(&self, tab: Tab) {
        self.state().active_tab = tab;
        match tab {
            Tab::PendingAppointments | Tab::ConfirmedAppointments => {
                self.load_appointments().await
            }
            Tab::Summary => self.load_summaries().await,
            Tab::Dashboard | Tab::Feedback => {}
        }
    }

    async fn load_profile(&self) {
        match self.api.profile(&self.session).await {
            Ok(expert) => {
                let mut state = self.state();
                state.draft = Some(ProfileUpdate::from_expert(&expert));
                state.expert = Some(expert);
            }
            Err(PortalError::Rejected { .. }) => {
                self.state().message = Some(PROFILE_LOAD_FAILED.to_string());
            }
            Err(e) => {
                error!("Error fetching expert data: {}", e);
                self.state().message = Some(PROFILE_FETCH_ERROR.to_string());
            }
        }
    }

    async fn load_appointments(&self) {
        self.state().loading_appointments = true;
        let result = self.api.appointments(&self.session).await;

        let mut state = self.state();
        match result {
            Ok(book) => {
                state.pending = book.pending;
                state.confirmed = book.confirmed;
            }
            Err(PortalError::Rejected { .. }) => {
                state.pending.clear();
                state.confirmed.clear();
            }
            Err(e) => {
                error!("Error fetching appointments: {}", e);
                state.message = Some(APPOINTMENTS_ERROR.to_string());
            }
        }
        state.loading_appointments = false;
    }

    async fn load_confirmed_for_feedback(&self) {
        self.state().loading_appointments = true;
        let result = self.api.appointments(&self.session).await;

        let mut state = self.state();
        match result {
            Ok(book) => state.confirmed = book.confirmed,
            Err(PortalError::Rejected { .. }) => state.confirmed.clear(),
            Err(e) => {
                error!("Error fetching confirmed appointments: {}", e);
                state.message = Some(APPOINTMENTS_ERROR.to_string());
            }
        }
        state.loading_appointments = false;
    }

    async fn load_summaries(&self) {
        let result = self.api.summaries(&self.session).await;

        let mut state = self.state();
        match result {
            Ok(summaries) => {
                state.summaries = summaries.into_iter().map(SummaryEntry::from).collect();
            }
            Err(e) if e.is_not_found() || matches!(e, PortalError::Rejected { .. }) => {
                state.summaries.clear();
                state.message = Some(NO_SUMMARIES.to_string());
            }
            Err(e) => {
                error!("Error fetching summaries: {}", e);
                state.message = Some(SUMMARIES_ERROR.to_string());
            }
        }
    }

    /// Start editing, seeding the draft from the current profile.
    pub fn begin_edit(&self) {
        let mut state = self.state();
        if let Some(expert) = &state.expert {
            state.draft = Some(ProfileUpdate::from_expert(expert));
        }
        state.editing = true;
    }

    pub fn edit_draft(&self, edit: impl FnOnce(&mut ProfileUpdate)) {
        let mut state = self.state();
        if let Some(draft) = state.draft.as_mut() {
            edit(draft);
        }
    }

    pub fn cancel_edit(&self) {
        self.state().editing = false;
    }

    pub async fn save_profile(&self) -> ActionOutcome {
        let Ok(_ticket) = self.in_flight.try_begin(SAVE_PROFILE_KEY) else {
            return ActionOutcome::Refused;
        };

        let Some(draft) = self.state().draft.clone() else {
            return ActionOutcome::Failed;
        };

        match self.api.update_profile(&self.session, &draft).await {
            Ok(expert) => {
                info!("Profile updated");
                let mut state = self.state();
                state.draft = Some(ProfileUpdate::from_expert(&expert));
                state.expert = Some(expert);
                state.editing = false;
                state.message = Some(PROFILE_UPDATED.to_string());
                ActionOutcome::Applied
            }
            Err(e) => {
                error!("Error updating profile: {}", e);
                self.state().message = Some(PROFILE_UPDATE_ERROR.to_string());
                ActionOutcome::Failed
            }
        }
    }

    /// Confirm or reject a pending appointment.
    ///
    /// On success the appointment leaves the pending list; a confirmation appends the
    /// server's returned appointment to the confirmed list.
    pub async fn decide(&self, appointment_id: &str, decision: Decision) -> ActionOutcome {
        let Ok(_ticket) = self.in_flight.try_begin(decision_key(appointment_id)) else {
            warn!("Decision for {} already in flight", appointment_id);
            return ActionOutcome::Refused;
        };

        let result = self
            .api
            .decide_appointment(&self.session, appointment_id, decision)
            .await;

        let mut state = self.state();
        match result {
            Ok(appointment) => {
                info!("Appointment {} {}", appointment_id, decision.as_str());
                state.pending.retain(|a| a.id != appointment_id);
                if decision == Decision::Confirmed {
                    state.confirmed.push(appointment);
                }
                state.message = Some(DECISION_APPLIED.to_string());
                ActionOutcome::Applied
            }
            Err(PortalError::Rejected { message }) => {
                state.message = Some(message.unwrap_or_else(|| DECISION_FAILED.to_string()));
                ActionOutcome::Failed
            }
            Err(e) => {
                error!("Error confirming or rejecting appointment: {}", e);
                state.message = Some(DECISION_FAILED.to_string());
                ActionOutcome::Failed
            }
        }
    }

    /// Open the feedback questionnaire for a confirmed appointment still awaiting its report.
    pub fn fill_feedback(&self, appointment_id: &str) -> ActionOutcome {
        let open = self
            .state()
            .confirmed
            .iter()
            .any(|a| a.id == appointment_id && a.awaiting_feedback());
        if !open {
            debug!("No feedback action for appointment {}", appointment_id);
            self.state().message = Some(FEEDBACK_UNAVAILABLE.to_string());
            return ActionOutcome::Refused;
        }
        self.navigator.navigate(Route::feedback(appointment_id));
        ActionOutcome::Applied
    }

    pub async fn logout(&self) {
        match self.sessions.end().await {
            Ok(()) => self.navigator.navigate(Route::Login),
            Err(e) => {
                error!("Failed to clear session: {}", e);
                self.state().message = Some(LOGOUT_FAILED.to_string());
            }
        }
    }
}

const SAVE_PROFILE_KEY: &str = "profile:save";

fn decision_key(appointment_id: &str) -> String {
    format!("decide:{}", appointment_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{AppointmentBook, AppointmentStatus},
        session::TOKEN_KEY,
        store::{InMemoryLocalStore, LocalStore},
        testing::{RecordingNavigator, Reply, ScriptedApi, appointment},
    };
    use std::time::Duration;

    struct Harness {
        api: Arc<ScriptedApi>,
        store: Arc<InMemoryLocalStore>,
        navigator: Arc<RecordingNavigator>,
    }

    impl Harness {
        async fn signed_in() -> Self {
            let h = Self::signed_out();
            h.store.set(TOKEN_KEY, "tok".to_string()).await.unwrap();
            h
        }

        fn signed_out() -> Self {
            Self {
                api: Arc::new(ScriptedApi::new()),
                store: Arc::new(InMemoryLocalStore::new()),
                navigator: Arc::new(RecordingNavigator::default()),
            }
        }

        async fn mount(&self) -> Option<Dashboard> {
            Dashboard::mount(
                self.api.clone(),
                SessionManager::new(self.store.clone()),
                self.navigator.clone(),
            )
            .await
        }
    }

    fn book() -> AppointmentBook {
        AppointmentBook {
            pending: vec![
                appointment("p1", AppointmentStatus::Pending),
                appointment("p2", AppointmentStatus::Pending),
            ],
            confirmed: vec![appointment("c1", AppointmentStatus::Confirmed)],
        }
    }

    #[tokio::test]
    async fn test_mount_without_session_redirects() {
        let h = Harness::signed_out();
        assert!(h.mount().await.is_none());
        assert_eq!(h.navigator.routes(), vec![Route::Login]);
        assert!(h.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mount_loads_profile_and_feedback_list() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.appointments = Reply::Ok(book()));

        let dashboard = h.mount().await.unwrap();
        let state = dashboard.snapshot();

        assert_eq!(state.expert.as_ref().unwrap().name, "Dr. Rao");
        assert_eq!(state.draft.as_ref().unwrap().gender, "Male");
        assert_eq!(state.confirmed.len(), 1);
        // The mount effect only fills the feedback list.
        assert!(state.pending.is_empty());
        assert!(!state.loading_appointments);
        assert_eq!(h.api.calls(), vec!["profile", "appointments"]);
    }

    #[tokio::test]
    async fn test_profile_failure_sets_message() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.profile = Reply::Reject(None));
        let dashboard = h.mount().await.unwrap();
        assert_eq!(
            dashboard.snapshot().message.as_deref(),
            Some(PROFILE_LOAD_FAILED)
        );

        h.api.script(|s| s.profile = Reply::Status(500, None));
        let dashboard = h.mount().await.unwrap();
        assert_eq!(
            dashboard.snapshot().message.as_deref(),
            Some(PROFILE_FETCH_ERROR)
        );
    }

    #[tokio::test]
    async fn test_every_tab_switch_refetches() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.appointments = Reply::Ok(book()));
        let dashboard = h.mount().await.unwrap();
        let before = h.api.count("appointments");

        dashboard.switch_tab(Tab::PendingAppointments).await;
        dashboard.switch_tab(Tab::PendingAppointments).await;
        assert_eq!(h.api.count("appointments"), before + 2);
        assert_eq!(dashboard.snapshot().pending.len(), 2);

        dashboard.switch_tab(Tab::Summary).await;
        dashboard.switch_tab(Tab::Summary).await;
        assert_eq!(h.api.count("summaries"), 2);

        dashboard.switch_tab(Tab::Dashboard).await;
        dashboard.switch_tab(Tab::Feedback).await;
        assert_eq!(h.api.count("appointments"), before + 2);
        assert_eq!(dashboard.snapshot().active_tab, Tab::Feedback);
    }

    #[tokio::test]
    async fn test_appointment_fetch_error_keeps_lists() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.appointments = Reply::Ok(book()));
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::PendingAppointments).await;

        h.api.script(|s| s.appointments = Reply::Status(502, None));
        dashboard.switch_tab(Tab::ConfirmedAppointments).await;
        let state = dashboard.snapshot();
        assert_eq!(state.message.as_deref(), Some(APPOINTMENTS_ERROR));
        assert_eq!(state.pending.len(), 2);

        h.api.script(|s| s.appointments = Reply::Reject(None));
        dashboard.switch_tab(Tab::PendingAppointments).await;
        assert!(dashboard.snapshot().pending.is_empty());
    }

    #[tokio::test]
    async fn test_summaries_parse_and_fallback() {
        let h = Harness::signed_in().await;
        h.api.script(|s| {
            s.summaries = Reply::Ok(vec![
                Summary {
                    appointment_id: "a1".to_string(),
                    created_at: "2025-02-01T08:00:00Z".to_string(),
                    summary: r#"{"parts":[{"text":"Stable. Review"}]}"#.to_string(),
                },
                Summary {
                    appointment_id: "a2".to_string(),
                    created_at: "2025-02-02T08:00:00Z".to_string(),
                    summary: "plain text".to_string(),
                },
            ])
        });
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::Summary).await;

        let state = dashboard.snapshot();
        assert_eq!(state.summaries.len(), 2);
        assert_eq!(state.summaries[0].created, "2/1/2025");
        assert_eq!(state.summaries[0].content.lines(), ["Stable.", "Review"]);
        assert_eq!(state.summaries[1].content, SummaryContent::Unavailable);
    }

    #[tokio::test]
    async fn test_missing_summaries_message() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.summaries = Reply::Status(404, None));
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::Summary).await;
        assert_eq!(dashboard.snapshot().message.as_deref(), Some(NO_SUMMARIES));

        h.api.script(|s| s.summaries = Reply::Status(500, None));
        dashboard.switch_tab(Tab::Summary).await;
        assert_eq!(dashboard.snapshot().message.as_deref(), Some(SUMMARIES_ERROR));
    }

    #[tokio::test]
    async fn test_confirm_uses_server_representation() {
        let h = Harness::signed_in().await;
        h.api.script(|s| {
            s.appointments = Reply::Ok(book());
            s.decide = Some(Reply::Ok(Appointment {
                time: "11:00".to_string(),
                ..appointment("p1", AppointmentStatus::Confirmed)
            }));
        });
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::PendingAppointments).await;

        let outcome = dashboard.decide("p1", Decision::Confirmed).await;
        assert_eq!(outcome, ActionOutcome::Applied);

        let state = dashboard.snapshot();
        assert_eq!(
            state.pending.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            ["p2"]
        );
        let added = state.confirmed.last().unwrap();
        assert_eq!(added.id, "p1");
        assert_eq!(added.time, "11:00");
        assert_eq!(state.message.as_deref(), Some(DECISION_APPLIED));
    }

    #[tokio::test]
    async fn test_reject_only_removes() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.appointments = Reply::Ok(book()));
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::PendingAppointments).await;

        dashboard.decide("p2", Decision::Rejected).await;
        let state = dashboard.snapshot();
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.confirmed.len(), 1);
        assert_eq!(h.api.count("decide:p2:rejected"), 1);
    }

    #[tokio::test]
    async fn test_rejected_decision_shows_server_message() {
        let h = Harness::signed_in().await;
        h.api.script(|s| {
            s.appointments = Reply::Ok(book());
            s.decide = Some(Reply::Reject(Some("Slot no longer available".to_string())));
        });
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::PendingAppointments).await;

        let outcome = dashboard.decide("p1", Decision::Confirmed).await;
        assert_eq!(outcome, ActionOutcome::Failed);
        let state = dashboard.snapshot();
        assert_eq!(state.message.as_deref(), Some("Slot no longer available"));
        assert_eq!(state.pending.len(), 2);
    }

    #[tokio::test]
    async fn test_double_click_sends_one_request() {
        let h = Harness::signed_in().await;
        h.api.script(|s| {
            s.appointments = Reply::Ok(book());
            s.decide_delay = Duration::from_millis(50);
        });
        let dashboard = h.mount().await.unwrap();
        dashboard.switch_tab(Tab::PendingAppointments).await;

        let (first, second) = tokio::join!(
            dashboard.decide("p1", Decision::Confirmed),
            dashboard.decide("p1", Decision::Confirmed)
        );

        assert_eq!(first, ActionOutcome::Applied);
        assert_eq!(second, ActionOutcome::Refused);
        assert_eq!(h.api.count("decide:p1:confirmed"), 1);
        assert!(!dashboard.is_deciding("p1"));
    }

    #[tokio::test]
    async fn test_profile_edit_round_trip() {
        let h = Harness::signed_in().await;
        let dashboard = h.mount().await.unwrap();

        dashboard.begin_edit();
        dashboard.edit_draft(|d| {
            d.address = "12 Harbour Rd".to_string();
            d.gender = "Female".to_string();
        });
        assert!(dashboard.snapshot().editing);

        assert_eq!(dashboard.save_profile().await, ActionOutcome::Applied);
        let state = dashboard.snapshot();
        assert!(!state.editing);
        assert_eq!(
            state.expert.as_ref().unwrap().address.as_deref(),
            Some("12 Harbour Rd")
        );
        assert_eq!(state.message.as_deref(), Some(PROFILE_UPDATED));

        h.api
            .script(|s| s.update_profile = Some(Reply::Status(500, None)));
        dashboard.begin_edit();
        assert_eq!(dashboard.save_profile().await, ActionOutcome::Failed);
        assert!(dashboard.snapshot().editing);
    }

    #[tokio::test]
    async fn test_fill_feedback_and_logout() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.appointments = Reply::Ok(book()));
        let dashboard = h.mount().await.unwrap();

        assert_eq!(dashboard.fill_feedback("c1"), ActionOutcome::Applied);
        dashboard.logout().await;

        assert_eq!(
            h.navigator.routes(),
            vec![Route::feedback("c1"), Route::Login]
        );
        assert!(h.store.get(TOKEN_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fill_feedback_refuses_reported_and_unknown() {
        let h = Harness::signed_in().await;
        h.api.script(|s| {
            s.appointments = Reply::Ok(AppointmentBook {
                pending: vec![appointment("p1", AppointmentStatus::Pending)],
                confirmed: vec![appointment("c9", AppointmentStatus::ReportSent)],
            })
        });
        let dashboard = h.mount().await.unwrap();

        assert_eq!(dashboard.fill_feedback("c9"), ActionOutcome::Refused);
        assert_eq!(dashboard.fill_feedback("p1"), ActionOutcome::Refused);
        assert_eq!(dashboard.fill_feedback("nope"), ActionOutcome::Refused);

        assert!(h.navigator.routes().is_empty());
        assert_eq!(
            dashboard.snapshot().message.as_deref(),
            Some(FEEDBACK_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn test_double_save_sends_one_update() {
        let h = Harness::signed_in().await;
        h.api.script(|s| s.update_delay = Duration::from_millis(50));
        let dashboard = h.mount().await.unwrap();
        dashboard.begin_edit();

        let (first, second) = tokio::join!(dashboard.save_profile(), dashboard.save_profile());

        assert_eq!(first, ActionOutcome::Applied);
        assert_eq!(second, ActionOutcome::Refused);
        assert_eq!(h.api.count("update_profile"), 1);

        assert_eq!(dashboard.save_profile().await, ActionOutcome::Applied);
        assert_eq!(h.api.count("update_profile"), 2);
    }
}
