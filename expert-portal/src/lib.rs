pub mod api;
pub mod auth;
pub mod completion;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feedback;
pub mod http;
pub mod inflight;
pub mod models;
pub mod route;
pub mod session;
pub mod store;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use api::ExpertApi;
pub use auth::{AuthFields, AuthForm, AuthMode, AuthOutcome};
pub use completion::CompletionScreen;
pub use config::PortalConfig;
pub use dashboard::{ActionOutcome, Dashboard, DashboardState, SummaryEntry, Tab};
pub use error::{PortalError, Result};
pub use feedback::{FeedbackFlow, FeedbackState};
pub use http::HttpExpertApi;
pub use inflight::{InFlight, InFlightTicket};
pub use models::{
    Appointment, AppointmentBook, AppointmentStatus, Credentials, Decision, Expert,
    FeedbackSubmission, ProfileUpdate, Question, QuestionKind, Summary,
};
pub use route::{ChannelNavigator, Navigator, Route, ScheduledRedirect};
pub use session::{ExpertSession, SessionManager};
pub use store::{FileLocalStore, InMemoryLocalStore, LocalStore};
pub use summary::{Span, SummaryContent, emphasis_spans, parse_summary};
