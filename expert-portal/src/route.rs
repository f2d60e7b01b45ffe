use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::ExpertSession;

/// Screens of the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Profile,
    Feedback { appointment_id: Option<String> },
    FeedbackCompletion,
}

impl Route {
    pub fn feedback(appointment_id: impl Into<String>) -> Self {
        Route::Feedback {
            appointment_id: Some(appointment_id.into()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Feedback {
                appointment_id: Some(id),
            } => {
                let url =
                    Url::parse_with_params("http://portal.local/feedback", &[("appointmentId", id)]);
                match url {
                    Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
                    Err(_) => "/feedback".to_string(),
                }
            }
            Route::Feedback {
                appointment_id: None,
            } => "/feedback".to_string(),
            Route::FeedbackCompletion => "/feedback/completion".to_string(),
        }
    }

    /// Parse a path with optional query string. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let url = Url::parse("http://portal.local")
            .and_then(|base| base.join(path))
            .ok()?;

        match url.path().trim_end_matches('/') {
            "/login" | "" => Some(Route::Login),
            "/profile" => Some(Route::Profile),
            "/feedback" => Some(Route::Feedback {
                appointment_id: url
                    .query_pairs()
                    .find(|(k, _)| k == "appointmentId")
                    .map(|(_, v)| v.into_owned())
                    .filter(|v| !v.is_empty()),
            }),
            "/feedback/completion" => Some(Route::FeedbackCompletion),
            _ => None,
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Profile | Route::Feedback { .. })
    }

    /// Protected routes without a session resolve to the login screen.
    pub fn guard(self, session: Option<&ExpertSession>) -> Route {
        if self.requires_session() && session.is_none() {
            debug!("No session for {}, redirecting to login", self.path());
            Route::Login
        } else {
            self
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Receives navigation requests issued by the screens.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that forwards routes to the front-end's event loop.
#[derive(Clone)]
pub struct ChannelNavigator {
    sender: mpsc::UnboundedSender<Route>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        info!("Navigating to {}", route);
        if self.sender.send(route).is_err() {
            debug!("Navigation dropped, front-end loop is gone");
        }
    }
}

/// A navigation that fires after a delay. Dropping it before then cancels the redirect.
#[derive(Debug)]
pub struct ScheduledRedirect {
    route: Route,
    handle: JoinHandle<()>,
}

impl ScheduledRedirect {
    pub fn schedule(navigator: Arc<dyn Navigator>, route: Route, delay: Duration) -> Self {
        let target = route.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(target);
        });
        Self { route, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledRedirect {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!("Cancelling redirect to {}", self.route);
            self.handle.abort();
        }
    }
}
