use std::sync::Arc;
use std::time::Duration;

use crate::route::{Navigator, Route, ScheduledRedirect};

pub const COMPLETION_TITLE: &str = "Feedback Submitted Successfully!";
pub const COMPLETION_BODY: &str = "Your feedback has been recorded and sent for review.";
pub const COMPLETION_HINT: &str =
    "You will be redirected to your profile shortly to view your appointments.";

/// Confirmation shown after feedback submission. Returns to the profile after a delay;
/// dropping the screen first cancels the redirect.
pub struct CompletionScreen {
    redirect: ScheduledRedirect,
}

impl CompletionScreen {
    pub fn mount(navigator: Arc<dyn Navigator>, delay: Duration) -> Self {
        Self {
            redirect: ScheduledRedirect::schedule(navigator, Route::Profile, delay),
        }
    }

    pub fn redirected(&self) -> bool {
        self.redirect.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNavigator;

    #[tokio::test]
    async fn test_redirects_to_profile() {
        let navigator = Arc::new(RecordingNavigator::default());
        let screen = CompletionScreen::mount(navigator.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(screen.redirected());
        assert_eq!(navigator.routes(), vec![Route::Profile]);
    }

    #[tokio::test]
    async fn test_teardown_cancels_redirect() {
        let navigator = Arc::new(RecordingNavigator::default());
        let screen = CompletionScreen::mount(navigator.clone(), Duration::from_millis(40));
        drop(screen);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(navigator.routes().is_empty());
    }
}
