use anyhow::Result;
use expert_portal::completion::{COMPLETION_BODY, COMPLETION_HINT, COMPLETION_TITLE};
use expert_portal::{
    ActionOutcome, AuthForm, AuthMode, AuthOutcome, CompletionScreen, Dashboard, Decision,
    ExpertApi, FeedbackFlow, FeedbackState, Navigator, PortalConfig, PortalError, Route,
    SessionManager, Tab,
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::prompt::{Prompt, pick};
use crate::render;

const DASHBOARD_HELP: &str = "Commands: tab <1-5> | confirm <id> | reject <id> | edit | \
                              feedback <id> | logout | quit";

/// Drives the portal screens, following the routes the screens navigate to.
pub struct Portal {
    api: Arc<dyn ExpertApi>,
    sessions: SessionManager,
    navigator: Arc<dyn Navigator>,
    routes: UnboundedReceiver<Route>,
    config: PortalConfig,
    prompt: Prompt,
}

impl Portal {
    pub fn new(
        api: Arc<dyn ExpertApi>,
        sessions: SessionManager,
        navigator: Arc<dyn Navigator>,
        routes: UnboundedReceiver<Route>,
        config: PortalConfig,
    ) -> Self {
        Self {
            api,
            sessions,
            navigator,
            routes,
            config,
            prompt: Prompt::new(),
        }
    }

    pub async fn run(mut self, start: Route) -> Result<()> {
        let mut route = start;
        loop {
            let session = match self.sessions.current().await {
                Ok(session) => session,
                Err(e) => {
                    warn!("Could not read stored session: {}", e);
                    None
                }
            };
            let target = route.guard(session.as_ref());
            debug!("Showing {}", target);

            let next = match &target {
                Route::Login => self.login().await?,
                Route::Profile => self.profile().await?,
                Route::Feedback { .. } => self.feedback(&target).await?,
                Route::FeedbackCompletion => self.completion().await?,
            };
            match next {
                Some(next) => route = next,
                None => return Ok(()),
            }
        }
    }

    /// Wait for the navigation a screen scheduled.
    async fn next_route(&mut self) -> Option<Route> {
        self.routes.recv().await
    }

    fn pending_route(&mut self) -> Option<Route> {
        self.routes.try_recv().ok()
    }

    async fn login(&mut self) -> Result<Option<Route>> {
        let mut form = AuthForm::new(
            self.api.clone(),
            self.sessions.clone(),
            self.navigator.clone(),
            &self.config,
        );
        if form.mount().await {
            return Ok(self.next_route().await);
        }

        loop {
            let title = match form.mode() {
                AuthMode::SignIn => "Expert Login",
                AuthMode::SignUp => "Expert Sign Up",
            };
            println!("\n== {} == (blank email to switch, ctrl-d to quit)", title);

            let Some(email) = self.prompt.ask("Email").await? else {
                return Ok(None);
            };
            if email.is_empty() {
                form.toggle_mode();
                continue;
            }

            if form.mode() == AuthMode::SignUp {
                let Some(name) = self.prompt.ask("Name").await? else {
                    return Ok(None);
                };
                let Some(mobile) = self.prompt.ask("Mobile").await? else {
                    return Ok(None);
                };
                let Some(specialization) = self.prompt.ask("Specialization").await? else {
                    return Ok(None);
                };
                let fields = form.fields_mut();
                fields.name = name;
                fields.mobile = mobile;
                fields.specialization = specialization;
            }

            let Some(password) = self.prompt.ask("Password").await? else {
                return Ok(None);
            };
            form.fields_mut().email = email;
            form.fields_mut().password = password;

            if form.mode() == AuthMode::SignUp {
                let Some(confirm) = self.prompt.ask("Confirm password").await? else {
                    return Ok(None);
                };
                form.fields_mut().confirm_password = confirm;
            }

            match form.submit().await {
                AuthOutcome::SignedIn { .. } => {
                    println!("{}", form.message().unwrap_or_default());
                    return Ok(self.next_route().await);
                }
                AuthOutcome::Registered { switch_after } => {
                    println!("{}", form.message().unwrap_or_default());
                    tokio::time::sleep(switch_after).await;
                    form.finish_registration();
                }
                AuthOutcome::Failed => {
                    if let Some(error) = form.error() {
                        println!("{}", error);
                    }
                }
            }
        }
    }

    async fn profile(&mut self) -> Result<Option<Route>> {
        let Some(dashboard) = Dashboard::mount(
            self.api.clone(),
            self.sessions.clone(),
            self.navigator.clone(),
        )
        .await
        else {
            return Ok(self.next_route().await);
        };

        loop {
            println!("\n{}", render::dashboard(&dashboard.snapshot()));
            println!("{}", DASHBOARD_HELP);

            let Some(line) = self.prompt.ask(">").await? else {
                return Ok(None);
            };
            let (command, arg) = match line.split_once(' ') {
                Some((command, arg)) => (command, arg.trim()),
                None => (line.as_str(), ""),
            };

            match command {
                "tab" => match arg.parse::<usize>().ok().and_then(|n| {
                    n.checked_sub(1).and_then(|idx| Tab::ALL.get(idx).copied())
                }) {
                    Some(tab) => dashboard.switch_tab(tab).await,
                    None => println!("Unknown tab: {}", arg),
                },
                "confirm" | "reject" if !arg.is_empty() => {
                    let decision = if command == "confirm" {
                        Decision::Confirmed
                    } else {
                        Decision::Rejected
                    };
                    if dashboard.decide(arg, decision).await == ActionOutcome::Refused {
                        println!("Still waiting on the previous request for {}", arg);
                    }
                }
                "edit" => self.edit_profile(&dashboard).await?,
                "feedback" if !arg.is_empty() => {
                    dashboard.fill_feedback(arg);
                }
                "logout" => dashboard.logout().await,
                "quit" | "exit" => return Ok(None),
                "" => {}
                _ => println!("Unknown command: {}", line),
            }

            if let Some(route) = self.pending_route() {
                return Ok(Some(route));
            }
        }
    }

    async fn edit_profile(&mut self, dashboard: &Dashboard) -> Result<()> {
        dashboard.begin_edit();
        let Some(draft) = dashboard.snapshot().draft else {
            dashboard.cancel_edit();
            println!("Profile is not loaded yet.");
            return Ok(());
        };

        let fields = [
            ("Name", draft.name.clone()),
            ("Specialization", draft.specialization.clone()),
            ("Address", draft.address.clone()),
            ("Gender", draft.gender.clone()),
        ];
        let mut answers = Vec::with_capacity(fields.len());
        for (label, current) in &fields {
            match self.prompt.ask_with_default(label, current).await? {
                Some(answer) => answers.push(answer),
                None => {
                    dashboard.cancel_edit();
                    return Ok(());
                }
            }
        }

        if let [name, specialization, address, gender] = answers.as_slice() {
            dashboard.edit_draft(|draft| {
                draft.name = name.clone();
                draft.specialization = specialization.clone();
                draft.address = address.clone();
                draft.gender = gender.clone();
            });
        }

        if dashboard.save_profile().await == ActionOutcome::Failed {
            dashboard.cancel_edit();
        }
        Ok(())
    }

    async fn feedback(&mut self, route: &Route) -> Result<Option<Route>> {
        let flow = FeedbackFlow::for_route(
            self.api.clone(),
            self.navigator.clone(),
            route,
            &self.config,
        );
        let Some(appointment_id) = flow.appointment_id().map(str::to_string) else {
            println!("No appointment selected.");
            return Ok(Some(Route::Profile));
        };
        println!("\n== Feedback for appointment {} ==", appointment_id);

        let mut state = flow.load().await;
        loop {
            match state {
                FeedbackState::Presenting(question) => {
                    print!("\n{}", render::question(&question));
                    let Some(line) = self.prompt.ask("Answer").await? else {
                        return Ok(None);
                    };
                    let answer = if question.options.is_empty() {
                        line
                    } else {
                        match pick(&line, &question.options) {
                            Some(option) => option.to_string(),
                            None => {
                                println!("Choose one of the listed options.");
                                state = flow.state();
                                continue;
                            }
                        }
                    };
                    state = match flow.answer(answer).await {
                        Ok(state) => state,
                        Err(PortalError::InvalidAnswer(reason)) => {
                            println!("{}", reason);
                            flow.state()
                        }
                        Err(e) => return Err(e.into()),
                    };
                }
                FeedbackState::Completed => return Ok(self.next_route().await),
                FeedbackState::Failed(message) => {
                    println!("{}", message);
                    self.prompt.ask("Press enter to return to your profile").await?;
                    return Ok(Some(Route::Profile));
                }
                other => {
                    debug!("Feedback flow idle in {:?}", other);
                    return Ok(Some(Route::Profile));
                }
            }
        }
    }

    async fn completion(&mut self) -> Result<Option<Route>> {
        println!("\n{}\n{}\n{}", COMPLETION_TITLE, COMPLETION_BODY, COMPLETION_HINT);
        let _screen =
            CompletionScreen::mount(self.navigator.clone(), self.config.completion_redirect_delay());
        Ok(self.next_route().await)
    }
}
