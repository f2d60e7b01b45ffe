//! Sign-in / sign-up form.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{
    api::ExpertApi,
    config::PortalConfig,
    models::{LoginRequest, SignupRequest},
    route::{Navigator, Route, ScheduledRedirect},
    session::SessionManager,
};

pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub const LOGIN_SUCCESS: &str = "Login Successful! Redirecting";
pub const LOGIN_FAILED: &str = "Invalid email or password";
pub const SIGNUP_SUCCESS: &str = "Registered Successfully! Please login...";
pub const SIGNUP_FAILED: &str = "Registration failed. Try again.";
pub const SESSION_SAVE_FAILED: &str = "Could not save your session.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthFields {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub confirm_password: String,
    pub specialization: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Session persisted; navigation to the profile is scheduled
    SignedIn { redirect_after: Duration },
    /// Account created; call [`AuthForm::finish_registration`] after `switch_after`
    Registered { switch_after: Duration },
    /// Nothing changed; see [`AuthForm::error`]
    Failed,
}

pub struct AuthForm {
    api: Arc<dyn ExpertApi>,
    sessions: SessionManager,
    navigator: Arc<dyn Navigator>,
    login_redirect_delay: Duration,
    signup_switch_delay: Duration,
    mode: AuthMode,
    fields: AuthFields,
    message: Option<String>,
    error: Option<String>,
    redirect: Option<ScheduledRedirect>,
}

impl AuthForm {
    pub fn new(
        api: Arc<dyn ExpertApi>,
        sessions: SessionManager,
        navigator: Arc<dyn Navigator>,
        config: &PortalConfig,
    ) -> Self {
        Self {
            api,
            sessions,
            navigator,
            login_redirect_delay: config.login_redirect_delay(),
            signup_switch_delay: config.signup_switch_delay(),
            mode: AuthMode::SignIn,
            fields: AuthFields::default(),
            message: None,
            error: None,
            redirect: None,
        }
    }

    /// Send an already signed-in expert straight to the profile. Returns whether it did.
    pub async fn mount(&self) -> bool {
        match self.sessions.current().await {
            Ok(Some(_)) => {
                info!("Existing session found, skipping sign-in");
                self.navigator.navigate(Route::Profile);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read stored session: {}", e);
                false
            }
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn fields(&self) -> &AuthFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut AuthFields {
        &mut self.fields
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Switch between sign-in and sign-up, clearing every field and message.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.fields = AuthFields::default();
        self.message = None;
        self.error = None;
    }

    pub async fn submit(&mut self) -> AuthOutcome {
        match self.mode {
            AuthMode::SignIn => self.sign_in().await,
            AuthMode::SignUp => self.sign_up().await,
        }
    }

    /// Return to sign-in after a successful registration. Fields are kept.
    pub fn finish_registration(&mut self) {
        self.mode = AuthMode::SignIn;
        self.message = None;
    }

    async fn sign_in(&mut self) -> AuthOutcome {
        let request = LoginRequest {
            email: self.fields.email.clone(),
            password: self.fields.password.clone(),
        };

        let credentials = match self.api.login(&request).await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Login failed: {}", e);
                return self.fail(e.server_message().unwrap_or(LOGIN_FAILED).to_string());
            }
        };

        if let Err(e) = self.sessions.begin(credentials).await {
            error!("Failed to persist session: {}", e);
            return self.fail(SESSION_SAVE_FAILED.to_string());
        }

        self.message = Some(LOGIN_SUCCESS.to_string());
        self.error = None;
        self.redirect = Some(ScheduledRedirect::schedule(
            self.navigator.clone(),
            Route::Profile,
            self.login_redirect_delay,
        ));

        AuthOutcome::SignedIn {
            redirect_after: self.login_redirect_delay,
        }
    }

    async fn sign_up(&mut self) -> AuthOutcome {
        if self.fields.password != self.fields.confirm_password {
            return self.fail(PASSWORD_MISMATCH.to_string());
        }

        let request = SignupRequest {
            name: self.fields.name.clone(),
            email: self.fields.email.clone(),
            mobile: self.fields.mobile.clone(),
            password: self.fields.password.clone(),
            specialization: self.fields.specialization.clone(),
        };

        match self.api.signup(&request).await {
            Ok(()) => {
                info!("Expert registered");
                self.message = Some(SIGNUP_SUCCESS.to_string());
                self.error = None;
                AuthOutcome::Registered {
                    switch_after: self.signup_switch_delay,
                }
            }
            Err(e) => {
                warn!("Signup failed: {}", e);
                self.fail(e.server_message().unwrap_or(SIGNUP_FAILED).to_string())
            }
        }
    }

    fn fail(&mut self, message: String) -> AuthOutcome {
        self.error = Some(message);
        AuthOutcome::Failed
    }
}
