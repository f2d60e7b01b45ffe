//! Explicit session context.
//!
//! A [`SessionManager`] owns the lifecycle of the bearer token: `begin` on login,
//! `current` at every protected screen mount, `end` on logout. Screens receive the
//! resulting [`ExpertSession`] and pass it into each authenticated API call.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{error::Result, models::Credentials, store::LocalStore};

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "userInfo";

/// An authenticated expert: bearer token plus the user object returned at login.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpertSession {
    token: String,
    user: Value,
}

impl ExpertSession {
    pub fn new(token: impl Into<String>, user: Value) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &Value {
        &self.user
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn LocalStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Persist credentials and return the live session.
    pub async fn begin(&self, credentials: Credentials) -> Result<ExpertSession> {
        self.store
            .set(TOKEN_KEY, credentials.token.clone())
            .await?;
        self.store
            .set(USER_KEY, serde_json::to_string(&credentials.user)?)
            .await?;
        info!("Session started");
        Ok(ExpertSession::new(credentials.token, credentials.user))
    }

    /// Session currently persisted, if any. A missing or empty token means signed out.
    pub async fn current(&self) -> Result<Option<ExpertSession>> {
        let token = match self.store.get(TOKEN_KEY).await? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };

        let user = match self.store.get(USER_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Stored user object is unreadable: {}", e);
                Value::Null
            }),
            None => Value::Null,
        };

        Ok(Some(ExpertSession::new(token, user)))
    }

    pub async fn end(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY).await?;
        self.store.remove(USER_KEY).await?;
        info!("Session ended");
        Ok(())
    }
}
