use dashmap::DashSet;
use std::sync::Arc;

use crate::error::{PortalError, Result};

/// Registry of actions currently awaiting the server.
///
/// A control whose key is registered should be disabled; a second attempt is refused
/// until the first [`InFlightTicket`] is dropped.
#[derive(Clone, Default, Debug)]
pub struct InFlight {
    active: Arc<DashSet<String>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, key: impl Into<String>) -> Result<InFlightTicket> {
        let key = key.into();
        if !self.active.insert(key.clone()) {
            return Err(PortalError::InFlight(key));
        }
        Ok(InFlightTicket {
            key,
            active: self.active.clone(),
        })
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct InFlightTicket {
    key: String,
    active: Arc<DashSet<String>>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}
