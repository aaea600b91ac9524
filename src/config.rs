use crate::cookie::SESSION_COOKIE;
use crate::storage::StorageKind;
use crate::{Error, Result};

/// Delay between starting a countdown and hiding the QR code.
pub(crate) const DEFAULT_COUNTDOWN_MS: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub countdown_ms: i64,
    pub session_cookie: String,
    pub tickets_endpoint: String,
    pub storage_kind: StorageKind,
    pub timer_step_limit: usize,
    pub trace_log_limit: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            countdown_ms: DEFAULT_COUNTDOWN_MS,
            session_cookie: SESSION_COOKIE.to_string(),
            tickets_endpoint: "/tickets".to_string(),
            storage_kind: StorageKind::Local,
            timer_step_limit: 10_000,
            trace_log_limit: 10_000,
        }
    }
}

impl PageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.countdown_ms < 0 {
            return Err(Error::InvalidConfig(format!(
                "countdown_ms must be non-negative (got {})",
                self.countdown_ms
            )));
        }
        if self.session_cookie.is_empty() {
            return Err(Error::InvalidConfig(
                "session_cookie must not be empty".into(),
            ));
        }
        if !self.tickets_endpoint.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "tickets_endpoint must start with '/' (got {:?})",
                self.tickets_endpoint
            )));
        }
        if self.timer_step_limit == 0 {
            return Err(Error::InvalidConfig(
                "timer_step_limit requires at least 1 step".into(),
            ));
        }
        if self.trace_log_limit == 0 {
            return Err(Error::InvalidConfig(
                "trace_log_limit requires at least 1 entry".into(),
            ));
        }
        Ok(())
    }
}
