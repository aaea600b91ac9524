//! Page-side helpers for a ticket QR-code display page.
//!
//! The helpers read the session cookie, cache rendered QR-code SVG markup in
//! a key-value storage facility, send fire-and-forget counter increments and
//! run the countdown that hides a QR code and fires an `increment` event.
//! Every browser collaborator is injected into a deterministic in-memory
//! [`Page`], so the whole flow can be driven and asserted from Rust.

use std::error::Error as StdError;
use std::fmt;

mod config;
mod cookie;
mod countdown;
mod dom;
mod events;
mod network;
mod page;
mod qr_cache;
mod regex;
mod scheduler;
mod storage;
mod trace;

pub use config::PageConfig;
pub use cookie::{CookieJar, CookieSource, SESSION_COOKIE, current_session, read_cookie};
pub use countdown::CountdownState;
pub use events::{DispatchedEvent, ListenerAction, RenderRequest};
pub use network::{HttpMethod, NetworkError, NetworkSink, OutboundRequest, SimulatedNetwork};
pub use page::{Page, TicketCardIds};
pub use qr_cache::{CACHE_KEY_PREFIX, QrCodeCache, cache_key};
pub use scheduler::{PendingTimer, TimerHandle};
pub use storage::{
    KeyValueStorage, MemoryStorage, STORAGE_PROBE_KEY, SharedStorage, StorageError,
    StorageKind, StorageResult, is_storage_available,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    ElementNotFound(String),
    MissingNode(String),
    InvalidConfig(String),
    TimerStepLimit(String),
    Regex(String),
    AssertionFailed {
        target: String,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::ElementNotFound(id) => write!(f, "element not found: #{id}"),
            Self::MissingNode(msg) => write!(f, "missing node: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::TimerStepLimit(msg) => write!(f, "timer step limit exceeded: {msg}"),
            Self::Regex(msg) => write!(f, "regex error: {msg}"),
            Self::AssertionFailed {
                target,
                expected,
                actual,
            } => write!(
                f,
                "assertion failed for {target}: expected {expected}, actual {actual}"
            ),
        }
    }
}

impl StdError for Error {}

impl From<regex::RegexError> for Error {
    fn from(value: regex::RegexError) -> Self {
        Self::Regex(value.to_string())
    }
}
