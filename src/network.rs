use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-way request: no body, and nobody waits for the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub path: String,
}

impl OutboundRequest {
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
        }
    }
}

impl fmt::Display for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError {
    pub request: OutboundRequest,
    pub reason: String,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.request, self.reason)
    }
}

impl std::error::Error for NetworkError {}

/// Transport for fire-and-forget requests. Callers only ever log the error.
pub trait NetworkSink {
    fn send(&mut self, request: OutboundRequest) -> Result<(), NetworkError>;
}

/// Stateless sink that accepts every request while online and rejects every
/// request while offline. What was sent is recorded by the page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedNetwork {
    offline: bool,
}

impl SimulatedNetwork {
    pub fn online() -> Self {
        Self { offline: false }
    }

    pub fn offline() -> Self {
        Self { offline: true }
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }
}

impl NetworkSink for SimulatedNetwork {
    fn send(&mut self, request: OutboundRequest) -> Result<(), NetworkError> {
        if self.offline {
            return Err(NetworkError {
                request,
                reason: "network is offline".into(),
            });
        }
        Ok(())
    }
}

pub(crate) fn ticket_path(endpoint: &str, ticket_id: impl fmt::Display, action: &str) -> String {
    format!("{}/{ticket_id}/{action}", endpoint.trim_end_matches('/'))
}
