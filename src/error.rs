//! Failure taxonomy shared by the timer controller and the board engine.

/// External service a failed call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    TimeTracking,
    IssueTracking,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::TimeTracking => f.write_str("Harvest"),
            Service::IssueTracking => f.write_str("Jira"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Non-2xx response, including auth rejections.
    #[error("{service} returned HTTP {status}")]
    Network { service: Service, status: u16 },

    /// The request never produced a response.
    #[error("{service} request failed: {source}")]
    Transport {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("no transitions found")]
    TransitionsUnavailable,

    #[error("no transition into status {status}")]
    NoMatchingTransition { status: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Time-tracking or issue-tracking credentials are not configured.
    #[error("{0} credentials are not configured")]
    NotConfigured(Service),
}

pub type Result<T> = std::result::Result<T, SyncError>;
