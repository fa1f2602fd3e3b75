use std::fmt;

/// Errors that can occur while classifying or reconciling a navigation.
///
/// Cloneable so the router can hand the same error to every subscriber of
/// the notification channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterError {
    /// The href (or base) could not be parsed as a URL. Raised synchronously
    /// to whoever asked for the resolution; the router never catches it.
    InvalidUrl { input: String, message: String },
    /// Network-level failure (DNS, connection refused, reset mid-body).
    Network(String),
    /// The server answered with a non-success status.
    Status { status: u16, url: String },
    /// The response cannot carry a body (204, 205).
    EmptyBody { status: u16 },
    /// The host lacks a history API. Permanent for the router's lifetime.
    Unsupported,
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidUrl { input, message } => {
                write!(f, "invalid URL {input:?}: {message}")
            }
            RouterError::Network(msg) => write!(f, "network error: {msg}"),
            RouterError::Status { status, url } => write!(f, "HTTP {status} fetching {url}"),
            RouterError::EmptyBody { status } => write!(f, "response has no body (HTTP {status})"),
            RouterError::Unsupported => write!(f, "history API unavailable in this environment"),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<reqwest::Error> for RouterError {
    fn from(err: reqwest::Error) -> Self {
        RouterError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = RouterError::Status {
            status: 404,
            url: "http://localhost/missing".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 fetching http://localhost/missing");
        assert_eq!(
            RouterError::EmptyBody { status: 204 }.to_string(),
            "response has no body (HTTP 204)"
        );
        assert!(RouterError::Unsupported.to_string().contains("history"));
    }
}
