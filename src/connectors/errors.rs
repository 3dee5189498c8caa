use std::fmt;

/// Errors that can occur while talking to the upstream model provider
#[derive(Debug)]
pub enum ConnectorError {
    /// Non-2xx response or provider-reported error
    HttpError(String),
    /// Provider unreachable or timeout
    ServiceUnavailable(String),
    /// Response body we could not understand
    InvalidResponse(String),
    /// Missing or rejected API key (401/403)
    Unauthorized(String),
    /// Rate limited or exceeded quota (429)
    RateLimited(String),
    /// Internal error in connector
    Internal(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl ConnectorError {
    /// Classify a non-success provider response.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = format!("HTTP {} - {}", status.as_u16(), body.trim());
        match status.as_u16() {
            401 | 403 => Self::Unauthorized(detail),
            429 => Self::RateLimited(detail),
            502..=504 => Self::ServiceUnavailable(detail),
            _ => Self::HttpError(detail),
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ServiceUnavailable(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Self::ServiceUnavailable(format!("Connection failed: {}", err))
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ConnectorError::from_status(StatusCode::UNAUTHORIZED, ""),
            ConnectorError::Unauthorized(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ConnectorError::RateLimited(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(StatusCode::BAD_GATEWAY, ""),
            ConnectorError::ServiceUnavailable(_)
        ));

        let err = ConnectorError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom\n");
        assert_eq!(err.to_string(), "HTTP error: HTTP 500 - boom");
    }
}
