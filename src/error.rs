use reqwest::StatusCode;
use thiserror::Error;

/// Network failure or a non-2xx answer from the backend.
///
/// Not subdivided by cause; callers only report it.
#[derive(Debug, Error)]
#[error("transport error: {}", describe(.status, .source))]
pub struct TransportError {
    status: Option<StatusCode>,
    #[source]
    source: Option<reqwest::Error>,
}

impl TransportError {
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            source: None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Status code shown to the operator. Failures without any HTTP answer read as 500.
    pub fn display_status(&self) -> u16 {
        self.status
            .map(|status| status.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self {
            status: error.status(),
            source: Some(error),
        }
    }
}

fn describe(status: &Option<StatusCode>, source: &Option<reqwest::Error>) -> String {
    match (status, source) {
        (Some(status), _) => format!("HTTP {status}"),
        (None, Some(source)) => source.to_string(),
        (None, None) => "no response".to_string(),
    }
}

/// Filter or paging input rejected before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page number must be at least 1, got {0}")]
    InvalidPageNumber(u32),

    #[error("page size must be at least 1, got {0}")]
    InvalidPageSize(u32),

    #[error("status filter must be -1, 0, 1 or 2, got {0}")]
    InvalidStatus(i32),

    #[error("unrecognized status filter {0:?}")]
    UnknownStatusName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_report_their_code() {
        let error = TransportError::from_status(StatusCode::BAD_GATEWAY);

        assert_eq!(error.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(error.display_status(), 502);
        assert!(error.to_string().contains("502"));
    }

    #[test]
    fn missing_status_reads_as_500() {
        let error = TransportError {
            status: None,
            source: None,
        };

        assert_eq!(error.display_status(), 500);
        assert_eq!(error.to_string(), "transport error: no response");
    }
}
