//! Transport-level errors and their mapping onto the record failure taxonomy.

use crate::record::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The transfer stopped because someone asked it to.
    Cancelled,
    /// Timeouts, refused connections, resets, DNS failures.
    Network,
    /// The server answered with a status the transfer cannot use; `code`
    /// holds the HTTP status.
    Server,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{description} (code {code})")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub code: i32,
    pub description: String,
}

impl TransportError {
    pub fn cancelled() -> Self {
        Self {
            kind: TransportErrorKind::Cancelled,
            code: 0,
            description: "cancelled".to_string(),
        }
    }

    pub fn network(code: i32, description: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            code,
            description: description.into(),
        }
    }

    pub fn server(status: u16, description: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Server,
            code: i32::from(status),
            description: description.into(),
        }
    }

    pub fn other(code: i32, description: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            code,
            description: description.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == TransportErrorKind::Cancelled
    }

    /// Failure to store on the record; `None` for cancellations, which are
    /// never failures.
    pub fn into_failure(self) -> Option<FailureKind> {
        match self.kind {
            TransportErrorKind::Cancelled => None,
            TransportErrorKind::Network => Some(FailureKind::Transport {
                code: self.code,
                description: self.description,
            }),
            TransportErrorKind::Server => Some(FailureKind::ServerError {
                status: u16::try_from(self.code).unwrap_or(0),
            }),
            TransportErrorKind::Other => Some(FailureKind::Unknown {
                code: self.code,
                description: self.description,
            }),
        }
    }
}

pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Failure for a completed response; `None` when the status is 2xx.
pub fn classify_http_status(status: u16) -> Option<FailureKind> {
    (!is_success_status(status)).then_some(FailureKind::ServerError { status })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(is_success_status(200));
        assert!(is_success_status(206));
        assert!(!is_success_status(199));
        assert!(!is_success_status(300));
        assert!(!is_success_status(404));
    }

    #[test]
    fn http_status_classification() {
        assert_eq!(classify_http_status(200), None);
        assert_eq!(
            classify_http_status(503),
            Some(FailureKind::ServerError { status: 503 })
        );
        assert_eq!(
            classify_http_status(404),
            Some(FailureKind::ServerError { status: 404 })
        );
    }

    #[test]
    fn cancellation_is_never_a_failure() {
        assert_eq!(TransportError::cancelled().into_failure(), None);
    }

    #[test]
    fn network_and_other_map_to_taxonomy() {
        assert_eq!(
            TransportError::network(7, "couldn't connect").into_failure(),
            Some(FailureKind::Transport {
                code: 7,
                description: "couldn't connect".to_string()
            })
        );
        assert_eq!(
            TransportError::server(416, "range not satisfiable").into_failure(),
            Some(FailureKind::ServerError { status: 416 })
        );
        assert_eq!(
            TransportError::other(99, "weird").into_failure(),
            Some(FailureKind::Unknown {
                code: 99,
                description: "weird".to_string()
            })
        );
    }
}
