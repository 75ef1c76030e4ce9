use thiserror::Error;

/// All errors generated in `analyzer-client`.
///
/// Every variant is translated at the action boundary into an inline
/// panel message plus a transient toast; nothing here is fatal to the
/// dashboard.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (offline, DNS
    /// failure, connection refused, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx HTTP status. Carries the status code and the response
    /// body text verbatim so the UI can surface both.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Required user input was missing or malformed before any request
    /// was issued (no symbol, no date, no timeframe selected).
    #[error("validation: {0}")]
    Validation(String),

    /// A well-formed 2xx response containing zero usable records.
    #[error("no data available: {0}")]
    EmptyResult(String),

    /// A 2xx envelope with `success: false` and a backend-supplied
    /// error message.
    #[error("{0}")]
    Backend(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Writing a downloaded blob to disk failed.
    #[error("download write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether re-invoking the same action unchanged can plausibly
    /// succeed. Validation errors need different input first.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, ClientError::Validation(_))
    }

    /// HTTP status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ClientError::Decode(value.to_string())
        } else {
            ClientError::Network(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::Decode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_keeps_status_and_body() {
        let err = ClientError::Http {
            status: 500,
            body: "internal error".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("500"));
        assert!(rendered.contains("internal error"));
    }

    #[test]
    fn test_is_retriable() {
        struct TestCase {
            input: ClientError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: validation errors need new input, not a retry
                input: ClientError::Validation("no symbol".to_string()),
                expected: false,
            },
            TestCase {
                // TC1: network errors are retriable
                input: ClientError::Network("connection refused".to_string()),
                expected: true,
            },
            TestCase {
                // TC2: HTTP errors are retriable
                input: ClientError::Http {
                    status: 503,
                    body: "unavailable".to_string(),
                },
                expected: true,
            },
            TestCase {
                // TC3: empty results are retriable (data may arrive)
                input: ClientError::EmptyResult("no records".to_string()),
                expected: true,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_retriable(), test.expected, "TC{} failed", index);
        }
    }
}
