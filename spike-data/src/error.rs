use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `spike-data`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum DataError {
    #[error("invalid spike API url: {0}")]
    Url(String),

    #[error("failed to encode spike query parameters: {0}")]
    Query(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP error {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl DataError {
    /// Determine if an error is likely to clear up by itself on the next poll.
    ///
    /// Configuration errors (bad base url, unencodable query) never do.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::Http(_) => true,
            DataError::Status { status, .. } => *status >= 500 || *status == 429,
            DataError::Decode(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Http(value.to_string())
        }
    }
}

impl From<url::ParseError> for DataError {
    fn from(value: url::ParseError) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for DataError {
    fn from(value: serde_urlencoded::ser::Error) -> Self {
        Self::Query(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_is_transient() {
        struct TestCase {
            input: DataError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: is transient w/ DataError::Http
                input: DataError::Http("connection refused".to_string()),
                expected: true,
            },
            TestCase {
                // TC1: is transient w/ DataError::Status 503
                input: DataError::Status {
                    status: 503,
                    url: "http://localhost:3000/api/spikes".to_string(),
                },
                expected: true,
            },
            TestCase {
                // TC2: is transient w/ DataError::Status 429
                input: DataError::Status {
                    status: 429,
                    url: "http://localhost:3000/api/spikes".to_string(),
                },
                expected: true,
            },
            TestCase {
                // TC3: is not transient w/ DataError::Status 404
                input: DataError::Status {
                    status: 404,
                    url: "http://localhost:3000/api/spikes".to_string(),
                },
                expected: false,
            },
            TestCase {
                // TC4: is not transient w/ DataError::Url
                input: DataError::from(url::Url::parse("not a url").unwrap_err()),
                expected: false,
            },
            TestCase {
                // TC5: is transient w/ DataError::Decode
                input: DataError::Decode("expected value at line 1 column 1".to_string()),
                expected: true,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_transient();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
