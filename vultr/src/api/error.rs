use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed, check the api_key")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    /// The object addressed by the request does not exist (any more)
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::ApiError { status: 404, .. } => true,
            ApiError::ApiError { message, .. } => {
                let message = message.to_lowercase();
                message.contains("not found")
                    || (message.contains("invalid") && message.contains(" id"))
            }
            _ => false,
        }
    }

    /// The object is still referenced, e.g. a VPC with attached instances;
    /// deletes of such objects succeed once the references are gone
    pub fn is_in_use(&self) -> bool {
        match self {
            ApiError::ApiError { message, .. } => {
                let message = message.to_lowercase();
                message.contains("attached")
                    || message.contains("in use")
                    || message.contains("still has")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected_by_status_and_message() {
        let gone = ApiError::ApiError {
            status: 404,
            message: "".to_string(),
        };
        assert!(gone.is_not_found());

        let invalid = ApiError::ApiError {
            status: 400,
            message: "invalid instance ID".to_string(),
        };
        assert!(invalid.is_not_found());

        let bad_request = ApiError::ApiError {
            status: 400,
            message: "plan is not available in this region".to_string(),
        };
        assert!(!bad_request.is_not_found());
        assert!(!ApiError::RateLimited.is_not_found());
    }

    #[test]
    fn in_use_errors_are_recognised() {
        let attached = ApiError::ApiError {
            status: 400,
            message: "Unable to delete VPC: still attached to 1 instance".to_string(),
        };
        assert!(attached.is_in_use());
        assert!(!attached.is_not_found());
        assert!(!ApiError::ServiceUnavailable.is_in_use());
    }

    #[test]
    fn api_error_formatting_includes_status() {
        let error = ApiError::ApiError {
            status: 400,
            message: "Invalid region".to_string(),
        };
        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("Invalid region"));
    }
}
