use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api {
        status: u16,
        /// Service error code such as `LTS.2504`, when the body carried one
        code: Option<String>,
        message: String,
    },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Authentication failed, check the token")]
    Auth,

    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl ApiError {
    /// True when the error means the resource does not exist. A plain 404
    /// always qualifies; some endpoints instead wrap a service code such as
    /// `LTS.2504` in another status, so callers pass the codes their
    /// endpoint uses.
    pub fn is_not_found(&self, codes: &[&str]) -> bool {
        match self {
            ApiError::Api { status: 404, .. } => true,
            ApiError::Api {
                code: Some(code), ..
            } => codes.contains(&code.as_str()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matches_status_and_codes() {
        let plain = ApiError::Api {
            status: 404,
            code: None,
            message: "gone".to_string(),
        };
        assert!(plain.is_not_found(&[]));

        let coded = ApiError::Api {
            status: 500,
            code: Some("LTS.2504".to_string()),
            message: "config not found".to_string(),
        };
        assert!(coded.is_not_found(&["LTS.2504"]));
        assert!(!coded.is_not_found(&["LTS.0001"]));

        assert!(!ApiError::Auth.is_not_found(&["LTS.2504"]));
    }
}
