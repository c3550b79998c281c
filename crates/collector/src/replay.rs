//! Fixture-backed CloudApi implementation
//!
//! Serves canned responses from a local directory laid out as
//! `{root}/{service}/{region}/{operation}.json`. Used for offline runs and
//! end-to-end tests; the live transport is an external collaborator.
//!
//! A fixture may simulate a failure instead of a payload:
//!
//! ```json
//! {"error": {"code": "AccessDenied", "message": "not authorized"}}
//! ```

use crate::api::{ApiError, ApiPage, ApiRequest, CloudApi};
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Replays recorded responses from a fixture directory
pub struct ReplayApi {
    root: PathBuf,
}

impl ReplayApi {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CloudApi for ReplayApi {
    async fn invoke(&self, request: &ApiRequest) -> Result<ApiPage, ApiError> {
        let path = self
            .root
            .join(&request.service)
            .join(&request.region)
            .join(format!("{}.json", request.operation));

        if !path.is_file() {
            return Err(ApiError::NotFound(format!(
                "no fixture for {}.{} in {}",
                request.service, request.operation, request.region
            )));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ApiError::Connection(format!("cannot read {}: {e}", path.display())))?;
        let body: Value = serde_json::from_str(&content)
            .map_err(|e| ApiError::Malformed(format!("fixture {}: {e}", path.display())))?;

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_str).unwrap_or("Other");
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("simulated error")
                .to_string();
            return Err(match code {
                "AccessDenied" => ApiError::AccessDenied(message),
                "Throttled" => ApiError::Throttled(message),
                "NotFound" => ApiError::NotFound(message),
                "Unsupported" => ApiError::Unsupported(message),
                "Timeout" => ApiError::Timeout(message),
                "Connection" => ApiError::Connection(message),
                _ => ApiError::Other(message),
            });
        }

        // Fixtures are single-page captures
        Ok(ApiPage {
            body,
            next_token: None,
        })
    }
}
