//! Uniform caller-facing response shape.

use serde::{Deserialize, Serialize};

use crate::summary::{ExtractionResult, SummaryResult};

/// Message used when a failure carries no description of its own
pub const GENERIC_FAILURE: &str = "Failed to generate summary";

/// `{ text, success: true }` or `{ error, success: false }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

impl SummaryResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error: None,
            success: true,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            error
        };
        Self {
            text: None,
            error: Some(error),
            success: false,
        }
    }
}

impl From<SummaryResult> for SummaryResponse {
    fn from(result: SummaryResult) -> Self {
        if result.success {
            Self::success(result.text)
        } else {
            Self::failure(result.error.unwrap_or_default())
        }
    }
}

/// Raw extraction output, with the title as a first line.
impl From<ExtractionResult> for SummaryResponse {
    fn from(result: ExtractionResult) -> Self {
        if result.success {
            Self::success(format!("{}\n\n{}", result.title, result.content))
        } else {
            Self::failure(result.error.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_results_map_to_exclusive_shapes() {
        let ok = SummaryResponse::from(SummaryResult::ok("summary"));
        assert_eq!(ok, SummaryResponse::success("summary"));

        let failed = SummaryResponse::from(SummaryResult::failed("quota"));
        assert!(!failed.success);
        assert!(failed.text.is_none());
        assert_eq!(failed.error.as_deref(), Some("quota"));
    }

    #[test]
    fn failure_without_message_gets_generic_text() {
        let malformed = SummaryResult {
            text: String::new(),
            success: false,
            error: None,
        };
        let response = SummaryResponse::from(malformed);
        assert_eq!(response.error.as_deref(), Some(GENERIC_FAILURE));
    }

    #[test]
    fn extraction_results_map_too() {
        let ok = SummaryResponse::from(ExtractionResult::ok("Title", "Body"));
        assert_eq!(ok.text.as_deref(), Some("Title\n\nBody"));

        let failed = SummaryResponse::from(ExtractionResult::failed("HTTP 404 Not Found"));
        assert_eq!(failed.error.as_deref(), Some("HTTP 404 Not Found"));
    }

    #[test]
    fn wire_shape_omits_absent_fields() {
        let json = serde_json::to_value(SummaryResponse::success("x")).expect("json");
        assert_eq!(json, serde_json::json!({ "text": "x", "success": true }));

        let json = serde_json::to_value(SummaryResponse::failure("bad")).expect("json");
        assert_eq!(json, serde_json::json!({ "error": "bad", "success": false }));
    }
}
