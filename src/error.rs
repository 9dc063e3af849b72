use crate::{models::UpstreamService, schema::SchemaViolation};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Upstream bodies are cut to this many characters before they are logged
/// or returned to the caller.
pub const MAX_UPSTREAM_BODY_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum MemeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(SchemaViolation),

    #[error("{service} service is unavailable: {reason}")]
    UpstreamUnavailable {
        service: UpstreamService,
        reason: String,
    },

    #[error("{service} service {}", upstream_failure(.status, .body))]
    UpstreamError {
        service: UpstreamService,
        status: u16,
        body: String,
    },

    #[error("{service} service response violated the expected schema: {violation}")]
    SchemaViolation {
        service: UpstreamService,
        violation: SchemaViolation,
    },

    #[error("{service} service returned neither imageUrl nor imageData")]
    MissingImageData { service: UpstreamService },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MemeError>;

/// JSON body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub message: String,
    pub details: Value,
}

impl MemeError {
    pub fn unavailable(service: UpstreamService, reason: impl Into<String>) -> Self {
        MemeError::UpstreamUnavailable {
            service,
            reason: reason.into(),
        }
    }

    pub fn upstream(service: UpstreamService, status: u16, body: &str) -> Self {
        MemeError::UpstreamError {
            service,
            status,
            body: truncate_body(body),
        }
    }

    pub fn schema(service: UpstreamService, violation: SchemaViolation) -> Self {
        MemeError::SchemaViolation { service, violation }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MemeError::Config(_) | MemeError::Internal(_) => "internal_error",
            MemeError::Validation(_) => "validation_error",
            MemeError::UpstreamUnavailable { .. } => "upstream_unavailable",
            MemeError::UpstreamError { .. } => "upstream_error",
            MemeError::SchemaViolation { .. } => "schema_violation",
            MemeError::MissingImageData { .. } => "missing_image_data",
        }
    }

    pub fn service(&self) -> Option<UpstreamService> {
        match self {
            MemeError::UpstreamUnavailable { service, .. }
            | MemeError::UpstreamError { service, .. }
            | MemeError::SchemaViolation { service, .. }
            | MemeError::MissingImageData { service } => Some(*service),
            _ => None,
        }
    }

    /// Operator-facing hint attached to upstream failures.
    pub fn action(&self) -> Option<String> {
        let service = self.service()?;
        let hint = match self {
            MemeError::UpstreamUnavailable { .. } => format!(
                "Check {} and network connectivity to the {} service",
                service.url_variable(),
                service
            ),
            MemeError::UpstreamError { .. } => format!(
                "The {} service rejected the request; inspect the upstream status and body",
                service
            ),
            MemeError::SchemaViolation { .. } => format!(
                "The {} service output did not match the required contract",
                service
            ),
            MemeError::MissingImageData { .. } => format!(
                "The {} service must return imageUrl or imageData",
                service
            ),
            _ => return None,
        };
        Some(hint)
    }

    pub fn details(&self) -> Value {
        let mut details = match self {
            MemeError::Validation(violation) | MemeError::SchemaViolation { violation, .. } => {
                json!({ "field": violation.field, "reason": violation.reason })
            }
            MemeError::UpstreamError { status, body, .. } => {
                json!({ "status": status, "body": body })
            }
            _ => json!({}),
        };

        if let (Some(service), Some(map)) = (self.service(), details.as_object_mut()) {
            map.insert("service".to_string(), json!(service));
            map.insert("action".to_string(), json!(self.action()));
        }
        details
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.code(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

impl ResponseError for MemeError {
    fn status_code(&self) -> StatusCode {
        match self {
            MemeError::Validation(_) => StatusCode::BAD_REQUEST,
            MemeError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            MemeError::UpstreamError { .. }
            | MemeError::SchemaViolation { .. }
            | MemeError::MissingImageData { .. } => StatusCode::BAD_GATEWAY,
            MemeError::Config(_) | MemeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.envelope())
    }
}

/// A 2xx status here means the service answered but reported failure in
/// its body.
fn upstream_failure(status: &u16, body: &str) -> String {
    if (200..300).contains(status) {
        format!("reported a failure: {}", body)
    } else {
        format!("returned status {}", status)
    }
}

pub fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_UPSTREAM_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = MemeError::Validation(SchemaViolation::missing("description"));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let unavailable = MemeError::unavailable(UpstreamService::TextGeneration, "refused");
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let upstream = MemeError::upstream(UpstreamService::ImageGeneration, 500, "boom");
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let schema = MemeError::schema(
            UpstreamService::TextGeneration,
            SchemaViolation::unexpected("mood"),
        );
        assert_eq!(schema.status_code(), StatusCode::BAD_GATEWAY);

        let missing = MemeError::MissingImageData {
            service: UpstreamService::ImageGeneration,
        };
        assert_eq!(missing.status_code(), StatusCode::BAD_GATEWAY);

        assert_eq!(
            MemeError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_envelope_names_service_and_action() {
        let err = MemeError::unavailable(UpstreamService::TextGeneration, "connection refused");
        let envelope = serde_json::to_value(err.envelope()).unwrap();

        assert_eq!(envelope["error"], "upstream_unavailable");
        assert_eq!(envelope["details"]["service"], "text-generation");
        assert!(envelope["details"]["action"]
            .as_str()
            .unwrap()
            .contains("TEXT_GEN_API_URL"));
    }

    #[test]
    fn test_upstream_error_carries_status_and_body() {
        let err = MemeError::upstream(UpstreamService::ImageGeneration, 429, "slow down");
        let details = err.details();
        assert_eq!(details["status"], 429);
        assert_eq!(details["body"], "slow down");
        assert_eq!(details["service"], "image-generation");
    }

    #[test]
    fn test_validation_envelope_has_no_service() {
        let err = MemeError::Validation(SchemaViolation::invalid(
            "description",
            "must be at least 10 characters",
        ));
        let envelope = serde_json::to_value(err.envelope()).unwrap();
        assert_eq!(envelope["error"], "validation_error");
        assert_eq!(envelope["details"]["field"], "description");
        assert!(envelope["details"].get("service").is_none());
    }

    #[test]
    fn test_upstream_message_distinguishes_reported_failure() {
        let reported = MemeError::upstream(UpstreamService::ImageGeneration, 200, "GPU out of memory");
        assert_eq!(
            reported.to_string(),
            "image-generation service reported a failure: GPU out of memory"
        );
        assert!(!reported.to_string().contains("status 200"));

        let status = MemeError::upstream(UpstreamService::ImageGeneration, 503, "busy");
        assert_eq!(status.to_string(), "image-generation service returned status 503");
    }

    #[test]
    fn test_body_truncation_respects_char_boundaries() {
        let body = "é".repeat(MAX_UPSTREAM_BODY_CHARS + 20);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), MAX_UPSTREAM_BODY_CHARS);
    }
}
