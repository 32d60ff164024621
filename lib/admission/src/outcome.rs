use http::StatusCode;
use serde_json::{json, Value};

/// The verdict of one admission decision. Only `NoFailure` lets the request be
/// forwarded upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionOutcome {
    NoFailure,
    /// The session has no access rights for the API, or it was throttled.
    RateLimitFailure,
    DepthLimitFailure,
    /// The operation could not be resolved against the schema. Points at a
    /// parser or schema mismatch upstream rather than at the caller.
    MalformedOperation,
}

/// The response a rejected request must be answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::NoFailure)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        let (status, code, message) = match self {
            AdmissionOutcome::NoFailure => return None,
            AdmissionOutcome::RateLimitFailure => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Rate limit exceeded",
            ),
            AdmissionOutcome::DepthLimitFailure => (
                StatusCode::FORBIDDEN,
                "DEPTH_LIMIT_EXCEEDED",
                "Depth limit exceeded",
            ),
            AdmissionOutcome::MalformedOperation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "OPERATION_RESOLUTION_FAILURE",
                "Unable to resolve the GraphQL operation",
            ),
        };

        Some(Rejection {
            status,
            code,
            message,
        })
    }
}

impl Rejection {
    /// GraphQL-compliant error body.
    pub fn to_graphql_response(&self) -> Value {
        json!({
            "errors": [{
                "message": self.message,
                "extensions": {
                    "code": self.code,
                }
            }]
        })
    }
}
