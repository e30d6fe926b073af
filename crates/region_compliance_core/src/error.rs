use thiserror::Error;

/// Failures that abort a region compliance evaluation.
///
/// None of these are recovered inside the rule. They propagate to the Lambda
/// runtime, which owns re-invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComplianceError {
    /// A required rule parameter was absent.
    #[error("missing rule parameter: {0}")]
    MissingParameter(String),

    /// The invoking event or one of its nested payloads could not be parsed.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Listing regions or instances failed.
    #[error("inventory service error: {0}")]
    InventoryService(String),

    /// Submitting the evaluation to AWS Config failed.
    #[error("evaluation submission error: {0}")]
    SinkSubmission(String),
}

impl ComplianceError {
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::MalformedEvent(message.into())
    }

    /// Stable, machine-readable code used in structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "missing_parameter",
            Self::MalformedEvent(_) => "malformed_event",
            Self::InventoryService(_) => "inventory_service_error",
            Self::SinkSubmission(_) => "sink_submission_error",
        }
    }
}
