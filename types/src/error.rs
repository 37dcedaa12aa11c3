use thiserror::Error;

/// Validation failures for a [`crate::ReportSubmission`] that never reach storage.
/// Mapped 1:1 onto HTTP status codes by the collector ingress crate.
#[derive(Debug, Error)]
pub enum ReportValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("status '{0:?}' may not be submitted by an agent")]
    NotAgentOriginated(crate::status::ReportStatus),
}
