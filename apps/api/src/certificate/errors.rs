use thiserror::Error;

use crate::models::student::StudentId;

/// Failure conditions of the certificate pipeline.
///
/// A missing background asset is not represented here: the template resolver
/// answers `None` and the layout engine draws the fallback background.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Student {0} not found")]
    NotFound(StudentId),

    #[error("Missing required fields: {}", .0.join(", "))]
    Validation(Vec<&'static str>),

    #[error("Verification code encoding failed: {0}")]
    Encoding(String),

    #[error("Certificate layout failed: {0}")]
    Layout(String),

    #[error("Storage error: {0}")]
    Persistence(String),

    #[error("Certificate not generated for student {0}")]
    ArtifactAbsent(StudentId),
}

impl CertificateError {
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        CertificateError::Persistence(format!("{err:#}"))
    }
}
