//! Axum route handlers for the Certificate API.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::certificate::errors::CertificateError;
use crate::certificate::store::{
    CertificateArtifact, CertificateStatus, GenerationReceipt, PDF_CONTENT_TYPE,
};
use crate::errors::AppError;
use crate::models::student::StudentId;
use crate::state::AppState;

/// POST /api/v1/certificates/:student_id/generate
///
/// Only eligible students get a certificate. The gate lives here, in front of
/// the pipeline, which itself never looks at eligibility.
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
) -> Result<Json<GenerationReceipt>, AppError> {
    let status = state.certificates.store().status(student_id).await?;
    if !status.eligible {
        return Err(AppError::Validation(
            "Student is not eligible for certificate generation".to_string(),
        ));
    }

    let receipt = state.certificates.generate(student_id).await?;
    info!(
        "Certificate {} generated for student {student_id} ({} bytes)",
        receipt.certificate_id, receipt.size
    );
    Ok(Json(receipt))
}

/// GET /api/v1/certificates/:student_id/download
pub async fn handle_download(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
) -> Result<Response, AppError> {
    let artifact = state.certificates.download(student_id).await?;
    pdf_response(artifact)
}

/// GET /api/v1/certificates/:student_id/status
pub async fn handle_status(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
) -> Result<Json<CertificateStatus>, AppError> {
    Ok(Json(state.certificates.store().status(student_id).await?))
}

fn pdf_response(artifact: CertificateArtifact) -> Result<Response, AppError> {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(&artifact.file_name())
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid Content-Disposition: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// Replaces characters that cannot appear inside a quoted header parameter.
fn header_safe(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

impl From<CertificateError> for AppError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::NotFound(_) => AppError::NotFound(err.to_string()),
            CertificateError::Validation(_) => AppError::Validation(err.to_string()),
            CertificateError::ArtifactAbsent(_) => AppError::CertificateNotGenerated(err.to_string()),
            CertificateError::Encoding(_) | CertificateError::Layout(_) => {
                AppError::Generation(err.to_string())
            }
            CertificateError::Persistence(msg) => AppError::Storage(msg),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::certificate::memory::{student, InMemoryStudentRepository};
    use crate::certificate::service::CertificateService;
    use crate::certificate::store::ArtifactStore;
    use crate::certificate::templates::{TemplateResolver, TemplateTable};
    use crate::certificate::verification::VerificationEncoder;
    use crate::config::Config;
    use crate::layout::{LayoutEngine, StandardFontMetrics};
    use crate::routes::build_router;

    fn app(repo: Arc<InMemoryStudentRepository>) -> axum::Router {
        let certificates = CertificateService::new(
            ArtifactStore::new(repo),
            TemplateResolver::new(TemplateTable::default(), vec![]),
            VerificationEncoder::new(),
            LayoutEngine::new(Arc::new(StandardFontMetrics)),
        );
        build_router(AppState {
            config: Config::for_tests(),
            certificates: Arc::new(certificates),
        })
    }

    async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Response) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        (response.status(), response)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_then_download_pdf() {
        let repo = Arc::new(InMemoryStudentRepository::new());
        repo.insert(student(1, "Asha Rao", "CERT-042"));

        let (status, response) =
            send(app(repo.clone()), "POST", "/api/v1/certificates/1/generate").await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["student_name"], "Asha Rao");
        assert_eq!(body["certificate_id"], "CERT-042");

        let (status, response) = send(app(repo), "GET", "/api/v1/certificates/1/download").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Asha Rao_Certificate_CERT-042.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(bytes.len() as u64, body["size"].as_u64().unwrap());
    }

    #[tokio::test]
    async fn test_generate_rejects_ineligible_student() {
        let repo = Arc::new(InMemoryStudentRepository::new());
        let mut record = student(2, "Ravi", "CERT-002");
        record.eligible = false;
        repo.insert(record);

        let (status, response) =
            send(app(repo.clone()), "POST", "/api/v1/certificates/2/generate").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_unknown_student_is_404() {
        let repo = Arc::new(InMemoryStudentRepository::new());
        let (status, response) = send(app(repo), "POST", "/api/v1/certificates/404/generate").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_download_distinguishes_missing_student_and_certificate() {
        let repo = Arc::new(InMemoryStudentRepository::new());
        repo.insert(student(7, "Kiran", "CERT-007"));

        let (status, response) =
            send(app(repo.clone()), "GET", "/api/v1/certificates/7/download").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "CERTIFICATE_NOT_GENERATED"
        );

        let (status, response) = send(app(repo), "GET", "/api/v1/certificates/8/download").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let repo = Arc::new(InMemoryStudentRepository::new());
        repo.insert(student(3, "Asha Rao", "CERT-003"));

        let (status, response) = send(app(repo), "GET", "/api/v1/certificates/3/status").await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["certificate_status"], "ready_for_generation");
        assert_eq!(body["eligible"], true);
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_500() {
        let repo = Arc::new(InMemoryStudentRepository::new());
        repo.insert(student(4, "Asha Rao", "CERT-004"));
        repo.fail_writes(true);

        let (status, response) =
            send(app(repo), "POST", "/api/v1/certificates/4/generate").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "STORAGE_ERROR");
    }

    #[test]
    fn test_header_safe_file_name() {
        assert_eq!(
            header_safe("José \"J\"_Certificate_C-1.pdf"),
            "Jos_ _J__Certificate_C-1.pdf"
        );
    }
}
