//! Artifact store: loads students for generation and keeps the generated PDF
//! on the student row.
//!
//! The certificate column is only ever replaced by a single UPDATE, so readers
//! see either the previous document or the new one. Concurrent generations
//! for the same student are not serialized: the last UPDATE wins.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::certificate::errors::CertificateError;
use crate::models::student::{
    CertificateDetails, CertificateStatusRow, StoredCertificateRow, StudentId, StudentRecord,
};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// ────────────────────────────────────────────────────────────────────────────
// Repository seam
// ────────────────────────────────────────────────────────────────────────────

/// Storage boundary for student rows. Soft-deleted students are invisible.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn find_student(&self, id: StudentId) -> Result<Option<StudentRecord>>;

    /// Replaces the certificate blob. Returns `false` when no row matched.
    async fn write_certificate(&self, id: StudentId, pdf: &[u8]) -> Result<bool>;

    async fn find_certificate(&self, id: StudentId) -> Result<Option<StoredCertificateRow>>;

    async fn certificate_status(&self, id: StudentId) -> Result<Option<CertificateStatusRow>>;
}

/// `students` table in PostgreSQL.
pub struct PgStudentRepository {
    pool: PgPool,
}

impl PgStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    async fn find_student(&self, id: StudentId) -> Result<Option<StudentRecord>> {
        Ok(sqlx::query_as::<_, StudentRecord>(
            r#"
            SELECT student_id, name, certificate_id, course_name, company_name,
                   start_date, end_date, eligible
            FROM students
            WHERE student_id = $1 AND deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn write_certificate(&self, id: StudentId, pdf: &[u8]) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE students SET certificate = $1 WHERE student_id = $2 AND deleted = false",
        )
        .bind(pdf)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_certificate(&self, id: StudentId) -> Result<Option<StoredCertificateRow>> {
        Ok(sqlx::query_as::<_, StoredCertificateRow>(
            "SELECT name, certificate_id, certificate FROM students WHERE student_id = $1 AND deleted = false",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn certificate_status(&self, id: StudentId) -> Result<Option<CertificateStatusRow>> {
        Ok(sqlx::query_as::<_, CertificateStatusRow>(
            r#"
            SELECT student_id, name, eligible, (certificate IS NOT NULL) AS has_certificate
            FROM students
            WHERE student_id = $1 AND deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Value types
// ────────────────────────────────────────────────────────────────────────────

/// Summary returned after a certificate is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReceipt {
    pub student_id: StudentId,
    pub student_name: String,
    pub certificate_id: String,
    pub size: usize,
}

/// A stored certificate ready for download.
#[derive(Debug, Clone)]
pub struct CertificateArtifact {
    pub bytes: Vec<u8>,
    pub student_name: String,
    pub certificate_id: String,
}

impl CertificateArtifact {
    /// `{student_name}_Certificate_{certificate_id}.pdf`
    pub fn file_name(&self) -> String {
        format!(
            "{}_Certificate_{}.pdf",
            self.student_name, self.certificate_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateState {
    Generated,
    ReadyForGeneration,
    NotEligible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateStatus {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub eligible: bool,
    pub certificate_status: CertificateState,
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ArtifactStore {
    repo: Arc<dyn StudentRepository>,
}

impl ArtifactStore {
    pub fn new(repo: Arc<dyn StudentRepository>) -> Self {
        Self { repo }
    }

    /// Loads a student and checks the fields a certificate cannot do without.
    ///
    /// Eligibility is not checked here; gate on it before calling.
    pub async fn load_for_generation(
        &self,
        id: StudentId,
    ) -> Result<CertificateDetails, CertificateError> {
        let record = self
            .repo
            .find_student(id)
            .await
            .map_err(CertificateError::persistence)?
            .ok_or(CertificateError::NotFound(id))?;

        validate_for_generation(record)
    }

    /// Stores `pdf` as the student's certificate, replacing any previous one.
    pub async fn persist(
        &self,
        details: &CertificateDetails,
        pdf: &[u8],
    ) -> Result<GenerationReceipt, CertificateError> {
        let updated = self
            .repo
            .write_certificate(details.student_id, pdf)
            .await
            .map_err(CertificateError::persistence)?;

        if !updated {
            return Err(CertificateError::NotFound(details.student_id));
        }

        info!(
            "Stored certificate {} for student {} ({} bytes)",
            details.certificate_id,
            details.student_id,
            pdf.len()
        );

        Ok(GenerationReceipt {
            student_id: details.student_id,
            student_name: details.name.clone(),
            certificate_id: details.certificate_id.clone(),
            size: pdf.len(),
        })
    }

    /// Fetches the stored certificate. A student without one is
    /// `ArtifactAbsent`, distinct from an unknown student.
    pub async fn fetch_artifact(
        &self,
        id: StudentId,
    ) -> Result<CertificateArtifact, CertificateError> {
        let row = self
            .repo
            .find_certificate(id)
            .await
            .map_err(CertificateError::persistence)?
            .ok_or(CertificateError::NotFound(id))?;

        let bytes = row.certificate.ok_or(CertificateError::ArtifactAbsent(id))?;
        debug!("Fetched certificate for student {id} ({} bytes)", bytes.len());

        Ok(CertificateArtifact {
            bytes,
            student_name: row.name.unwrap_or_default(),
            certificate_id: row.certificate_id.unwrap_or_default(),
        })
    }

    pub async fn status(&self, id: StudentId) -> Result<CertificateStatus, CertificateError> {
        let row = self
            .repo
            .certificate_status(id)
            .await
            .map_err(CertificateError::persistence)?
            .ok_or(CertificateError::NotFound(id))?;

        let certificate_status = if row.has_certificate {
            CertificateState::Generated
        } else if row.eligible {
            CertificateState::ReadyForGeneration
        } else {
            CertificateState::NotEligible
        };

        Ok(CertificateStatus {
            student_id: row.student_id,
            student_name: row.name,
            eligible: row.eligible,
            certificate_status,
        })
    }
}

fn validate_for_generation(record: StudentRecord) -> Result<CertificateDetails, CertificateError> {
    let name = record.name.filter(|v| !v.trim().is_empty());
    let certificate_id = record.certificate_id.filter(|v| !v.trim().is_empty());

    match (name, certificate_id) {
        (Some(name), Some(certificate_id)) => Ok(CertificateDetails {
            student_id: record.student_id,
            name,
            certificate_id,
            course_name: record.course_name,
            company_name: record.company_name,
            start_date: record.start_date,
            end_date: record.end_date,
        }),
        (name, certificate_id) => {
            let mut missing = Vec::new();
            if name.is_none() {
                missing.push("name");
            }
            if certificate_id.is_none() {
                missing.push("certificate_id");
            }
            Err(CertificateError::Validation(missing))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
