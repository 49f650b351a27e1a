use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type StudentId = i64;

/// A row of the `students` table, without the certificate blob.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentRecord {
    pub student_id: StudentId,
    pub name: Option<String>,
    pub certificate_id: Option<String>,
    pub course_name: Option<String>,
    pub company_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub eligible: bool,
}

/// The certificate column together with the fields needed to name a download.
#[derive(Debug, Clone, FromRow)]
pub struct StoredCertificateRow {
    pub name: Option<String>,
    pub certificate_id: Option<String>,
    pub certificate: Option<Vec<u8>>,
}

/// Lightweight view used by the status endpoint; never loads the blob.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificateStatusRow {
    pub student_id: StudentId,
    pub name: Option<String>,
    pub eligible: bool,
    pub has_certificate: bool,
}

/// A student record that passed validation for certificate generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateDetails {
    pub student_id: StudentId,
    pub name: String,
    pub certificate_id: String,
    pub course_name: Option<String>,
    pub company_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
