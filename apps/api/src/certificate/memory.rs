//! In-memory `StudentRepository` for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::certificate::store::StudentRepository;
use crate::models::student::{
    CertificateStatusRow, StoredCertificateRow, StudentId, StudentRecord,
};

/// An eligible student with course, company and dates filled in.
pub fn student(id: StudentId, name: &str, certificate_id: &str) -> StudentRecord {
    StudentRecord {
        student_id: id,
        name: Some(name.to_string()),
        certificate_id: Some(certificate_id.to_string()),
        course_name: Some("Full Stack Development".to_string()),
        company_name: Some("Addwise Tech Innovations".to_string()),
        start_date: NaiveDate::from_ymd_opt(2025, 5, 20),
        end_date: NaiveDate::from_ymd_opt(2025, 7, 20),
        eligible: true,
    }
}

#[derive(Default)]
pub struct InMemoryStudentRepository {
    rows: Mutex<HashMap<StudentId, (StudentRecord, Option<Vec<u8>>)>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: StudentRecord) {
        self.rows
            .lock()
            .unwrap()
            .insert(record.student_id, (record, None));
    }

    /// Replaces the student fields, keeping any stored certificate.
    pub fn update(&self, record: StudentRecord) {
        let mut rows = self.rows.lock().unwrap();
        let certificate = rows.remove(&record.student_id).and_then(|(_, c)| c);
        rows.insert(record.student_id, (record, certificate));
    }

    pub fn remove(&self, id: StudentId) {
        self.rows.lock().unwrap().remove(&id);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write attempts, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn certificate(&self, id: StudentId) -> Option<Vec<u8>> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|(_, c)| c.clone())
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn find_student(&self, id: StudentId) -> Result<Option<StudentRecord>> {
        Ok(self.rows.lock().unwrap().get(&id).map(|(r, _)| r.clone()))
    }

    async fn write_certificate(&self, id: StudentId, pdf: &[u8]) -> Result<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated write failure");
        }
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some((_, certificate)) => {
                *certificate = Some(pdf.to_vec());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_certificate(&self, id: StudentId) -> Result<Option<StoredCertificateRow>> {
        Ok(self.rows.lock().unwrap().get(&id).map(|(r, c)| StoredCertificateRow {
            name: r.name.clone(),
            certificate_id: r.certificate_id.clone(),
            certificate: c.clone(),
        }))
    }

    async fn certificate_status(&self, id: StudentId) -> Result<Option<CertificateStatusRow>> {
        Ok(self.rows.lock().unwrap().get(&id).map(|(r, c)| CertificateStatusRow {
            student_id: r.student_id,
            name: r.name.clone(),
            eligible: r.eligible,
            has_certificate: c.is_some(),
        }))
    }
}
