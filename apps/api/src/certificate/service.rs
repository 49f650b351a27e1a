//! Certificate pipeline: orchestrates generation and download.
//!
//! Flow: load + validate student → resolve template → encode verification
//!       code → compose PDF (blocking pool) → overwrite stored certificate.
//!
//! Nothing is written until the document is complete, so a failure at any
//! stage leaves the stored certificate (or its absence) as it was.

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::certificate::errors::CertificateError;
use crate::certificate::store::{ArtifactStore, CertificateArtifact, GenerationReceipt};
use crate::certificate::templates::TemplateResolver;
use crate::certificate::verification::VerificationEncoder;
use crate::layout::LayoutEngine;
use crate::models::student::StudentId;

pub struct CertificateService {
    store: ArtifactStore,
    templates: TemplateResolver,
    encoder: VerificationEncoder,
    layout: LayoutEngine,
}

impl CertificateService {
    pub fn new(
        store: ArtifactStore,
        templates: TemplateResolver,
        encoder: VerificationEncoder,
        layout: LayoutEngine,
    ) -> Self {
        Self {
            store,
            templates,
            encoder,
            layout,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Generates and stores the certificate, issued today (local time).
    pub async fn generate(&self, id: StudentId) -> Result<GenerationReceipt, CertificateError> {
        self.generate_on(id, Local::now().date_naive()).await
    }

    /// Runs the full pipeline with an explicit issue date.
    pub async fn generate_on(
        &self,
        id: StudentId,
        issued_on: NaiveDate,
    ) -> Result<GenerationReceipt, CertificateError> {
        // Step 1: Load and validate
        let details = self.store.load_for_generation(id).await?;
        info!(
            "Generating certificate {} for student {id}",
            details.certificate_id
        );

        // Step 2: Background template (None → fallback drawing)
        let background = self
            .templates
            .resolve(details.company_name.as_deref())
            .await;

        // Step 3: Verification code
        let qr_png = self.encoder.encode(&details.certificate_id)?;

        // Step 4: Compose on the blocking pool (CPU-bound)
        let layout = self.layout.clone();
        let layout_details = details.clone();
        let pdf = tokio::task::spawn_blocking(move || {
            layout.compose(&layout_details, background.as_deref(), &qr_png, issued_on)
        })
        .await
        .map_err(|e| CertificateError::Layout(format!("spawn_blocking failed in layout: {e}")))??;

        // Step 5: Overwrite stored certificate
        self.store.persist(&details, &pdf).await
    }

    pub async fn download(&self, id: StudentId) -> Result<CertificateArtifact, CertificateError> {
        self.store.fetch_artifact(id).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
