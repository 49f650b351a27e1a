use std::sync::Arc;

use crate::certificate::service::CertificateService;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    #[allow(dead_code)]
    pub config: Config,
    /// Generation pipeline. Holds the student repository, template resolver,
    /// QR encoder and layout engine; built once in `main`.
    pub certificates: Arc<CertificateService>,
}
