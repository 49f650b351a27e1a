mod certificate;
mod config;
mod db;
mod errors;
mod layout;
mod models;
mod routes;
mod state;

use anyhow::Result;
use aws_config::Region;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::certificate::assets::{AssetSource, FsAssetSource, S3AssetSource};
use crate::certificate::service::CertificateService;
use crate::certificate::store::{ArtifactStore, PgStudentRepository};
use crate::certificate::templates::TemplateResolver;
use crate::certificate::verification::VerificationEncoder;
use crate::config::{Config, S3AssetConfig};
use crate::db::{create_pool, run_migrations};
use crate::layout::{LayoutEngine, StandardFontMetrics};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Certify API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let store = ArtifactStore::new(Arc::new(PgStudentRepository::new(db)));

    // Template sources: local directories first, then the optional bucket
    let mut sources: Vec<Arc<dyn AssetSource>> = config
        .asset_dirs
        .iter()
        .map(|dir| Arc::new(FsAssetSource::new(dir.clone())) as Arc<dyn AssetSource>)
        .collect();
    if let Some(bucket) = &config.asset_bucket {
        let client = build_s3_client(bucket).await;
        sources.push(Arc::new(S3AssetSource::new(
            client,
            bucket.bucket.clone(),
            bucket.prefix.clone(),
        )));
        info!("S3 asset source initialized (bucket: {})", bucket.bucket);
    }
    for source in &sources {
        info!("Template source: {}", source.describe());
    }
    info!(
        "Template table: default {}, {} company mapping(s)",
        config.templates.default_asset(),
        config.templates.companies().count()
    );

    let mut templates = TemplateResolver::new(config.templates.clone(), sources.clone());
    if config.preload_templates {
        let bundle = templates.preload().await;
        info!("Preloaded templates: {}", bundle.describe());
        sources.insert(0, Arc::new(bundle));
        templates = TemplateResolver::new(config.templates.clone(), sources);
    }

    let certificates = CertificateService::new(
        store,
        templates,
        VerificationEncoder::new(),
        LayoutEngine::new(Arc::new(StandardFontMetrics)),
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        certificates: Arc::new(certificates),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for the template bucket. Credentials come from the
/// default AWS provider chain; a custom endpoint selects MinIO or similar.
async fn build_s3_client(bucket: &S3AssetConfig) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(bucket.region.clone()));
    if let Some(endpoint) = &bucket.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(bucket.endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
