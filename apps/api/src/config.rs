use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::certificate::templates::{TemplateTable, DEFAULT_TEMPLATE};

const DEFAULT_ASSET_DIRS: &str = "public/certificates,.";
const DEFAULT_TEMPLATE_MAP: &str = "addwise tech innovations=template2.png";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Directories searched for template images, in order.
    pub asset_dirs: Vec<PathBuf>,
    /// Optional bucket searched after the directories.
    pub asset_bucket: Option<S3AssetConfig>,
    pub templates: TemplateTable,
    /// Read every template once at startup and serve them from memory.
    pub preload_templates: bool,
}

#[derive(Debug, Clone)]
pub struct S3AssetConfig {
    pub bucket: String,
    pub prefix: String,
    pub endpoint: Option<String>,
    pub region: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let asset_bucket = optional_env("CERT_ASSET_BUCKET").map(|bucket| S3AssetConfig {
            bucket,
            prefix: optional_env("CERT_ASSET_PREFIX").unwrap_or_default(),
            endpoint: optional_env("S3_ENDPOINT"),
            region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        });

        let default_template =
            optional_env("CERT_DEFAULT_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
        let template_map =
            optional_env("CERT_TEMPLATE_MAP").unwrap_or_else(|| DEFAULT_TEMPLATE_MAP.to_string());

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            asset_dirs: parse_asset_dirs(
                &optional_env("CERT_ASSET_DIRS").unwrap_or_else(|| DEFAULT_ASSET_DIRS.to_string()),
            ),
            asset_bucket,
            templates: parse_template_map(&template_map, &default_template)
                .context("CERT_TEMPLATE_MAP is malformed")?,
            preload_templates: optional_env("CERT_PRELOAD_TEMPLATES")
                .map(|v| v.parse::<bool>())
                .transpose()
                .context("CERT_PRELOAD_TEMPLATES must be true or false")?
                .unwrap_or(false),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/certify_test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            asset_dirs: Vec::new(),
            asset_bucket: None,
            templates: TemplateTable::default(),
            preload_templates: false,
        }
    }
}

/// Parses `company=asset;company=asset`. Empty segments are skipped.
pub fn parse_template_map(raw: &str, default_asset: &str) -> Result<TemplateTable> {
    let mut table = TemplateTable::new(default_asset);
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((company, asset)) = entry.split_once('=') else {
            bail!("entry '{entry}' is not of the form company=asset");
        };
        let (company, asset) = (company.trim(), asset.trim());
        if company.is_empty() || asset.is_empty() {
            bail!("entry '{entry}' has an empty company or asset");
        }
        table = table.with_entry(company, asset);
    }
    Ok(table)
}

fn parse_asset_dirs(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
