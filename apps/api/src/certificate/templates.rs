//! Template resolution: company name → background image bytes.
//!
//! The company → asset mapping is data (`TemplateTable`), and the places an
//! asset is searched are injected (`AssetSource`s), so adding a company or a
//! storage backend touches neither the resolver nor the layout engine.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::certificate::assets::{AssetSource, EmbeddedAssetSource};

pub const DEFAULT_TEMPLATE: &str = "template1.png";

/// Ordered company → asset table with a default for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTable {
    entries: Vec<(String, String)>,
    default_asset: String,
}

impl TemplateTable {
    pub fn new(default_asset: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            default_asset: default_asset.into(),
        }
    }

    /// Appends a mapping. Company names are stored normalized; the first
    /// matching entry wins.
    pub fn with_entry(mut self, company: &str, asset: impl Into<String>) -> Self {
        self.entries.push((normalize(company), asset.into()));
        self
    }

    /// Asset name for a company. Pure: depends on nothing but `company`.
    pub fn asset_for(&self, company: Option<&str>) -> &str {
        company
            .map(normalize)
            .and_then(|key| {
                self.entries
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, asset)| asset.as_str())
            })
            .unwrap_or(&self.default_asset)
    }

    pub fn default_asset(&self) -> &str {
        &self.default_asset
    }

    pub fn companies(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(company, _)| company.as_str())
    }

    /// Every asset the table can name, default first, without duplicates.
    pub fn assets(&self) -> Vec<&str> {
        let mut assets = vec![self.default_asset.as_str()];
        for (_, asset) in &self.entries {
            if !assets.contains(&asset.as_str()) {
                assets.push(asset);
            }
        }
        assets
    }
}

impl Default for TemplateTable {
    fn default() -> Self {
        TemplateTable::new(DEFAULT_TEMPLATE).with_entry("addwise tech innovations", "template2.png")
    }
}

/// Case-insensitive exact match: only case is folded.
fn normalize(company: &str) -> String {
    company.to_lowercase()
}

/// Picks and loads the background for a certificate.
pub struct TemplateResolver {
    table: TemplateTable,
    sources: Vec<Arc<dyn AssetSource>>,
}

impl TemplateResolver {
    pub fn new(table: TemplateTable, sources: Vec<Arc<dyn AssetSource>>) -> Self {
        Self { table, sources }
    }

    pub fn asset_name(&self, company: Option<&str>) -> &str {
        self.table.asset_for(company)
    }

    /// Returns the bytes of the company's template from the first source that
    /// has it, or `None` when no source does. A source that fails is logged
    /// and skipped; the caller draws the fallback background on `None`.
    pub async fn resolve(&self, company: Option<&str>) -> Option<Bytes> {
        let asset = self.asset_name(company);
        debug!("Company {company:?} uses template {asset}");
        self.fetch_asset(asset).await
    }

    /// Reads every asset the table names into an in-memory bundle. Assets that
    /// no source has are left out and keep resolving through the sources.
    pub async fn preload(&self) -> EmbeddedAssetSource {
        let mut bundle = EmbeddedAssetSource::new();
        for asset in self.table.assets() {
            if let Some(data) = self.fetch_asset(asset).await {
                bundle = bundle.with_asset(asset, data);
            }
        }
        bundle
    }

    async fn fetch_asset(&self, asset: &str) -> Option<Bytes> {
        for source in &self.sources {
            match source.fetch(asset).await {
                Ok(Some(data)) => {
                    info!("Template {asset} loaded from {}", source.describe());
                    return Some(data);
                }
                Ok(None) => debug!("Template {asset} not found at {}", source.describe()),
                Err(e) => warn!(
                    "Template source {} failed for {asset}: {e:#}",
                    source.describe()
                ),
            }
        }

        warn!(
            "Template {asset} unavailable in {} sources, falling back to plain background",
            self.sources.len()
        );
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FailingSource;

    #[async_trait]
    impl AssetSource for FailingSource {
        async fn fetch(&self, _name: &str) -> anyhow::Result<Option<Bytes>> {
            Err(anyhow::anyhow!("bucket unreachable"))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    /// Counts lookups so tests can assert how far probing went.
    struct CountingSource(AtomicUsize);

    #[async_trait]
    impl AssetSource for CountingSource {
        async fn fetch(&self, _name: &str) -> anyhow::Result<Option<Bytes>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[test]
    fn test_addwise_selects_alternate_template_any_case() {
        let table = TemplateTable::default();
        for name in [
            "Addwise Tech Innovations",
            "ADDWISE TECH INNOVATIONS",
            "addwise tech innovations",
        ] {
            assert_eq!(table.asset_for(Some(name)), "template2.png");
        }
    }

    #[test]
    fn test_other_or_missing_company_selects_default() {
        let table = TemplateTable::default();
        assert_eq!(table.asset_for(Some("Unknown Corp")), DEFAULT_TEMPLATE);
        assert_eq!(table.asset_for(Some("Addwise Tech")), DEFAULT_TEMPLATE);
        assert_eq!(table.asset_for(None), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let table = TemplateTable::new("base.png")
            .with_entry("Acme", "acme-a.png")
            .with_entry("ACME", "acme-b.png");
        assert_eq!(table.asset_for(Some("acme")), "acme-a.png");
        assert_eq!(table.companies().collect::<Vec<_>>(), vec!["acme", "acme"]);
    }

    #[tokio::test]
    async fn test_resolve_returns_first_source_hit() {
        let first: Arc<dyn AssetSource> =
            Arc::new(EmbeddedAssetSource::new().with_asset("template1.png", &b"first"[..]));
        let second: Arc<dyn AssetSource> =
            Arc::new(EmbeddedAssetSource::new().with_asset("template1.png", &b"second"[..]));
        let resolver = TemplateResolver::new(TemplateTable::default(), vec![first, second]);

        let data = resolver.resolve(Some("Unknown Corp")).await.unwrap();
        assert_eq!(&data[..], b"first");
    }

    #[tokio::test]
    async fn test_resolve_skips_failing_source() {
        let good: Arc<dyn AssetSource> =
            Arc::new(EmbeddedAssetSource::new().with_asset("template2.png", &b"t2"[..]));
        let failing: Arc<dyn AssetSource> = Arc::new(FailingSource);
        let resolver = TemplateResolver::new(TemplateTable::default(), vec![failing, good]);

        let data = resolver.resolve(Some("Addwise Tech Innovations")).await;
        assert_eq!(data.as_deref(), Some(&b"t2"[..]));
    }

    #[tokio::test]
    async fn test_resolve_total_miss_is_none_after_probing_all() {
        let counter = Arc::new(CountingSource(AtomicUsize::new(0)));
        let counting: Arc<dyn AssetSource> = counter.clone();
        let failing: Arc<dyn AssetSource> = Arc::new(FailingSource);
        let resolver = TemplateResolver::new(
            TemplateTable::default(),
            vec![counting.clone(), failing, counting],
        );

        assert!(resolver.resolve(Some("Unknown Corp")).await.is_none());
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_with_no_sources_is_none() {
        let resolver = TemplateResolver::new(TemplateTable::default(), vec![]);
        assert!(resolver.resolve(None).await.is_none());
    }
}
