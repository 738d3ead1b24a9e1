pub mod extract;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheStore, Namespace};
use crate::error::Result;
use crate::http::Transport;

use types::{Site, StateIndex, StateSites};

const CATALOG_PATH: &str = "/index.htm";

/// Cache-backed retrieval of the state index, state site lists and site details.
///
/// Every tier consults its namespace first and only goes upstream on a miss.
pub struct Catalog {
    cache: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    base: Url,
}

impl Catalog {
    pub fn new(cache: Arc<CacheStore>, transport: Arc<dyn Transport>, base: Url) -> Self {
        Self {
            cache,
            transport,
            base,
        }
    }

    /// Fixed cache key for the top-level catalog page.
    pub fn catalog_url(&self) -> String {
        extract::resolve(&self.base, CATALOG_PATH)
    }

    pub fn resolve(&self, href: &str) -> String {
        extract::resolve(&self.base, href)
    }

    /// Map of lower-cased state name to state catalog URL.
    pub async fn build_state_index(&self) -> Result<StateIndex> {
        let url = self.catalog_url();
        if let Some(index) = self.cache.lookup::<StateIndex>(Namespace::StateIndex, &url) {
            debug!(url = %url, states = index.len(), "state index from cache");
            return Ok(index);
        }

        info!(url = %url, "fetching state index");
        let html = self.transport.get_text(&url).await?;
        let index = extract::parse_state_index(&html, &self.base, &url)?;
        self.cache.insert(Namespace::StateIndex, &url, &index)?;
        info!(states = index.len(), "state index built");
        Ok(index)
    }

    /// Site detail for one absolute site URL.
    pub async fn get_site(&self, site_url: &str) -> Result<Site> {
        let cached = self.cache.lookup::<Value>(Namespace::SiteDetail, site_url);
        if let Some(record) = cached {
            match Site::from_record(&record) {
                Some(site) => {
                    debug!(url = site_url, "site from cache");
                    return Ok(site);
                }
                None => warn!(url = site_url, "cached site record malformed, refetching"),
            }
        }

        info!(url = site_url, "fetching site");
        let html = self.transport.get_text(site_url).await?;
        let site = extract::parse_site(&html, site_url)?;
        self.cache
            .insert(Namespace::SiteDetail, site_url, &site.to_record())?;
        Ok(site)
    }

    /// Sites of one state in discovery order.
    ///
    /// Only the raw href list is cached here; each site goes through `get_site`, so the
    /// per-site cache is shared with any other caller.
    pub async fn get_sites_for_state(&self, state_url: &str) -> Result<StateSites> {
        let cached = self
            .cache
            .lookup::<BTreeMap<String, Vec<String>>>(Namespace::StateSites, state_url)
            .and_then(|record| record.into_iter().next());

        let (name, site_paths) = match cached {
            Some(entry) => {
                debug!(url = state_url, sites = entry.1.len(), "state sites from cache");
                entry
            }
            None => {
                info!(url = state_url, "fetching state page");
                let html = self.transport.get_text(state_url).await?;
                let page = extract::parse_state_page(&html, state_url);
                let record = BTreeMap::from([(page.name.clone(), page.site_paths.clone())]);
                self.cache.insert(Namespace::StateSites, state_url, &record)?;
                (page.name, page.site_paths)
            }
        };

        let mut sites = Vec::with_capacity(site_paths.len());
        for path in &site_paths {
            sites.push(self.get_site(&self.resolve(path)).await?);
        }
        Ok(StateSites { name, sites })
    }

    /// Look up a state by operator-typed name (case-insensitive).
    pub fn find_state<'a>(index: &'a StateIndex, input: &str) -> Option<&'a str> {
        index.get(&input.trim().to_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::extract::fixtures::*;
    use super::*;
    use crate::error::NpsError;
    use crate::http::testing::FakeTransport;
    use serde_json::json;
    use types::{SiteField, DEFAULT_REGION};

    const BASE: &str = "https://www.nps.gov";

    fn catalog(fake: FakeTransport) -> (tempfile::TempDir, Arc<CacheStore>, Arc<FakeTransport>, Catalog) {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Arc::new(CacheStore::new(tmp.path()).unwrap());
        let fake = Arc::new(fake);
        let catalog = Catalog::new(cache.clone(), fake.clone(), Url::parse(BASE).unwrap());
        (tmp, cache, fake, catalog)
    }

    fn isro_page() -> String {
        site_page(
            "Isle Royale",
            Some("National Park"),
            &mailing_address("Houghton", r#"<span itemprop="addressRegion">MI</span>"#, "49931"),
            "\n906-482-0984",
        )
    }

    #[tokio::test]
    async fn test_site_extraction_is_idempotent() {
        let url = "https://www.nps.gov/isro/index.htm";
        let (_tmp, _cache, fake, catalog) = catalog(FakeTransport::new().with(url, &isro_page()));

        let cold = catalog.get_site(url).await.unwrap();
        let warm = catalog.get_site(url).await.unwrap();
        assert_eq!(cold, warm);
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_defaulted_fields_survive_cache() {
        let url = "https://www.nps.gov/piro/index.htm";
        let page = site_page(
            "Pictured Rocks",
            None,
            &mailing_address("Munising", "", "49862"),
            "\n906-387-3700",
        );
        let (_tmp, _cache, _fake, catalog) = catalog(FakeTransport::new().with(url, &page));

        let cold = catalog.get_site(url).await.unwrap();
        let warm = catalog.get_site(url).await.unwrap();
        assert_eq!(warm.address, format!("Munising, {}", DEFAULT_REGION));
        assert!(warm.is_defaulted(SiteField::Region));
        assert_eq!(cold, warm);
    }

    #[tokio::test]
    async fn test_site_cache_hit_skips_network() {
        let url = "https://www.nps.gov/isle-royale/";
        let (_tmp, cache, fake, catalog) = catalog(FakeTransport::new());
        cache
            .insert(
                Namespace::SiteDetail,
                url,
                &json!(["Isle Royale", "Houghton, MI", "49931", "906-482-0984", "National Park"]),
            )
            .unwrap();

        let site = catalog.get_site(url).await.unwrap();
        assert_eq!(site.zipcode, "49931");
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_state_index_cached_under_catalog_url() {
        let catalog_url = "https://www.nps.gov/index.htm";
        let page = catalog_page(&[("Michigan", "/state/mi/index.htm")]);
        let (_tmp, cache, fake, catalog) = catalog(FakeTransport::new().with(catalog_url, &page));

        let first = catalog.build_state_index().await.unwrap();
        let second = catalog.build_state_index().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fake.calls(), 1);
        assert!(cache.contains(Namespace::StateIndex, catalog_url));
        assert_eq!(
            Catalog::find_state(&first, "  MICHIGAN "),
            Some("https://www.nps.gov/state/mi/index.htm")
        );
    }

    #[tokio::test]
    async fn test_state_index_upstream_failure() {
        let (_tmp, _cache, _fake, catalog) = catalog(FakeTransport::new());
        let err = catalog.build_state_index().await.unwrap_err();
        assert!(matches!(err, NpsError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_aggregator_order_stable_across_cold_and_warm() {
        let state_url = "https://www.nps.gov/state/mi/index.htm";
        let paths = ["/slbe/index.htm", "/isro/index.htm", "/piro/index.htm"];
        let mut fake = FakeTransport::new().with(state_url, &state_page("Michigan", &paths));
        for (i, p) in paths.iter().enumerate() {
            let page = site_page(&format!("Site {}", i), Some("Park"), "", "\n555-0100");
            fake = fake.with(&format!("{}{}", BASE, p), &page);
        }
        let (_tmp, cache, fake, catalog) = catalog(fake);

        let cold = catalog.get_sites_for_state(state_url).await.unwrap();
        let calls_after_cold = fake.calls();
        let warm = catalog.get_sites_for_state(state_url).await.unwrap();

        assert_eq!(cold.name, "Michigan");
        let names: Vec<_> = cold.sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Site 0", "Site 1", "Site 2"]);
        assert_eq!(cold, warm);
        assert_eq!(calls_after_cold, 4);
        assert_eq!(fake.calls(), 4);

        let record: BTreeMap<String, Vec<String>> =
            cache.lookup(Namespace::StateSites, state_url).unwrap();
        assert_eq!(record.get("Michigan").unwrap(), &paths.to_vec());
    }

    #[tokio::test]
    async fn test_state_sites_namespace_keeps_other_states() {
        let mi = "https://www.nps.gov/state/mi/index.htm";
        let wy = "https://www.nps.gov/state/wy/index.htm";
        let fake = FakeTransport::new()
            .with(mi, &state_page("Michigan", &[]))
            .with(wy, &state_page("Wyoming", &[]));
        let (_tmp, cache, _fake, catalog) = catalog(fake);

        catalog.get_sites_for_state(mi).await.unwrap();
        catalog.get_sites_for_state(wy).await.unwrap();
        assert!(cache.contains(Namespace::StateSites, mi));
        assert!(cache.contains(Namespace::StateSites, wy));
    }
}
