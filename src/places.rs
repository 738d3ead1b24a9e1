use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::cache::{CacheStore, Namespace};
use crate::catalog::types::Site;
use crate::error::{NpsError, Result};
use crate::http::{redact, Transport};
use crate::state::PlacesConfig;

/// Upper bound on places returned for one site.
pub const MAX_PLACES: usize = 11;
/// Search radius in miles.
pub const SEARCH_RADIUS: u32 = 10;

const NO_CATEGORY: &str = "no category";
const NO_ADDRESS: &str = "no address";
const NO_CITY: &str = "no city";

/// A point of interest near a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyPlace {
    pub name: String,
    pub category: String,
    pub address: String,
    pub city: String,
}

impl NearbyPlace {
    pub fn info(&self) -> String {
        format!(
            "- {} ({}): {}, {}",
            self.name, self.category, self.address, self.city
        )
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    #[serde(default)]
    fields: Option<ResultFields>,
}

/// Each field may be absent, null or blank upstream; all three read as "no value".
#[derive(Debug, Default, Deserialize)]
struct ResultFields {
    #[serde(default)]
    group_sic_code_name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder.to_string(),
    }
}

impl From<SearchResult> for NearbyPlace {
    fn from(r: SearchResult) -> Self {
        let fields = r.fields.unwrap_or_default();
        Self {
            name: r.name,
            category: or_placeholder(fields.group_sic_code_name, NO_CATEGORY),
            address: or_placeholder(fields.address, NO_ADDRESS),
            city: or_placeholder(fields.city, NO_CITY),
        }
    }
}

/// Decode a raw radius-search response into at most `MAX_PLACES` places.
///
/// The first entry that does not decode ends the list; a short or missing
/// `searchResults` array is not an error.
pub fn decode_places(raw: &Value) -> Vec<NearbyPlace> {
    let Some(results) = raw.get("searchResults").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .take(MAX_PLACES)
        .map_while(|entry| SearchResult::deserialize(entry).ok())
        .map(NearbyPlace::from)
        .collect()
}

/// Radius-search client keyed on a site's postal code.
pub struct PlacesClient {
    cache: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    config: PlacesConfig,
}

impl PlacesClient {
    pub fn new(cache: Arc<CacheStore>, transport: Arc<dyn Transport>, config: PlacesConfig) -> Self {
        Self {
            cache,
            transport,
            config,
        }
    }

    /// Full request URL for an origin, credentials included.
    fn request_url(&self, origin: &str) -> Result<String> {
        let radius = SEARCH_RADIUS.to_string();
        let max_matches = MAX_PLACES.to_string();
        let url = Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("origin", origin),
                ("radius", radius.as_str()),
                ("maxMatches", max_matches.as_str()),
                ("ambiguities", "ignore"),
                ("outFormat", "json"),
                ("key", self.config.api_key.as_str()),
            ],
        )
        .map_err(|e| NpsError::upstream(&self.config.endpoint, e))?;
        Ok(url.to_string())
    }

    /// Places near `site`, from cache when its postal code was searched before.
    pub async fn get_nearby_places(&self, site: &Site) -> Result<Vec<NearbyPlace>> {
        let origin = site.zipcode.as_str();
        if let Some(raw) = self.cache.lookup::<Value>(Namespace::Places, origin) {
            debug!(zipcode = origin, "places from cache");
            return Ok(decode_places(&raw));
        }

        let url = self.request_url(origin)?;
        info!(url = redact(&url), zipcode = origin, "fetching nearby places");
        let body = self.transport.get_text(&url).await?;
        let raw: Value =
            serde_json::from_str(&body).map_err(|e| NpsError::MalformedResponse {
                origin: origin.to_string(),
                reason: e.to_string(),
            })?;

        self.cache.insert(Namespace::Places, origin, &raw)?;
        let places = decode_places(&raw);
        debug!(zipcode = origin, count = places.len(), "places decoded");
        Ok(places)
    }
}
