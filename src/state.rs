use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::Level;
use url::Url;

use crate::cache::CacheStore;
use crate::catalog::Catalog;
use crate::http::{HttpTransport, Transport};
use crate::places::PlacesClient;

const DEFAULT_BASE_URL: &str = "https://www.nps.gov";
const DEFAULT_PLACES_ENDPOINT: &str = "http://www.mapquestapi.com/search/v2/radius";

/// Credentials and endpoint for the radius-search API.
#[derive(Clone)]
pub struct PlacesConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Issued together with the key; the radius endpoint does not use it.
    pub api_secret: Option<String>,
}

impl std::fmt::Debug for PlacesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub cache_dir: PathBuf,
    pub http_timeout: Duration,
    pub log_level: Level,
    pub places: PlacesConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("NPS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url).context("NPS_BASE_URL is not a valid URL")?;

        let cache_dir = dotenv::var("NPS_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/cache"));

        let http_timeout = dotenv::var("NPS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        let log_level = dotenv::var("NPS_LOG_LEVEL")
            .ok()
            .and_then(|s| s.trim().parse::<Level>().ok())
            .unwrap_or(Level::INFO);

        let api_key = dotenv::var("MAPQUEST_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .context("MAPQUEST_API_KEY required")?;
        let api_secret = dotenv::var("MAPQUEST_API_SECRET").ok().filter(|k| !k.is_empty());

        Ok(Self {
            base_url,
            cache_dir,
            http_timeout,
            log_level,
            places: PlacesConfig {
                endpoint: dotenv::var("MAPQUEST_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_PLACES_ENDPOINT.to_string()),
                api_key,
                api_secret,
            },
        })
    }
}

/// Long-lived components shared by the navigation loop.
pub struct AppState {
    pub cache: Arc<CacheStore>,
    pub catalog: Catalog,
    pub places: PlacesClient,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.http_timeout)?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: &AppConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let cache = Arc::new(
            CacheStore::new(&config.cache_dir)
                .with_context(|| format!("Failed to open cache dir {:?}", config.cache_dir))?,
        );
        let catalog = Catalog::new(cache.clone(), transport.clone(), config.base_url.clone());
        let places = PlacesClient::new(cache.clone(), transport, config.places.clone());
        Ok(Self {
            cache,
            catalog,
            places,
        })
    }
}
