use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{NpsError, Result};

/// One independently persisted tier of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// catalog URL -> { state name -> state URL }
    StateIndex,
    /// site URL -> [name, address, zipcode, phone, category, defaulted?]
    SiteDetail,
    /// state URL -> { state title -> [relative site URLs] }
    StateSites,
    /// postal code -> raw radius-search response
    Places,
}

impl Namespace {
    pub fn file_name(&self) -> &'static str {
        match self {
            Namespace::StateIndex => "state_url_cache.json",
            Namespace::SiteDetail => "site_instance.json",
            Namespace::StateSites => "state_site_url_cache.json",
            Namespace::Places => "mapquest_place.json",
        }
    }
}

/// Durable string-keyed JSON store, one file per namespace.
///
/// Best-effort: unreadable or corrupt files load as empty. No expiry and no locking;
/// a single process is assumed to own the directory.
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, ns: Namespace) -> PathBuf {
        self.dir.join(ns.file_name())
    }

    /// Load the whole namespace. Missing or corrupt data yields an empty map.
    pub fn get(&self, ns: Namespace) -> Map<String, Value> {
        let path = self.path(ns);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "cache unreadable, treating as empty");
                }
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %path.display(), "cache is not a JSON object, treating as empty");
                Map::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache corrupt, treating as empty");
                Map::new()
            }
        }
    }

    /// Replace the namespace's persisted content with `map` (no merge).
    pub fn put(&self, ns: Namespace, map: &Map<String, Value>) -> Result<()> {
        let path = self.path(ns);
        let tmp = path.with_extension("json.tmp");
        let err = |reason: String| NpsError::CacheWrite {
            namespace: ns.file_name(),
            reason,
        };

        let body = serde_json::to_string(map).map_err(|e| err(e.to_string()))?;
        std::fs::write(&tmp, body).map_err(|e| err(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| err(e.to_string()))?;
        debug!(namespace = ns.file_name(), entries = map.len(), "cache persisted");
        Ok(())
    }

    /// Typed read of a single key. A value that no longer decodes counts as a miss.
    pub fn lookup<T: DeserializeOwned>(&self, ns: Namespace, key: &str) -> Option<T> {
        let value = self.get(ns).remove(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(namespace = ns.file_name(), key, error = %e, "cached entry undecodable, ignoring");
                None
            }
        }
    }

    /// Read-modify-write of a single key.
    pub fn insert<T: Serialize>(&self, ns: Namespace, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| NpsError::CacheWrite {
            namespace: ns.file_name(),
            reason: e.to_string(),
        })?;
        let mut map = self.get(ns);
        map.insert(key.to_string(), value);
        self.put(ns, &map)
    }

    #[cfg(test)]
    pub fn contains(&self, ns: Namespace, key: &str) -> bool {
        self.get(ns).contains_key(key)
    }
}
