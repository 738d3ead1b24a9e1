use thiserror::Error;

/// Failures surfaced by the retrieval pipeline.
///
/// Missing secondary fields on a site page are not errors; they are resolved
/// through per-field defaults (see `catalog::types::DefaultedReason`).
#[derive(Debug, Error)]
pub enum NpsError {
    #[error("upstream unavailable ({url}): {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("malformed catalog page ({url}): {detail}")]
    MalformedCatalog { url: String, detail: String },

    #[error("malformed site page ({url}): {detail}")]
    MalformedPage { url: String, detail: String },

    #[error("malformed places response for origin {origin}: {reason}")]
    MalformedResponse { origin: String, reason: String },

    #[error("failed to persist cache namespace {namespace}: {reason}")]
    CacheWrite { namespace: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, NpsError>;

impl NpsError {
    pub fn upstream(url: &str, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
