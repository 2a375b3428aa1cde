//! Request builders for the backend endpoints the store consumes.

use url::Url;

use crate::capabilities::{HttpError, HttpRequest, ValidatedUrl};
use crate::config::StoreConfig;
use crate::model::ActivityId;

pub const ACTIVITIES_PATH: &str = "api/activities";
pub const HEALTH_PATH: &str = "healthz";

/// Builds fully-qualified requests against one configured backend.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    timeout_ms: u64,
    max_response_size: usize,
}

impl Endpoints {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            base: config.base_url().to_string(),
            timeout_ms: config.request_timeout_ms(),
            max_response_size: config.max_response_bytes(),
        }
    }

    /// `GET /api/activities?limit={limit}&offset={offset}`
    pub fn list_activities(&self, limit: u32, offset: u32) -> Result<HttpRequest, HttpError> {
        let mut url = self.join(ACTIVITIES_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        self.get(&url)
    }

    /// `GET /api/activities/{id}/track`
    ///
    /// The id is pushed as a single path segment, so reserved characters are
    /// percent-encoded rather than altering the route.
    pub fn activity_track(&self, id: &ActivityId) -> Result<HttpRequest, HttpError> {
        let mut url = self.join(ACTIVITIES_PATH)?;
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl {
                url: self.base.clone(),
                reason: "base URL cannot carry path segments".to_string(),
            })?
            .push(id.as_str())
            .push("track");
        self.get(&url)
    }

    /// `GET /healthz`
    pub fn health(&self) -> Result<HttpRequest, HttpError> {
        let url = self.join(HEALTH_PATH)?;
        HttpRequest::get(ValidatedUrl::from_url(&url)?)
            .with_max_response_size(self.max_response_size)
            .with_timeout_ms(self.timeout_ms)
    }

    fn join(&self, path: &str) -> Result<Url, HttpError> {
        Url::parse(&self.base)
            .and_then(|base| base.join(path))
            .map_err(|e| HttpError::InvalidUrl {
                url: format!("{}{}", self.base, path),
                reason: e.to_string(),
            })
    }

    fn get(&self, url: &Url) -> Result<HttpRequest, HttpError> {
        HttpRequest::get(ValidatedUrl::from_url(url)?)
            .with_max_response_size(self.max_response_size)
            .with_header("Accept", "application/json")?
            .with_timeout_ms(self.timeout_ms)
    }
}
