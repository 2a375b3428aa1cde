//! The activity store: the single owner of client-side activity data.
//!
//! One store is constructed per client session and handed to the views.
//! State lives in a `watch` channel so every change is published to
//! subscribers; views re-render from the latest snapshot.
//!
//! Overlapping operations are allowed. `loading` counts outstanding
//! operations rather than being set and cleared by each one, so an early
//! finisher cannot hide a later request that is still in flight. `error`
//! stays a single last-write-wins field. Concurrent detail fetches for the
//! same id share one request.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::Endpoints;
use crate::capabilities::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::config::StoreConfig;
use crate::error::{StoreError, ValidationError};
use crate::model::{ActivityDetail, ActivityId, ActivityListEntry, ListResponse};
use crate::units::SpeedUnit;
use crate::{DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: u32,
}

impl ListQuery {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityStoreState {
    /// Replaced wholesale by each successful list fetch.
    pub items: Vec<ActivityListEntry>,
    /// Count hint; the backend does not report totals yet.
    pub total_known: usize,
    pub loading: bool,
    /// Empty when the last operation succeeded.
    pub error: String,
    /// Append-only for the life of the store.
    pub details: HashMap<ActivityId, Arc<ActivityDetail>>,
    pub unit: SpeedUnit,
    #[serde(skip)]
    outstanding: usize,
}

impl ActivityStoreState {
    pub fn detail(&self, id: &ActivityId) -> Option<&Arc<ActivityDetail>> {
        self.details.get(id)
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    fn begin(&mut self) {
        self.outstanding += 1;
        self.loading = true;
        self.error.clear();
    }

    fn end(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.loading = self.outstanding > 0;
    }
}

type SharedOutcome = Option<Result<Arc<ActivityDetail>, StoreError>>;

enum Role {
    Cached(Arc<ActivityDetail>),
    Join(watch::Receiver<SharedOutcome>),
    Lead(watch::Sender<SharedOutcome>),
}

pub struct ActivityStore<T> {
    transport: T,
    endpoints: Endpoints,
    default_limit: u32,
    state: watch::Sender<ActivityStoreState>,
    in_flight: Mutex<HashMap<ActivityId, watch::Receiver<SharedOutcome>>>,
}

impl<T: HttpTransport> ActivityStore<T> {
    pub fn new(transport: T, config: &StoreConfig) -> Self {
        let (state, _) = watch::channel(ActivityStoreState::default());
        Self {
            transport,
            endpoints: Endpoints::new(config),
            default_limit: config.default_limit(),
            state,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// First page at the configured page size.
    pub fn default_query(&self) -> ListQuery {
        ListQuery::new(self.default_limit, DEFAULT_LIST_OFFSET)
    }

    pub fn snapshot(&self) -> ActivityStoreState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<ActivityStoreState> {
        self.state.subscribe()
    }

    pub fn unit(&self) -> SpeedUnit {
        self.state.borrow().unit
    }

    pub fn cached_detail(&self, id: &ActivityId) -> Option<Arc<ActivityDetail>> {
        self.state.borrow().details.get(id).cloned()
    }

    pub fn set_unit(&self, unit: SpeedUnit) {
        self.state.send_modify(|s| s.unit = unit);
        debug!(unit = %unit, "speed unit selected");
    }

    /// Parses a unit name and applies it. Unknown names leave the current
    /// unit untouched.
    pub fn set_unit_str(&self, unit: &str) -> Result<(), ValidationError> {
        let unit = unit.parse::<SpeedUnit>()?;
        self.set_unit(unit);
        Ok(())
    }

    /// Loads one page of the activity list into `items`.
    ///
    /// Failures are recorded in `error` and never returned; `items` keeps
    /// its previous contents when the fetch fails.
    #[instrument(skip(self, query), fields(limit = query.limit, offset = query.offset))]
    pub async fn fetch_list(&self, query: ListQuery) {
        let _op = Operation::begin(&self.state);

        let result = match self
            .endpoints
            .list_activities(query.limit, query.offset)
        {
            Ok(request) => self
                .send(request)
                .await
                .and_then(|resp| Self::decode::<ListResponse>(&resp)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(body) => {
                let items = body.into_items();
                info!(count = items.len(), "activity list loaded");
                self.state.send_modify(|s| s.items = items);
            }
            Err(e) => {
                warn!(error = %e, "activity list fetch failed");
                self.state.send_modify(|s| s.error = e.to_string());
            }
        }
    }

    /// Returns the detail for `id`, from cache when present.
    ///
    /// A cache hit does no I/O and leaves `loading`/`error` alone. A miss
    /// issues one request; callers that arrive while it is outstanding wait
    /// for the same result. Failures are recorded in `error`, returned to
    /// every waiting caller, and never cached.
    #[instrument(skip(self, id), fields(activity_id = %id))]
    pub async fn fetch_detail(&self, id: &ActivityId) -> Result<Arc<ActivityDetail>, StoreError> {
        if let Some(hit) = self.cached_detail(id) {
            debug!("detail cache hit");
            return Ok(hit);
        }

        let role = {
            let mut in_flight = self.in_flight.lock().map_err(|_| StoreError::LockPoisoned)?;

            // A leader inserts into the cache before releasing its slot, so
            // checking again under the lock closes the gap between the two.
            if let Some(hit) = self.cached_detail(id) {
                Role::Cached(hit)
            } else if let Some(pending) = in_flight.get(id) {
                Role::Join(pending.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                in_flight.insert(id.clone(), rx);
                Role::Lead(tx)
            }
        };

        let publish = match role {
            Role::Cached(hit) => return Ok(hit),
            Role::Join(pending) => {
                debug!("joining in-flight detail request");
                return Self::await_shared(pending, id).await;
            }
            Role::Lead(publish) => publish,
        };
        let _slot = InFlightSlot {
            map: &self.in_flight,
            id: id.clone(),
        };

        let result = self.load_detail(id).await;
        publish.send_replace(Some(result.clone()));
        result
    }

    /// Probes the backend's health endpoint. Store state is not touched.
    pub async fn check_health(&self) -> Result<(), StoreError> {
        let request = self.endpoints.health()?;
        self.send(request).await.map(|_| ())
    }

    #[instrument(skip(self, id), fields(activity_id = %id))]
    async fn load_detail(&self, id: &ActivityId) -> Result<Arc<ActivityDetail>, StoreError> {
        let _op = Operation::begin(&self.state);

        let result = match self.endpoints.activity_track(id) {
            Ok(request) => self
                .send(request)
                .await
                .and_then(|resp| Self::decode::<ActivityDetail>(&resp)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(detail) => {
                let fresh = Arc::new(detail);
                let mut stored = Arc::clone(&fresh);
                self.state.send_modify(|s| {
                    stored = Arc::clone(s.details.entry(id.clone()).or_insert(fresh));
                });
                info!("activity detail cached");
                Ok(stored)
            }
            Err(e) => {
                warn!(error = %e, "activity detail fetch failed");
                self.state.send_modify(|s| s.error = e.to_string());
                Err(e)
            }
        }
    }

    async fn await_shared(
        mut pending: watch::Receiver<SharedOutcome>,
        id: &ActivityId,
    ) -> Result<Arc<ActivityDetail>, StoreError> {
        let outcome = match pending.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(StoreError::Abandoned { id: id.clone() }))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StoreError> {
        let request_id = request.request_id().to_string();
        debug!(
            method = request.method().as_str(),
            url = request.url().as_str(),
            request_id = %request_id,
            "issuing request"
        );

        let max = request.max_response_size();
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(StoreError::Status {
                status: response.status(),
                request_id,
            });
        }
        if response.body().len() > max {
            return Err(HttpError::ResponseTooLarge {
                size: response.body().len(),
                max,
            }
            .into());
        }
        Ok(response)
    }

    fn decode<B: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<B, StoreError> {
        serde_json::from_slice(response.body()).map_err(|e| StoreError::Decode {
            reason: e.to_string(),
        })
    }
}

/// Marks one outstanding operation for as long as it is alive, so `loading`
/// settles even when the caller drops the future mid-request.
struct Operation<'a> {
    state: &'a watch::Sender<ActivityStoreState>,
}

impl<'a> Operation<'a> {
    fn begin(state: &'a watch::Sender<ActivityStoreState>) -> Self {
        state.send_modify(ActivityStoreState::begin);
        Self { state }
    }
}

impl Drop for Operation<'_> {
    fn drop(&mut self) {
        self.state.send_modify(ActivityStoreState::end);
    }
}

/// Releases the in-flight entry for a detail request when the leader
/// finishes or is dropped.
struct InFlightSlot<'a> {
    map: &'a Mutex<HashMap<ActivityId, watch::Receiver<SharedOutcome>>>,
    id: ActivityId,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(&self.id);
        }
    }
}
