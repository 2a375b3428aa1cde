// lib.rs - activity store core shared by the web and mobile shells

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod units;

pub use capabilities::{HttpError, HttpRequest, HttpResponse, HttpResult, HttpTransport};
pub use config::StoreConfig;
pub use error::{ConfigError, StoreError, ValidationError};
pub use model::{
    ActivityDetail, ActivityId, ActivityListEntry, ActivitySummary, LatLon, ListResponse,
    TrackSeries,
};
pub use store::{ActivityStore, ActivityStoreState, ListQuery};
pub use units::SpeedUnit;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const DEFAULT_LIST_OFFSET: u32 = 0;
