use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::units::SpeedUnit;

/// Identifier of one recorded activity; the detail cache key and the `:id`
/// segment of the detail route.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl ActivityId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Validated lat/lon
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() { return None; }
        if !(-90.0..=90.0).contains(&lat) { return None; }
        if !(-180.0..=180.0).contains(&lon) { return None; }
        Some(Self { lat, lon })
    }
}

/// One row of the activity list.
///
/// Only `id` is interpreted on the way in. Every other key is kept in
/// `fields` exactly as the backend sent it and serializes back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityListEntry {
    pub id: ActivityId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ActivityListEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ActivityId::new(id),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Typed view over the well-known keys. Keys with an unexpected type
    /// read as absent.
    pub fn summary(&self) -> ActivitySummary {
        ActivitySummary::from_fields(&self.fields)
    }

    /// Average speed over the whole activity, when both distance and a
    /// non-zero duration are known.
    pub fn average_speed_mps(&self) -> Option<f64> {
        self.summary().average_speed_mps()
    }
}

/// Body of `GET /api/activities`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub items: Option<Vec<ActivityListEntry>>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl ListResponse {
    /// Items as sent, with a missing or `null` collection read as empty.
    pub fn into_items(self) -> Vec<ActivityListEntry> {
        self.items.unwrap_or_default()
    }
}

/// Read-only view of the metadata keys shared by list rows and the detail
/// `summary` object. Numbers are read as `f64` whether sent as integers or
/// floats.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub started_at: Option<String>,
    pub sport: Option<String>,
    pub duration_sec: Option<f64>,
    pub distance_m: Option<f64>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
}

impl ActivitySummary {
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_owned);
        let number = |key: &str| fields.get(key).and_then(Value::as_f64);
        Self {
            started_at: text("started_at"),
            sport: text("sport"),
            duration_sec: number("duration_sec"),
            distance_m: number("distance_m"),
            avg_hr: number("avg_hr"),
            max_hr: number("max_hr"),
        }
    }

    pub fn average_speed_mps(&self) -> Option<f64> {
        match (self.distance_m, self.duration_sec) {
            (Some(d), Some(t)) if t > 0.0 => Some(d / t),
            _ => None,
        }
    }
}

/// Body of `GET /api/activities/{id}/track`.
///
/// The payload is cached verbatim as a JSON object; `summary`, `geojson` and
/// `series` are read on demand by the accessors below and may be missing,
/// `null` or of any shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityDetail(pub Map<String, Value>);

impl ActivityDetail {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn id(&self) -> Option<ActivityId> {
        self.get("id").and_then(Value::as_str).map(ActivityId::new)
    }

    /// Typed view of the `summary` object; empty when it is absent or not an
    /// object.
    pub fn summary(&self) -> ActivitySummary {
        match self.get("summary") {
            Some(Value::Object(fields)) => ActivitySummary::from_fields(fields),
            _ => ActivitySummary::default(),
        }
    }

    /// The track as a GeoJSON feature, if the payload is one.
    pub fn track(&self) -> Option<geojson::Feature> {
        self.get("geojson")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Ordered path of the track. Positions outside valid lat/lon ranges are
    /// skipped; GeoJSON orders positions as `[lon, lat]`.
    pub fn path(&self) -> Vec<LatLon> {
        let Some(geometry) = self.track().and_then(|f| f.geometry) else {
            return Vec::new();
        };
        match geometry.value {
            geojson::Value::LineString(positions) => positions
                .iter()
                .filter_map(|p| match p.as_slice() {
                    [lon, lat, ..] => LatLon::new(*lat, *lon),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn typed_series(&self) -> Option<TrackSeries> {
        self.get("series")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Per-point chart series, index-aligned.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSeries {
    pub time_iso: Vec<String>,
    pub elapsed_sec: Vec<f64>,
    pub elevation: Vec<Option<f64>>,
    pub hr: Vec<Option<i32>>,
    pub speed_mps: Vec<Option<f64>>,
    pub speed_kmh: Vec<Option<f64>>,
    pub pace_min_per_km: Vec<Option<f64>>,
}

impl TrackSeries {
    pub fn len(&self) -> usize {
        self.elapsed_sec.len().max(self.time_iso.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Speeds converted into `unit`, recomputed from m/s so every unit comes
    /// from the same source column.
    pub fn speed_in(&self, unit: SpeedUnit) -> Vec<Option<f64>> {
        self.speed_mps
            .iter()
            .map(|s| s.and_then(|mps| unit.from_mps(mps)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_entry_tolerates_missing_fields() {
        let entry: ActivityListEntry = serde_json::from_value(json!({"id": "a"})).unwrap();
        assert_eq!(entry, ActivityListEntry::new("a"));
        assert_eq!(entry.summary(), ActivitySummary::default());
        assert_eq!(entry.average_speed_mps(), None);
    }

    #[test]
    fn list_entry_average_speed() {
        let entry: ActivityListEntry = serde_json::from_value(json!({
            "id": "0f8a",
            "started_at": "2024-05-01T07:30:00Z",
            "sport": "running",
            "duration_sec": 1800,
            "distance_m": 5400,
            "avg_hr": 151
        }))
        .unwrap();
        assert_eq!(entry.average_speed_mps(), Some(3.0));
        assert_eq!(entry.summary().sport.as_deref(), Some("running"));
    }

    #[test]
    fn list_entry_keeps_unknown_keys_and_float_values() {
        let raw = json!({
            "id": "a",
            "name": "Morning run",
            "distance_m": 5400.5,
            "duration_sec": 1800,
            "sport": 7,
            "tags": ["easy", "commute"]
        });
        let entry: ActivityListEntry = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(entry.get("name"), Some(&json!("Morning run")));
        let summary = entry.summary();
        assert_eq!(summary.distance_m, Some(5400.5));
        assert_eq!(summary.sport, None);
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn list_entry_without_id_is_rejected() {
        let err = serde_json::from_value::<ActivityListEntry>(json!({"name": "x"}));
        assert!(err.is_err());
    }

    #[test]
    fn list_response_null_items_read_as_empty() {
        let resp: ListResponse = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(resp.into_items().is_empty());
        let resp: ListResponse = serde_json::from_value(json!({"limit": 20})).unwrap();
        assert_eq!(resp.limit, Some(20));
        assert!(resp.into_items().is_empty());
    }

    #[test]
    fn detail_accepts_opaque_payload() {
        let raw = json!({"summary": {}, "geojson": {}, "series": []});
        let detail: ActivityDetail = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(detail.summary(), ActivitySummary::default());
        assert_eq!(detail.get("series"), Some(&json!([])));
        assert!(detail.track().is_none());
        assert!(detail.path().is_empty());
        assert!(detail.typed_series().unwrap_or_default().is_empty());
        assert_eq!(serde_json::to_value(&detail).unwrap(), raw);
    }

    #[test]
    fn detail_with_null_summary_and_extra_keys_is_kept_verbatim() {
        let raw = json!({
            "summary": null,
            "geojson": null,
            "laps": [{"n": 1, "distance_m": 1000.25}],
            "device": {"model": "Edge 530"}
        });
        let detail: ActivityDetail = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(detail.summary(), ActivitySummary::default());
        assert!(detail.path().is_empty());
        assert!(detail.typed_series().is_none());
        assert_eq!(detail.get("device"), Some(&json!({"model": "Edge 530"})));
        assert_eq!(serde_json::to_value(&detail).unwrap(), raw);
    }

    #[test]
    fn detail_exposes_track_and_series() {
        let detail: ActivityDetail = serde_json::from_value(json!({
            "id": "abc",
            "summary": {"sport": "cycling", "distance_m": 1200, "note": "windy"},
            "geojson": {
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[13.40, 52.52], [13.41, 52.53], [200.0, 95.0]]
                },
                "properties": {}
            },
            "series": {
                "time_iso": ["2024-05-01T07:30:00Z", "2024-05-01T07:30:05Z"],
                "elapsed_sec": [0.0, 5.0],
                "elevation": [34.0, null],
                "hr": [120, 122],
                "speed_mps": [null, 5.0],
                "speed_kmh": [null, 18.0],
                "pace_min_per_km": [null, 3.2]
            }
        }))
        .unwrap();

        assert_eq!(detail.id(), Some(ActivityId::new("abc")));
        assert_eq!(detail.summary().distance_m, Some(1200.0));
        assert_eq!(detail.get("summary").unwrap()["note"], "windy");

        let path = detail.path();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0], LatLon { lat: 52.52, lon: 13.40 });

        let series = detail.typed_series().unwrap();
        assert_eq!(series.len(), 2);
        let kmh = series.speed_in(SpeedUnit::Kmh);
        assert_eq!(kmh[0], None);
        assert!((kmh[1].unwrap() - 18.0).abs() < 1e-9);
        assert_eq!(series.speed_in(SpeedUnit::Pace)[0], None);
    }

    #[test]
    fn latlon_validates() {
        assert!(LatLon::new(f64::NAN, 0.0).is_none());
        assert!(LatLon::new(91.0, 0.0).is_none());
        assert!(LatLon::new(0.0, -181.0).is_none());
        assert!(LatLon::new(45.0, -73.0).is_some());
    }
}
