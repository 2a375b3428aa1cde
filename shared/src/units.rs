//! Display units for speed-derived metrics.
//!
//! Track series carry raw speeds in metres per second; every view converts
//! through [`SpeedUnit`] so the selected preference applies everywhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Kmh,
    Mps,
    /// Minutes per kilometre.
    Pace,
}

impl SpeedUnit {
    pub const ALL: [SpeedUnit; 3] = [SpeedUnit::Kmh, SpeedUnit::Mps, SpeedUnit::Pace];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kmh => "kmh",
            Self::Mps => "mps",
            Self::Pace => "pace",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kmh => "km/h",
            Self::Mps => "m/s",
            Self::Pace => "min/km",
        }
    }

    /// Converts a speed in m/s into this unit.
    ///
    /// Pace is undefined when standing still, so non-positive speeds yield
    /// `None` for [`SpeedUnit::Pace`]. Non-finite input always yields `None`.
    #[must_use]
    pub fn from_mps(self, mps: f64) -> Option<f64> {
        if !mps.is_finite() {
            return None;
        }
        match self {
            Self::Kmh => Some(mps * MPS_TO_KMH),
            Self::Mps => Some(mps),
            Self::Pace => pace_min_per_km(mps),
        }
    }

    /// Renders a speed for display, e.g. `12.6 km/h` or `4'45" /km`.
    #[must_use]
    pub fn format(self, mps: f64) -> String {
        match (self, self.from_mps(mps)) {
            (_, None) => "-".to_string(),
            (Self::Pace, Some(pace)) => format!("{} /km", format_pace(pace)),
            (Self::Kmh, Some(v)) => format!("{v:.1} {}", self.label()),
            (Self::Mps, Some(v)) => format!("{v:.2} {}", self.label()),
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kmh" => Ok(Self::Kmh),
            "mps" => Ok(Self::Mps),
            "pace" => Ok(Self::Pace),
            _ => Err(ValidationError::UnknownUnit(s.to_string())),
        }
    }
}

/// Decimal minutes per kilometre, `None` for non-positive speeds.
#[must_use]
pub fn pace_min_per_km(mps: f64) -> Option<f64> {
    if !mps.is_finite() || mps <= 0.0 {
        return None;
    }
    Some(1000.0 / mps / 60.0)
}

/// Formats decimal minutes as `m'ss"`, carrying rounded-up seconds into the minute.
#[must_use]
pub fn format_pace(min_per_km: f64) -> String {
    if !min_per_km.is_finite() || min_per_km < 0.0 {
        return "-".to_string();
    }
    let total_secs = (min_per_km * 60.0).round() as u64;
    format!("{}'{:02}\"", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_is_kmh() {
        assert_eq!(SpeedUnit::default(), SpeedUnit::Kmh);
    }

    #[test]
    fn parses_wire_names() {
        for unit in SpeedUnit::ALL {
            assert_eq!(unit.as_str().parse::<SpeedUnit>().unwrap(), unit);
        }
        assert_eq!(" PACE ".parse::<SpeedUnit>().unwrap(), SpeedUnit::Pace);
        assert!(matches!(
            "mph".parse::<SpeedUnit>(),
            Err(ValidationError::UnknownUnit(u)) if u == "mph"
        ));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&SpeedUnit::Pace).unwrap(), "\"pace\"");
        let unit: SpeedUnit = serde_json::from_str("\"mps\"").unwrap();
        assert_eq!(unit, SpeedUnit::Mps);
    }

    #[test]
    fn converts_speeds() {
        assert_eq!(SpeedUnit::Mps.from_mps(3.5), Some(3.5));
        assert!((SpeedUnit::Kmh.from_mps(10.0).unwrap() - 36.0).abs() < 1e-9);
        // 1000 m in 300 s is 5 min/km
        let pace = SpeedUnit::Pace.from_mps(1000.0 / 300.0).unwrap();
        assert!((pace - 5.0).abs() < 1e-9);
        assert_eq!(SpeedUnit::Pace.from_mps(0.0), None);
        assert_eq!(SpeedUnit::Pace.from_mps(-1.0), None);
        assert_eq!(SpeedUnit::Kmh.from_mps(f64::NAN), None);
    }

    #[test]
    fn formats_for_display() {
        assert_eq!(SpeedUnit::Kmh.format(3.5), "12.6 km/h");
        assert_eq!(SpeedUnit::Mps.format(3.5), "3.50 m/s");
        assert_eq!(SpeedUnit::Pace.format(1000.0 / 285.0), "4'45\" /km");
        assert_eq!(SpeedUnit::Pace.format(0.0), "-");
    }

    #[test]
    fn pace_formatting_carries_seconds() {
        assert_eq!(format_pace(5.55), "5'33\"");
        assert_eq!(format_pace(4.9999), "5'00\"");
        assert_eq!(format_pace(f64::INFINITY), "-");
    }

    proptest! {
        #[test]
        fn kmh_is_mps_scaled(mps in 0.0f64..100.0) {
            let kmh = SpeedUnit::Kmh.from_mps(mps).unwrap();
            prop_assert!((kmh - mps * MPS_TO_KMH).abs() < 1e-9);
        }

        #[test]
        fn faster_means_lower_pace(a in 0.1f64..50.0, delta in 0.01f64..10.0) {
            let slow = pace_min_per_km(a).unwrap();
            let fast = pace_min_per_km(a + delta).unwrap();
            prop_assert!(fast < slow);
        }
    }
}
