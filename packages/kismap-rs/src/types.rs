use crate::band::Band;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A GPS fix in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a fix from raw capture columns.
    ///
    /// Kismet writes 0/0 when the GPS had no lock, so a zero on either axis
    /// counts as "no fix" just like NULL.
    pub fn from_raw(lat: Option<f64>, lon: Option<f64>) -> Option<GeoPoint> {
        let (lat, lon) = (lat?, lon?);
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if lat == 0.0 || lon == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(GeoPoint { lat, lon })
    }
}

/// One packet sighting joined with its device metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: i64,
    pub mac: String,
    pub device_type: Option<String>,
    pub ssid: Option<String>,
    pub frequency: f64,
    pub band: Band,
    pub signal: i32,
    pub location: Option<GeoPoint>,
}

/// Per-MAC fold of every retained observation of one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPointSummary {
    pub mac: String,
    pub ssid: Option<String>,
    pub device_type: Option<String>,
    pub best_signal: i32,
    /// Band of the best-signal observation
    pub band: Band,
    /// Fix taken from the strongest observation that carried one
    pub location: Option<GeoPoint>,
    pub observation_count: u64,
    /// Unix seconds of the earliest and latest retained observation
    pub first_seen: i64,
    pub last_seen: i64,
}

impl AccessPointSummary {
    pub fn display_ssid(&self) -> &str {
        self.ssid.as_deref().unwrap_or("Hidden")
    }

    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.first_seen, 0)
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_seen, 0)
    }
}

/// Name/count pair used for the ranked lists in [`RunStatistics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub name: String,
    pub count: u64,
}

/// Counters for one run, computed once by the aggregator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_packets: u64,
    pub total_devices: u64,
    pub access_points: u64,
    pub mapped_access_points: u64,
    /// Packets that passed the filters but had no GPS fix (counted, not mapped)
    pub packets_without_fix: u64,
    pub band_counts: BTreeMap<Band, u64>,
    pub device_type_counts: Vec<RankedCount>,
    pub top_ssids: Vec<RankedCount>,
    /// Rows in the capture's devices table, before any filtering
    pub capture_devices: u64,
}

impl RunStatistics {
    pub fn band_count(&self, band: Band) -> u64 {
        self.band_counts.get(&band).copied().unwrap_or(0)
    }
}

/// Normalize a MAC address to upper-case, colon separated form.
///
/// Returns `None` unless the input is six hex octets separated by `:` or `-`.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let octets: Vec<&str> = raw.trim().split([':', '-']).collect();
    if octets.len() != 6 {
        return None;
    }
    if octets
        .iter()
        .any(|o| o.len() != 2 || !o.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return None;
    }
    Some(octets.join(":").to_ascii_uppercase())
}
