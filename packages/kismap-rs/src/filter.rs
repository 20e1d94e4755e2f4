//! Observation filtering.
//!
//! Every active filter is ANDed; an empty set or unset value disables that
//! filter. Whether a device counts as an access point is delegated to a
//! [`DeviceClassifier`] so synthetic device types can be used in tests.

use crate::band::Band;
use crate::error::FilterError;
use crate::types::{normalize_mac, Observation};
use std::collections::{BTreeSet, HashSet};

pub const DEFAULT_MIN_SIGNAL: i32 = -100;

/// Decides whether a device-type label denotes an access point.
pub trait DeviceClassifier {
    fn is_access_point(&self, device_type: &str) -> bool;
}

/// Kismet labels APs as "Wi-Fi AP" (and "Wi-Fi WDS AP" etc.)
#[derive(Debug, Default, Clone, Copy)]
pub struct KismetApClassifier;

impl DeviceClassifier for KismetApClassifier {
    fn is_access_point(&self, device_type: &str) -> bool {
        device_type.split_whitespace().any(|word| word == "AP")
    }
}

/// Classifier backed by an arbitrary predicate
pub struct FnClassifier<F>(pub F);

impl<F> DeviceClassifier for FnClassifier<F>
where
    F: Fn(&str) -> bool,
{
    fn is_access_point(&self, device_type: &str) -> bool {
        (self.0)(device_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub bands: BTreeSet<Band>,
    pub essids: HashSet<String>,
    /// Normalized (upper-case, colon separated)
    pub macs: HashSet<String>,
    pub device_type: Option<String>,
    pub min_signal: i32,
    pub all_devices: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bands: BTreeSet::new(),
            essids: HashSet::new(),
            macs: HashSet::new(),
            device_type: None,
            min_signal: DEFAULT_MIN_SIGNAL,
            all_devices: false,
        }
    }
}

impl FilterConfig {
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// Keep/drop decision for one observation.
    pub fn matches(&self, obs: &Observation, classifier: &dyn DeviceClassifier) -> bool {
        if !self.bands.is_empty() && !self.bands.contains(&obs.band) {
            return false;
        }

        if !self.essids.is_empty() {
            match obs.ssid {
                Some(ref ssid) if self.essids.contains(ssid) => {}
                _ => return false,
            }
        }

        if !self.macs.is_empty() && !self.macs.contains(&obs.mac) {
            return false;
        }

        if let Some(ref wanted) = self.device_type {
            if obs.device_type.as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }

        if obs.signal < self.min_signal {
            return false;
        }

        self.all_devices || is_access_point(obs, classifier)
    }
}

/// An observation without a known device type is never an AP.
pub fn is_access_point(obs: &Observation, classifier: &dyn DeviceClassifier) -> bool {
    obs.device_type
        .as_deref()
        .is_some_and(|t| classifier.is_access_point(t))
}

/// Collects raw filter tokens (as typed on the command line) and validates
/// them into a [`FilterConfig`].
#[derive(Debug, Default)]
pub struct FilterConfigBuilder {
    bands: Vec<String>,
    essids: Vec<String>,
    macs: Vec<String>,
    device_type: Option<String>,
    min_signal: Option<i32>,
    all_devices: bool,
}

impl FilterConfigBuilder {
    pub fn bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bands.extend(bands.into_iter().map(Into::into));
        self
    }

    pub fn essids<I, S>(mut self, essids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.essids.extend(essids.into_iter().map(Into::into));
        self
    }

    pub fn macs<I, S>(mut self, macs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.macs.extend(macs.into_iter().map(Into::into));
        self
    }

    pub fn device_type(mut self, device_type: Option<String>) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn min_signal(mut self, min_signal: i32) -> Self {
        self.min_signal = Some(min_signal);
        self
    }

    pub fn all_devices(mut self, all_devices: bool) -> Self {
        self.all_devices = all_devices;
        self
    }

    pub fn build(self, classifier: &dyn DeviceClassifier) -> Result<FilterConfig, FilterError> {
        let bands = self
            .bands
            .iter()
            .map(|b| b.parse::<Band>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        if self.essids.iter().any(|e| e.is_empty()) {
            return Err(FilterError::EmptyEssid);
        }
        let essids: HashSet<String> = self.essids.into_iter().collect();

        let macs = self
            .macs
            .iter()
            .map(|m| normalize_mac(m).ok_or_else(|| FilterError::InvalidMac(m.clone())))
            .collect::<Result<HashSet<_>, _>>()?;

        let min_signal = self.min_signal.unwrap_or(DEFAULT_MIN_SIGNAL);
        if min_signal > 0 {
            return Err(FilterError::InvalidMinSignal(min_signal));
        }

        let device_type = self
            .device_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if let Some(ref t) = device_type {
            if !self.all_devices && !classifier.is_access_point(t) {
                return Err(FilterError::Contradictory(format!(
                    "device type '{}' is not an access point; add --all-devices to include it",
                    t
                )));
            }
        }

        Ok(FilterConfig {
            bands,
            essids,
            macs,
            device_type,
            min_signal,
            all_devices: self.all_devices,
        })
    }
}
