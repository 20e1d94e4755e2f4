use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse Wi-Fi band classification of a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "2.4")]
    TwoPointFour,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Band {
    /// Classify a frequency of unknown unit.
    ///
    /// Kismet stores kHz (2412000 for channel 1), but Hz, MHz and GHz values
    /// are recognised by magnitude so imported captures classify too.
    pub fn from_frequency(frequency: f64) -> Band {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Band::Unknown;
        }

        let mhz = if frequency > 1.0e8 {
            frequency / 1.0e6
        } else if frequency > 1.0e5 {
            frequency / 1.0e3
        } else if frequency > 100.0 {
            frequency
        } else {
            frequency * 1.0e3
        };

        if (2400.0..=2500.0).contains(&mhz) {
            Band::TwoPointFour
        } else if (5150.0..=5895.0).contains(&mhz) {
            Band::Five
        } else if (5925.0..=7125.0).contains(&mhz) {
            Band::Six
        } else {
            Band::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Band::TwoPointFour => "2.4",
            Band::Five => "5",
            Band::Six => "6",
            Band::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Band {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let token = token
            .strip_suffix("GHz")
            .or_else(|| token.strip_suffix("ghz"))
            .unwrap_or(token)
            .trim();
        match token {
            "2.4" => Ok(Band::TwoPointFour),
            "5" => Ok(Band::Five),
            "6" => Ok(Band::Six),
            _ => Err(FilterError::InvalidBand(s.to_string())),
        }
    }
}
