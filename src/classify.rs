//! Mapping of the CAQI index onto the five-band air quality scale.

use serde::{Serialize, Serializer};

// ---

/// Ordinal air quality category. `Unknown` is reserved for "no usable data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AirQuality {
    Unknown = 0,
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
}

impl AirQuality {
    /// Classify an index value. Upper bounds are inclusive.
    ///
    /// Zero and NaN map to `Unknown`; everything above 100 collapses into
    /// `Poor` since the scale stops at five bands.
    pub fn from_index(index: f64) -> Self {
        // ---
        if index == 0.0 || index.is_nan() {
            AirQuality::Unknown
        } else if index <= 25.0 {
            AirQuality::Excellent
        } else if index <= 50.0 {
            AirQuality::Good
        } else if index <= 75.0 {
            AirQuality::Fair
        } else if index <= 100.0 {
            AirQuality::Inferior
        } else {
            AirQuality::Poor
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            AirQuality::Unknown => "unknown",
            AirQuality::Excellent => "excellent",
            AirQuality::Good => "good",
            AirQuality::Fair => "fair",
            AirQuality::Inferior => "inferior",
            AirQuality::Poor => "poor",
        }
    }
}

impl Serialize for AirQuality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}
