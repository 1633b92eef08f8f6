use serde::{Deserialize, Serialize};

/// Temperatures above this many Kelvin are treated as cold daylight.
const COLD_THRESHOLD_KELVIN: f64 = 4600.0;
/// Temperatures above this many Kelvin (and not cold) are treated as neutral.
const NEUTRAL_THRESHOLD_KELVIN: f64 = 3600.0;

/// Largest hue value accepted by a bridge.
pub const MAX_BRIDGE_HUE: u16 = 65_535;
/// Largest saturation or brightness value accepted by a bridge.
pub const MAX_BRIDGE_LEVEL: u8 = 254;

/// Color described by hue, saturation and value, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsv {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

impl Hsv {
    pub fn new(hue: f64, saturation: f64, value: f64) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Returns true when every component lies within `[0.0, 1.0]`.
    pub fn is_in_range(&self) -> bool {
        [self.hue, self.saturation, self.value]
            .iter()
            .all(|component| (0.0..=1.0).contains(component))
    }

    /// Hue scaled to the `0..=65535` range used by bridges.
    pub fn bridge_hue(&self) -> u16 {
        (self.hue.clamp(0.0, 1.0) * f64::from(MAX_BRIDGE_HUE)) as u16
    }

    /// Saturation scaled to `0..=254`.
    pub fn bridge_saturation(&self) -> u8 {
        scale_level(self.saturation)
    }

    /// Value scaled to a `0..=254` brightness.
    pub fn bridge_brightness(&self) -> u8 {
        scale_level(self.value)
    }
}

fn scale_level(component: f64) -> u8 {
    (component.clamp(0.0, 1.0) * f64::from(MAX_BRIDGE_LEVEL)) as u8
}

/// Coarse white temperature settings a light is switched between.
///
/// Temperatures are bucketed rather than mapped continuously: anything above
/// 4600 K is cold, anything above 3600 K is neutral and the rest is warm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBucket {
    /// Roughly 6500 K.
    Cold,
    /// Roughly 4000 K.
    Neutral,
    /// Roughly 2000 K.
    Warm,
}

impl TemperatureBucket {
    pub fn from_kelvin(kelvin: f64) -> Self {
        if kelvin > COLD_THRESHOLD_KELVIN {
            Self::Cold
        } else if kelvin > NEUTRAL_THRESHOLD_KELVIN {
            Self::Neutral
        } else {
            Self::Warm
        }
    }

    /// Approximate mired value (one million divided by Kelvin) of the bucket.
    pub fn mired(self) -> u16 {
        match self {
            Self::Cold => 153,
            Self::Neutral => 250,
            Self::Warm => 500,
        }
    }
}

/// Converts a transition length in seconds into the deciseconds bridges expect.
pub fn transition_deciseconds(seconds: f64) -> u16 {
    (seconds.max(0.0) * 10.0).round().min(f64::from(u16::MAX)) as u16
}
