//! Capabilities of a lighting system as seen by the synchronization pipeline.
//!
//! Bridges implement [`Provider`] and hand out [`Light`] handles. The
//! pipeline borrows those handles for the duration of a run and never owns
//! the devices behind them.

pub mod memory;

use crate::{Hsv, Result};

/// Callback that ends an alert started with [`Light::alert`].
pub type AlertStop<'a> = Box<dyn FnOnce() -> Result<()> + 'a>;

/// Makes lights available.
pub trait Provider {
    /// Returns every light the provider can drive.
    fn lights(&self) -> Result<Vec<Box<dyn Light>>>;
}

/// A single controllable light.
pub trait Light {
    /// Unique, stable identifier of the light.
    fn id(&self) -> &str;

    /// Human readable name of the light.
    fn name(&self) -> &str;

    /// Fades the light to `color` over `transition_seconds`.
    fn set_color(&self, color: &Hsv, transition_seconds: f64) -> Result<()>;

    /// Fades the light to a white of roughly `kelvin` over `transition_seconds`.
    fn set_temperature(&self, kelvin: f64, transition_seconds: f64) -> Result<()>;

    /// Starts flashing the light so a person can identify it.
    fn alert(&self) -> Result<AlertStop<'_>>;
}

impl std::fmt::Debug for dyn Light + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Light")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
