//! In-memory lights that record what they were asked to do.
//!
//! Used by tests and by dry runs, where no bridge is contacted and every
//! state change is only logged.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{AlertStop, Light, Provider};
use crate::{Hsv, Result, SyncError};

/// A single call received by a [`MemoryLight`].
#[derive(Debug, Clone, PartialEq)]
pub enum LightCall {
    Color {
        light: String,
        color: Hsv,
        transition: f64,
    },
    Temperature {
        light: String,
        kelvin: f64,
        transition: f64,
    },
    Alert {
        light: String,
    },
    StopAlert {
        light: String,
    },
}

impl LightCall {
    pub fn light(&self) -> &str {
        match self {
            Self::Color { light, .. }
            | Self::Temperature { light, .. }
            | Self::Alert { light }
            | Self::StopAlert { light } => light,
        }
    }
}

/// Shared, ordered record of the calls made to a group of lights.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<LightCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<LightCall> {
        self.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls received by the light with the given id.
    pub fn calls_for(&self, light: &str) -> Vec<LightCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.light() == light)
            .collect()
    }

    fn record(&self, call: LightCall) -> Result<()> {
        tracing::info!(?call, "light call");
        self.lock()?.push(call);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LightCall>>> {
        self.calls
            .lock()
            .map_err(|_| SyncError::msg("light call log has been poisoned"))
    }
}

/// Light that records calls into a [`CallLog`] instead of talking to hardware.
#[derive(Debug, Clone)]
pub struct MemoryLight {
    id: String,
    name: String,
    failing: bool,
    log: CallLog,
}

impl MemoryLight {
    pub fn new(id: impl Into<String>, name: impl Into<String>, log: CallLog) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            failing: false,
            log,
        }
    }

    /// Makes every state change on this light fail with a device error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            Err(SyncError::device(&self.id, "light is unreachable"))
        } else {
            Ok(())
        }
    }
}

impl Light for MemoryLight {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_color(&self, color: &Hsv, transition_seconds: f64) -> Result<()> {
        self.check()?;
        self.log.record(LightCall::Color {
            light: self.id.clone(),
            color: *color,
            transition: transition_seconds,
        })
    }

    fn set_temperature(&self, kelvin: f64, transition_seconds: f64) -> Result<()> {
        self.check()?;
        self.log.record(LightCall::Temperature {
            light: self.id.clone(),
            kelvin,
            transition: transition_seconds,
        })
    }

    fn alert(&self) -> Result<AlertStop<'_>> {
        self.check()?;
        self.log.record(LightCall::Alert {
            light: self.id.clone(),
        })?;
        Ok(Box::new(move || {
            self.log.record(LightCall::StopAlert {
                light: self.id.clone(),
            })
        }))
    }
}

/// Provider serving a fixed set of [`MemoryLight`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    lights: Vec<MemoryLight>,
    log: CallLog,
    unavailable: bool,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a light that records into this provider's log.
    pub fn with_light(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let light = MemoryLight::new(id, name, self.log.clone());
        self.lights.push(light);
        self
    }

    /// Adds a light whose state changes always fail.
    pub fn with_failing_light(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let light = MemoryLight::new(id, name, self.log.clone()).failing();
        self.lights.push(light);
        self
    }

    /// Makes enumeration fail, as if the bridge could not be reached.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl Provider for MemoryProvider {
    fn lights(&self) -> Result<Vec<Box<dyn Light>>> {
        if self.unavailable {
            return Err(SyncError::Provider("bridge is unavailable".to_string()));
        }
        Ok(self
            .lights
            .iter()
            .cloned()
            .map(|light| Box::new(light) as Box<dyn Light>)
            .collect())
    }
}
