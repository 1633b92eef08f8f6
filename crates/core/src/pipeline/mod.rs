use std::time::Duration;

use crate::{ChannelMap, ColorUpdate, ConfigStore, Provider, Result, Timeline, Timestamper};

/// State of one synchronization run over a fixed set of lights.
///
/// The context only remembers which timeline entry was applied last. Entries
/// are compared by identity, so two equal updates at different positions of
/// the timeline are both applied while re-selecting the same entry is not.
#[derive(Debug)]
pub struct RunContext<'a> {
    channels: ChannelMap<'a>,
    timeline: &'a Timeline,
    transition: f64,
    previous: Option<&'a ColorUpdate>,
}

impl<'a> RunContext<'a> {
    pub fn new(channels: ChannelMap<'a>, timeline: &'a Timeline, transition_seconds: f64) -> Self {
        Self {
            channels,
            timeline,
            transition: transition_seconds,
            previous: None,
        }
    }

    /// Timeline entry applied most recently.
    pub fn previous(&self) -> Option<&'a ColorUpdate> {
        self.previous
    }

    /// Applies whatever update is due at `timestamp`.
    ///
    /// Returns `true` when lights were changed.
    pub fn tick(&mut self, timestamp: f64) -> Result<bool> {
        let timeline = self.timeline;
        let Some(update) = timeline.select(timestamp, self.transition) else {
            return Ok(false);
        };
        if self
            .previous
            .is_some_and(|previous| std::ptr::eq(previous, update))
        {
            return Ok(false);
        }

        tracing::info!(
            update = update.timestamp,
            playback = timestamp,
            "initiating next update"
        );
        self.apply(update)?;
        self.previous = Some(update);
        Ok(true)
    }

    /// Sends `update` to every light on the matching channels.
    ///
    /// Values for channels that have no lights are dropped. The first failing
    /// light aborts the whole update.
    pub fn apply(&self, update: &ColorUpdate) -> Result<()> {
        for (index, color) in update.hues.iter().enumerate() {
            let lights = self.channels.hue(index);
            if lights.is_empty() {
                tracing::debug!(channel = index + 1, "no lights on hue channel");
            }
            for light in lights {
                light.set_color(color, self.transition)?;
            }
        }

        for (index, kelvin) in update.temperatures.iter().enumerate() {
            let lights = self.channels.temperature(index);
            if lights.is_empty() {
                tracing::debug!(channel = index + 1, "no lights on temperature channel");
            }
            for light in lights {
                light.set_temperature(*kelvin, self.transition)?;
            }
        }

        Ok(())
    }
}

/// Keeps the provider's lights in sync with `timeline` until `timestamper`
/// reports that playback is done.
///
/// Lights are enumerated once up front. Every poll reads the current position,
/// applies the due update if it changed and then sleeps for `poll_delay`. Any
/// provider or device error ends the run.
pub fn run_once(
    provider: &dyn Provider,
    timestamper: &mut dyn Timestamper,
    timeline: &Timeline,
    store: &ConfigStore,
    poll_delay: Duration,
    transition_seconds: f64,
) -> Result<()> {
    if !timeline.is_ascending() {
        tracing::warn!("timeline is not sorted by timestamp, selection may skip updates");
    }

    let lights = provider.lights()?;
    let channels = ChannelMap::build(&lights, store);
    tracing::info!(
        lights = lights.len(),
        channels = channels.len(),
        updates = timeline.len(),
        "starting synchronization"
    );

    let mut context = RunContext::new(channels, timeline, transition_seconds);
    while !timestamper.is_done() {
        let timestamp = timestamper.timestamp();
        tracing::trace!(timestamp, "poll");
        context.tick(timestamp)?;
        std::thread::sleep(poll_delay);
    }

    tracing::info!("timestamp source finished, stopping");
    Ok(())
}
