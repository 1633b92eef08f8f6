use std::time::{Duration, Instant};

/// Source of the current playback position of some medium.
pub trait Timestamper {
    /// Returns true once the medium has finished playing.
    fn is_done(&self) -> bool;

    /// Current playback position in seconds.
    fn timestamp(&mut self) -> f64;
}

/// Timestamper that follows the wall clock.
///
/// Playback is assumed to have started when the clock was created, shifted by
/// a fixed offset. A negative offset delays the timeline, a positive one joins
/// it mid-way. The clock never reports itself as done.
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
    offset: f64,
}

impl Clock {
    pub fn start(offset_seconds: f64) -> Self {
        Self {
            start: Instant::now(),
            offset: offset_seconds,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Timestamper for Clock {
    fn is_done(&self) -> bool {
        false
    }

    fn timestamp(&mut self) -> f64 {
        self.elapsed().as_secs_f64() + self.offset
    }
}

/// Finite timestamper that replays a fixed list of positions, one per read.
///
/// It reports done once every position has been handed out, which makes runs
/// driven by it deterministic and bounded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClock {
    timestamps: Vec<f64>,
    cursor: usize,
}

impl ScriptedClock {
    pub fn new(timestamps: impl Into<Vec<f64>>) -> Self {
        Self {
            timestamps: timestamps.into(),
            cursor: 0,
        }
    }

    /// Number of positions handed out so far.
    pub fn reads(&self) -> usize {
        self.cursor
    }
}

impl Timestamper for ScriptedClock {
    fn is_done(&self) -> bool {
        self.cursor >= self.timestamps.len()
    }

    fn timestamp(&mut self) -> f64 {
        // Past the end the last position repeats.
        let value = self
            .timestamps
            .get(self.cursor)
            .or_else(|| self.timestamps.last())
            .copied()
            .unwrap_or_default();
        self.cursor = (self.cursor + 1).min(self.timestamps.len());
        value
    }
}
