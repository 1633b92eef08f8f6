//! Core library for huesync.
//!
//! huesync keeps networked lights in step with a pre-recorded timeline of
//! color events while a video plays. A [`Timestamper`] reports the playback
//! position, the [`Timeline`] picks the event that should be showing, the
//! [`ChannelMap`] resolves which lights belong to each channel and the
//! [`pipeline`] loop pushes changes to them.

pub mod clock;
pub mod color;
pub mod config;
pub mod error;
pub mod hue;
pub mod lights;
pub mod mapping;
pub mod pipeline;
pub mod retrieval;
pub mod setup;
pub mod timeline;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ScriptedClock, Timestamper};
pub use color::{Hsv, TemperatureBucket};
pub use config::{ConfigStore, RunSettings};
pub use error::{Result, SyncError};
pub use hue::{Bridge, HueProvider};
pub use lights::{AlertStop, Light, Provider};
pub use mapping::{ChannelAssignment, ChannelKind, ChannelMap};
pub use pipeline::{run_once, RunContext};
pub use retrieval::{HttpRetriever, InMemoryRetriever, Retriever};
pub use timeline::{decode, ColorUpdate, Timeline};
