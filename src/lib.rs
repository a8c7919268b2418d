//! Event coordination core for a real-time synthesizer.
//!
//! Control threads hand events to the render thread through a lock-free
//! [`ControlQueue`]; the [`Sequencer`] orders scheduled events by tick and
//! delivers them to registered clients as the render thread advances time.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod queue;
pub mod sequencer;
pub mod timing;

pub use audio::{Synth, register_synth};
pub use config::EngineConfig;
pub use engine::{EngineCommand, EngineHandle, EngineUpdate, spawn_engine};
pub use error::{Error, Result};
pub use events::{ClientId, EventKind, EventKindTag, EventRecord};
pub use queue::{Consumer, ControlQueue, Producer};
pub use sequencer::{DispatchFn, Sequencer, SequencerConfig};
pub use timing::{Clock, SampleTimer, ScheduledEventStore};
