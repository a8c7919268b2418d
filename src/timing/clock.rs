use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::error::{Error, Result};

pub const DEFAULT_TIME_SCALE: f64 = 1000.0;
pub const MAX_TIME_SCALE: f64 = 1000.0;

/// Mapping from milliseconds to ticks, valid from `start_ms` on.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Timeline {
    start_ms: u32,
    start_ticks: u32,
    /// Ticks per second.
    scale: f64,
}

impl Timeline {
    fn tick_at(&self, ms: u32) -> u32 {
        let elapsed = ms.saturating_sub(self.start_ms) as f64;
        let ticks = (elapsed * self.scale / 1000.0) as u32;
        self.start_ticks.saturating_add(ticks)
    }
}

/// Sequencer time base.
///
/// The render driver feeds a monotonic millisecond count through
/// [`Clock::advance`]; the clock turns it into ticks with the current scale.
/// Changing the scale rebases the timeline at the current moment so ticks
/// stay continuous.
pub struct Clock {
    current_ms: AtomicU32,
    timeline: ArcSwap<Timeline>,
}

impl Clock {
    pub fn new(scale: f64) -> Result<Self> {
        let scale = validate_scale(scale)?;
        Ok(Self {
            current_ms: AtomicU32::new(0),
            timeline: ArcSwap::from_pointee(Timeline {
                start_ms: 0,
                start_ticks: 0,
                scale,
            }),
        })
    }

    /// Stores `now_ms` and returns the matching tick.
    pub fn advance(&self, now_ms: u32) -> u32 {
        self.current_ms.store(now_ms, Ordering::Release);
        self.tick_at(now_ms)
    }

    pub fn now_ms(&self) -> u32 {
        self.current_ms.load(Ordering::Acquire)
    }

    /// Tick at the last millisecond count passed to [`Clock::advance`].
    pub fn tick(&self) -> u32 {
        self.tick_at(self.now_ms())
    }

    pub fn tick_at(&self, ms: u32) -> u32 {
        self.timeline.load().tick_at(ms)
    }

    pub fn scale(&self) -> f64 {
        self.timeline.load().scale
    }

    /// Sets the ticks-per-second scale. Scales above [`MAX_TIME_SCALE`] are
    /// clamped; non-positive or non-finite scales are rejected and leave the
    /// clock untouched.
    pub fn set_scale(&self, scale: f64) -> Result<()> {
        let scale = validate_scale(scale)?;
        let now_ms = self.now_ms();
        self.timeline.rcu(|old| {
            Arc::new(Timeline {
                start_ms: now_ms,
                start_ticks: old.tick_at(now_ms),
                scale,
            })
        });
        Ok(())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            current_ms: AtomicU32::new(0),
            timeline: ArcSwap::from_pointee(Timeline {
                start_ms: 0,
                start_ticks: 0,
                scale: DEFAULT_TIME_SCALE,
            }),
        }
    }
}

pub(crate) fn validate_scale(scale: f64) -> Result<f64> {
    if !scale.is_finite() || scale <= 0.0 {
        tracing::warn!(scale, "rejecting time scale");
        return Err(Error::InvalidScale(scale));
    }
    if scale > MAX_TIME_SCALE {
        tracing::warn!(scale, max = MAX_TIME_SCALE, "clamping time scale");
        return Ok(MAX_TIME_SCALE);
    }
    Ok(scale)
}

/// Counts rendered frames and converts them to the millisecond clock the
/// sequencer runs on. Frame accurate, so timing doesn't drift when the audio
/// callback runs late.
#[derive(Clone)]
pub struct SampleTimer {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl SampleTimer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Called by the render loop after each block. Returns the new ms count.
    pub fn advance(&self, frames: usize) -> u32 {
        let total = self.frames.fetch_add(frames as u64, Ordering::AcqRel) + frames as u64;
        self.frames_to_ms(total)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn now_ms(&self) -> u32 {
        self.frames_to_ms(self.frames())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    fn frames_to_ms(&self, frames: u64) -> u32 {
        (frames as f64 * 1000.0 / self.sample_rate) as u32
    }
}
