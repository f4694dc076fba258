//! Collaborator interfaces and event types for the scheduler.
//!
//! The scheduler never produces audio. It talks to three narrow interfaces
//! supplied by whatever renders sound:
//!
//! - [`Host`] - a monotonic clock and one-shot timers
//! - [`ToneParam`] - a continuous tone whose value timeline can be scheduled
//! - [`Instrument`] - a note sink receiving timed triggers

use serde::Serialize;

/// Margin, in milliseconds, by which each pass is queued ahead of when it
/// is due.
pub const LOOKAHEAD_MS: f64 = 25.0;

/// Handle for a pending host timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub u64);

/// Clock and timer source.
///
/// Timers are one-shot. When one fires, the host calls
/// `Scheduler::on_timer` with the id it handed out.
pub trait Host {
    /// Current time in seconds. Must never go backwards.
    fn now(&self) -> f64;

    fn set_timeout(&mut self, delay_ms: f64) -> TimerId;

    /// Cancelling an unknown or already fired id does nothing.
    fn clear_timeout(&mut self, id: TimerId);
}

/// Continuous tone parameter (e.g., an oscillator frequency).
pub trait ToneParam {
    fn schedule_value_at(&mut self, value: f64, time: f64);

    /// Drop every scheduled value at or after `time`.
    fn cancel_from(&mut self, time: f64);
}

/// Note sink.
pub trait Instrument {
    fn trigger(&mut self, frequency: f64, duration: f64, at: f64, velocity: f64);
}

/// One recorded trigger call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub frequency: f64,
    /// Seconds.
    pub duration: f64,
    /// Absolute host time in seconds.
    pub at: f64,
    pub velocity: f64,
}

/// One recorded call on a tone parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ToneEvent {
    Value { value: f64, time: f64 },
    Cancel { from: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}
