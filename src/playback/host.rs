//! In-process host for tests and offline rendering.
//!
//! [`VirtualHost`] keeps a manual clock and a timer queue; nothing fires
//! until the caller drives it, usually through [`run_until`]. The recording
//! sinks share their logs through `Rc<RefCell<_>>` so a test can keep a
//! handle after the sink is boxed into the scheduler.

use super::engine::Scheduler;
use super::types::{Host, Instrument, TimerId, ToneEvent, ToneParam, Trigger};
use crate::error::SamplerError;
use std::cell::RefCell;
use std::rc::Rc;

pub type TriggerLog = Rc<RefCell<Vec<Trigger>>>;
pub type ToneLog = Rc<RefCell<Vec<ToneEvent>>>;

#[derive(Debug, Clone, Default)]
pub struct VirtualHost {
    now: f64,
    next_id: u64,
    /// (id, due time in seconds)
    timers: Vec<(TimerId, f64)>,
    /// Added to every timer, simulating a late host.
    latency_ms: f64,
}

impl VirtualHost {
    pub fn new(start: f64) -> Self {
        Self { now: start, ..Self::default() }
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms.max(0.0);
        self
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Remove the earliest timer due at or before `until`, moving the clock
    /// to its due time.
    pub fn pop_due(&mut self, until: f64) -> Option<TimerId> {
        let position = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (_, due))| *due <= until)
            .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1).then(a.1 .0.cmp(&b.1 .0)))
            .map(|(position, _)| position)?;
        let (id, due) = self.timers.remove(position);
        self.advance_to(due);
        Some(id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Host for VirtualHost {
    fn now(&self) -> f64 {
        self.now
    }

    fn set_timeout(&mut self, delay_ms: f64) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now + (delay_ms.max(0.0) + self.latency_ms) / 1000.0;
        self.timers.push((id, due));
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        self.timers.retain(|(timer, _)| *timer != id);
    }
}

/// Fire every timer due up to `until` in order, then leave the clock there.
pub fn run_until(scheduler: &mut Scheduler<VirtualHost>, until: f64) -> Result<(), SamplerError> {
    while let Some(id) = scheduler.host_mut().pop_due(until) {
        scheduler.on_timer(id)?;
    }
    scheduler.host_mut().advance_to(until);
    Ok(())
}

/// Instrument that records every trigger.
#[derive(Debug, Clone, Default)]
pub struct RecordingInstrument {
    log: TriggerLog,
}

impl RecordingInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> TriggerLog {
        Rc::clone(&self.log)
    }
}

impl Instrument for RecordingInstrument {
    fn trigger(&mut self, frequency: f64, duration: f64, at: f64, velocity: f64) {
        self.log.borrow_mut().push(Trigger { frequency, duration, at, velocity });
    }
}

/// Tone parameter that records its timeline.
#[derive(Debug, Clone, Default)]
pub struct RecordingTone {
    log: ToneLog,
}

impl RecordingTone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> ToneLog {
        Rc::clone(&self.log)
    }
}

impl ToneParam for RecordingTone {
    fn schedule_value_at(&mut self, value: f64, time: f64) {
        self.log.borrow_mut().push(ToneEvent::Value { value, time });
    }

    fn cancel_from(&mut self, time: f64) {
        self.log.borrow_mut().push(ToneEvent::Cancel { from: time });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_due_order() {
        let mut host = VirtualHost::new(1.0);
        let late = host.set_timeout(500.0);
        let early = host.set_timeout(100.0);
        let cancelled = host.set_timeout(50.0);
        host.clear_timeout(cancelled);

        assert_eq!(host.pop_due(1.05), None);
        assert_eq!(host.pop_due(2.0), Some(early));
        assert!((host.now() - 1.1).abs() < 1e-9);
        assert_eq!(host.pop_due(2.0), Some(late));
        assert_eq!(host.pending(), 0);
    }

    #[test]
    fn test_latency_delays_timers() {
        let mut host = VirtualHost::new(0.0).with_latency(20.0);
        let id = host.set_timeout(10.0);
        assert_eq!(host.pop_due(0.029), None);
        assert_eq!(host.pop_due(0.031), Some(id));
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let mut host = VirtualHost::new(5.0);
        host.advance_to(4.0);
        assert_eq!(host.now(), 5.0);
    }
}
