//! # Playback Module
//!
//! Lookahead scheduling of samples onto an external renderer.
//!
//! ## Purpose
//! The scheduler repeatedly walks the live sample and hands every note to
//! the renderer ahead of time:
//! 1. **Tone timeline** - one continuous tone parameter follows the melody
//!    (note → frequency, hold → previous frequency, rest → 0)
//! 2. **Instrument triggers** - every connected instrument receives
//!    `(frequency, duration, at, velocity)` for each pitched note
//! 3. **Schedule callback** - an observer is told once per pass which sample
//!    was queued and when it starts
//!
//! ## Sub-modules
//! - `types` - Host, ToneParam and Instrument traits, Trigger, PlayState
//! - `engine` - the [`Scheduler`] state machine
//! - `host` - [`VirtualHost`] and recording sinks for tests and offline runs
//!
//! ## States
//!
//! ```text
//!            play()                     stop() / stop timer
//! Stopped ───────────▶ Playing ──────────────────────────▶ Stopped
//!                      │    ▲
//!                      └────┘ pass timer, structural change, play()
//! ```
//!
//! ## Pass Algorithm
//!
//! `next_time` is the time of the next unscheduled note. A pass runs while
//! `now + sample_seconds > next_time`:
//! - rebuild the sample if due (pass counter 0, or every `rebuild-every` passes)
//! - emit every entry, advancing `next_time` by its length
//! - notify the schedule callback with the pass's first time
//! - increment the pass counter; stop after one pass unless looping
//!
//! Afterwards a looping scheduler re-arms itself [`LOOKAHEAD_MS`] before
//! `next_time`; otherwise it silences the tone at `next_time` and arms a stop
//! ten lookahead margins later.
//!
//! ## Example
//! ```rust
//! use tonal_sampler::playback::{run_until, RecordingInstrument, RecordingTone, Scheduler, VirtualHost};
//! use tonal_sampler::SamplerConfig;
//!
//! let config = SamplerConfig::from_yaml("bpm: 60\nloop: false\n")?;
//! let mut scheduler = Scheduler::new(VirtualHost::new(0.0), Box::new(RecordingTone::new()), config);
//! let piano = RecordingInstrument::new();
//! let triggers = piano.log();
//! scheduler.connect("piano", Box::new(piano))?;
//!
//! scheduler.play()?;
//! run_until(&mut scheduler, 10.0)?;
//!
//! let times: Vec<f64> = triggers.borrow().iter().map(|t| t.at).collect();
//! assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
//! assert!(!scheduler.is_playing());
//! # Ok::<(), tonal_sampler::SamplerError>(())
//! ```

mod engine;
mod host;
mod types;

#[cfg(test)]
mod tests;

pub use engine::Scheduler;
pub use host::{run_until, RecordingInstrument, RecordingTone, ToneLog, TriggerLog, VirtualHost};
pub use types::{Host, Instrument, PlayState, TimerId, ToneEvent, ToneParam, Trigger, LOOKAHEAD_MS};
