//! Lookahead scheduling engine.
//!
//! The scheduler owns the live [`Sample`] and walks it pass after pass,
//! turning note-relative lengths into absolute host times. Each pass is
//! queued ahead of real time and timestamps come from `next_time`, never
//! from when the timer actually fired, so host jitter does not accumulate.

use super::types::{Host, Instrument, PlayState, TimerId, ToneParam, LOOKAHEAD_MS};
use crate::config::{ParamChange, SamplerConfig};
use crate::error::SamplerError;
use crate::sample::{Entry, Sample, TonalSample};
use crate::transform::Pipeline;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Stop timers fire this many lookahead margins after the last note ends.
const STOP_MARGIN: f64 = 10.0;

type ScheduleCallback = Box<dyn FnMut(&Sample, f64)>;

pub struct Scheduler<H: Host> {
    host: H,
    tone: Box<dyn ToneParam>,
    instruments: Vec<(String, Box<dyn Instrument>)>,
    on_schedule: Option<ScheduleCallback>,

    config: SamplerConfig,
    pipeline: Pipeline,
    rng: Pcg32,

    tonal: Option<TonalSample>,
    sample: Option<Sample>,
    /// Sample no longer matches the beat unit or time signature.
    stale: bool,

    state: PlayState,
    /// Passes since the last play or shuffler change.
    counter: u64,
    /// Pass counter the current sample was built for.
    built_for: Option<u64>,
    next_time: f64,
    last_frequency: f64,
    pass_timer: Option<TimerId>,
    stop_timer: Option<TimerId>,
    regenerations: u64,
}

impl<H: Host> Scheduler<H> {
    pub fn new(host: H, tone: Box<dyn ToneParam>, config: SamplerConfig) -> Self {
        Self {
            host,
            tone,
            instruments: Vec::new(),
            on_schedule: None,
            pipeline: config.pipeline(),
            rng: Pcg32::seed_from_u64(config.seed()),
            config,
            tonal: None,
            sample: None,
            stale: false,
            state: PlayState::Stopped,
            counter: 0,
            built_for: None,
            next_time: 0.0,
            last_frequency: 0.0,
            pass_timer: None,
            stop_timer: None,
            regenerations: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn tonal(&self) -> Option<&TonalSample> {
        self.tonal.as_ref()
    }

    pub fn sample(&self) -> Option<&Sample> {
        self.sample.as_ref()
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Time of the next unscheduled note.
    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    /// How many times the scale generator has run.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// Called once per pass, after its triggers, with the pass's first time.
    pub fn set_on_schedule<F>(&mut self, callback: F)
    where
        F: FnMut(&Sample, f64) + 'static,
    {
        self.on_schedule = Some(Box::new(callback));
    }

    /// Attach a named instrument sink.
    ///
    /// # Errors
    /// `UnsupportedOperation` if the name is already connected.
    pub fn connect(&mut self, name: &str, instrument: Box<dyn Instrument>) -> Result<(), SamplerError> {
        if self.instruments.iter().any(|(existing, _)| existing == name) {
            return Err(SamplerError::UnsupportedOperation(format!(
                "instrument '{}' is already connected",
                name
            )));
        }
        self.instruments.push((name.to_string(), instrument));
        Ok(())
    }

    /// Detach a named instrument sink and hand it back.
    ///
    /// # Errors
    /// `UnsupportedOperation` if nothing is connected under that name.
    pub fn disconnect(&mut self, name: &str) -> Result<Box<dyn Instrument>, SamplerError> {
        let position = self
            .instruments
            .iter()
            .position(|(existing, _)| existing == name)
            .ok_or_else(|| {
                SamplerError::UnsupportedOperation(format!("instrument '{}' is not connected", name))
            })?;
        Ok(self.instruments.remove(position).1)
    }

    /// Start (or restart) playback from now.
    ///
    /// The scale is generated first; if that fails nothing else changes.
    pub fn play(&mut self) -> Result<(), SamplerError> {
        if self.tonal.is_none() {
            self.regenerate(None)?;
        }
        self.cancel_timers();
        self.state = PlayState::Playing;
        log::info!(
            "playing {} {} at {} bpm",
            self.config.tonality(),
            self.config.tonic(),
            self.config.bpm()
        );
        self.restart()
    }

    /// Silence the tone and cancel everything pending. No-op when stopped.
    pub fn stop(&mut self) {
        if self.state == PlayState::Stopped {
            return;
        }
        self.cancel_timers();
        let now = self.host.now();
        self.tone.cancel_from(now);
        self.tone.schedule_value_at(0.0, now);
        self.next_time = 0.0;
        self.last_frequency = 0.0;
        self.state = PlayState::Stopped;
        log::info!("stopped at {:.3}s", now);
    }

    /// Host entry point for fired timers. Ids this scheduler no longer
    /// tracks are ignored.
    pub fn on_timer(&mut self, id: TimerId) -> Result<(), SamplerError> {
        if self.pass_timer == Some(id) {
            self.pass_timer = None;
            self.run_pass()
        } else if self.stop_timer == Some(id) {
            self.stop_timer = None;
            self.stop();
            Ok(())
        } else {
            log::debug!("ignoring stale timer {:?}", id);
            Ok(())
        }
    }

    /// Apply one key/value configuration change.
    ///
    /// Structural changes regenerate the scale before anything is
    /// committed, and restart playback from now when playing. On error the
    /// configuration and playback are left as they were.
    pub fn set(&mut self, key: &str, value: &str) -> Result<ParamChange, SamplerError> {
        self.update(|config| config.apply(key, value))
    }

    /// Apply a change through one of the typed setters.
    ///
    /// ```rust
    /// use tonal_sampler::playback::{RecordingTone, Scheduler, VirtualHost};
    /// use tonal_sampler::SamplerConfig;
    ///
    /// let mut scheduler = Scheduler::new(VirtualHost::new(0.0), Box::new(RecordingTone::new()), SamplerConfig::default());
    /// scheduler.update(|config| config.set_bpm(90.0))?;
    /// assert_eq!(scheduler.config().bpm(), 90.0);
    /// # Ok::<(), tonal_sampler::SamplerError>(())
    /// ```
    pub fn update<F>(&mut self, change: F) -> Result<ParamChange, SamplerError>
    where
        F: FnOnce(&mut SamplerConfig) -> Result<ParamChange, SamplerError>,
    {
        let mut candidate = self.config.clone();
        let kind = change(&mut candidate)?;
        match kind {
            ParamChange::Structural => {
                self.regenerate(Some(candidate))?;
                if self.is_playing() {
                    self.cancel_timers();
                    self.restart()?;
                }
            }
            ParamChange::Cosmetic { reset_counter } => self.apply_cosmetic(candidate, reset_counter)?,
        }
        Ok(kind)
    }

    fn apply_cosmetic(&mut self, candidate: SamplerConfig, reset_counter: bool) -> Result<(), SamplerError> {
        let previous = std::mem::replace(&mut self.config, candidate);
        self.pipeline = self.config.pipeline();

        if previous.seed() != self.config.seed() {
            self.rng = Pcg32::seed_from_u64(self.config.seed());
        }
        if previous.beat_unit() != self.config.beat_unit()
            || previous.time_signature() != self.config.time_signature()
        {
            self.stale = true;
        }
        if reset_counter {
            self.counter = 0;
            self.built_for = None;
        }

        if !self.is_playing() {
            return Ok(());
        }
        match (previous.looping(), self.config.looping()) {
            (false, true) => {
                if let Some(id) = self.stop_timer.take() {
                    self.host.clear_timeout(id);
                    self.tone.cancel_from(self.next_time);
                    self.arm_pass();
                }
            }
            (true, false) => {
                if let Some(id) = self.pass_timer.take() {
                    self.host.clear_timeout(id);
                    self.finish();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Generate the scale for `candidate` (or the current configuration)
    /// and commit both only on success.
    fn regenerate(&mut self, candidate: Option<SamplerConfig>) -> Result<(), SamplerError> {
        let tonal = match &candidate {
            Some(config) => config.generate()?,
            None => self.config.generate()?,
        };
        if let Some(config) = candidate {
            if config.seed() != self.config.seed() {
                self.rng = Pcg32::seed_from_u64(config.seed());
            }
            self.pipeline = config.pipeline();
            self.config = config;
        }
        log::debug!("regenerated scale: {} notes", tonal.len());
        self.tonal = Some(tonal);
        self.stale = true;
        self.regenerations += 1;
        Ok(())
    }

    /// Reset pass state and run a pass starting now.
    fn restart(&mut self) -> Result<(), SamplerError> {
        let now = self.host.now();
        self.tone.cancel_from(now);
        self.counter = 0;
        self.built_for = None;
        self.next_time = now;
        self.run_pass()
    }

    fn cancel_timers(&mut self) {
        if let Some(id) = self.pass_timer.take() {
            self.host.clear_timeout(id);
        }
        if let Some(id) = self.stop_timer.take() {
            self.host.clear_timeout(id);
        }
    }

    /// A failed pass leaves the instance stopped with no timers armed.
    fn run_pass(&mut self) -> Result<(), SamplerError> {
        match self.schedule_pass() {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("scheduling pass failed, stopping: {}", e);
                self.cancel_timers();
                self.state = PlayState::Stopped;
                Err(e)
            }
        }
    }

    fn rebuild_due(&self) -> bool {
        if self.sample.is_none() || self.stale {
            return true;
        }
        let every = self.config.rebuild_every() as u64;
        let on_cadence = self.counter == 0 || (every > 0 && self.counter % every == 0);
        on_cadence && self.built_for != Some(self.counter)
    }

    fn rebuild(&mut self) -> Result<(), SamplerError> {
        let tonal = self.tonal.as_ref().ok_or_else(|| {
            SamplerError::SchedulingInvariantViolation("rebuild requested without a generated scale".to_string())
        })?;
        let mut sample = Sample::build(
            tonal,
            self.config.beat_unit(),
            self.config.time_signature(),
            self.sample.take(),
        );
        self.pipeline.apply(&mut sample, &mut self.rng);
        log::debug!(
            "rebuilt sample #{} on pass {} ({} entries, {})",
            sample.counter(),
            self.counter,
            sample.len(),
            sample.time_signature()
        );
        self.sample = Some(sample);
        self.built_for = Some(self.counter);
        self.stale = false;
        Ok(())
    }

    fn sample_seconds(&self) -> Result<f64, SamplerError> {
        let sample = self.sample.as_ref().ok_or_else(|| {
            SamplerError::SchedulingInvariantViolation("no sample after rebuild".to_string())
        })?;
        let seconds = sample.duration_seconds(self.config.bpm());
        if !(seconds > 0.0) {
            return Err(SamplerError::SchedulingInvariantViolation(format!(
                "sample #{} has no playable length",
                sample.counter()
            )));
        }
        Ok(seconds)
    }

    fn schedule_pass(&mut self) -> Result<(), SamplerError> {
        if self.state != PlayState::Playing {
            return Ok(());
        }
        let now = self.host.now();
        if self.sample.is_none() {
            self.rebuild()?;
        }

        // A late timer can walk the sample more than once; the hook still
        // sees one batch, stamped with its first time.
        let mut first = None;
        while now + self.sample_seconds()? > self.next_time {
            if self.rebuild_due() {
                self.rebuild()?;
            }
            let start = self.emit()?;
            first.get_or_insert(start);
            self.counter += 1;
            if !self.config.looping() {
                break;
            }
        }
        if let (Some(first), Some(callback), Some(sample)) =
            (first, self.on_schedule.as_mut(), self.sample.as_ref())
        {
            callback(sample, first);
        }

        if self.config.looping() {
            self.arm_pass();
        } else {
            self.finish();
        }
        Ok(())
    }

    /// Emit every entry of the current sample from `next_time` on. Returns
    /// the time of the first entry.
    fn emit(&mut self) -> Result<f64, SamplerError> {
        let sample = self.sample.as_ref().ok_or_else(|| {
            SamplerError::SchedulingInvariantViolation("no sample to emit".to_string())
        })?;
        let note_seconds = sample.beat_unit().seconds_at(self.config.bpm());
        let first = self.next_time;

        for entry in sample.entries() {
            let duration = note_seconds * entry.length_factor();
            let at = self.next_time;
            match entry {
                Entry::Note(note) => {
                    let frequency = note.frequency();
                    self.tone.schedule_value_at(frequency, at);
                    for (_, instrument) in self.instruments.iter_mut() {
                        instrument.trigger(frequency, duration, at, note.velocity);
                    }
                    self.last_frequency = frequency;
                    log::trace!("{} at {:.3}s for {:.3}s", note.spelling(), at, duration);
                }
                Entry::Hold => self.tone.schedule_value_at(self.last_frequency, at),
                Entry::Rest => self.tone.schedule_value_at(0.0, at),
            }
            self.next_time += duration;
        }
        Ok(first)
    }

    /// Queue the next pass one lookahead margin before it is due.
    fn arm_pass(&mut self) {
        let now = self.host.now();
        let delay_ms = ((self.next_time - now) * 1000.0 - LOOKAHEAD_MS).max(0.0);
        self.pass_timer = Some(self.host.set_timeout(delay_ms));
    }

    /// Silence the tone after the last note and queue the final stop.
    fn finish(&mut self) {
        let now = self.host.now();
        self.tone.schedule_value_at(0.0, self.next_time);
        let delay_ms = ((self.next_time - now) * 1000.0).max(0.0) + STOP_MARGIN * LOOKAHEAD_MS;
        self.stop_timer = Some(self.host.set_timeout(delay_ms));
    }
}
