use super::*;
use crate::config::SamplerConfig;
use crate::error::SamplerError;
use crate::note::Note;
use crate::sample::BeatUnit;
use std::cell::RefCell;
use std::rc::Rc;

struct Rig {
    scheduler: Scheduler<VirtualHost>,
    triggers: TriggerLog,
    tone: ToneLog,
}

fn rig(yaml: &str, start: f64) -> Rig {
    rig_with_host(yaml, VirtualHost::new(start))
}

fn rig_with_host(yaml: &str, host: VirtualHost) -> Rig {
    let config = SamplerConfig::from_yaml(yaml).unwrap();
    let tone = RecordingTone::new();
    let tone_log = tone.log();
    let mut scheduler = Scheduler::new(host, Box::new(tone), config);
    let piano = RecordingInstrument::new();
    let triggers = piano.log();
    scheduler.connect("piano", Box::new(piano)).unwrap();
    Rig { scheduler, triggers, tone: tone_log }
}

fn times(log: &TriggerLog) -> Vec<f64> {
    log.borrow().iter().map(|t| t.at).collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_one_shot_scale_at_sixty_bpm() {
    let mut rig = rig("bpm: 60\nbeat-unit: 1/4\nloop: false\n", 100.0);
    rig.scheduler.play().unwrap();

    let triggers = rig.triggers.borrow().clone();
    assert_eq!(triggers.len(), 8);
    for (i, trigger) in triggers.iter().enumerate() {
        assert_eq!(trigger.at, 100.0 + i as f64);
        assert_eq!(trigger.duration, 1.0);
    }
    assert!(approx(triggers[0].frequency, 261.625565));
    assert!(approx(triggers[7].frequency, 523.251131));

    run_until(&mut rig.scheduler, 108.2).unwrap();
    assert!(rig.scheduler.is_playing());
    run_until(&mut rig.scheduler, 108.25).unwrap();
    assert_eq!(rig.scheduler.state(), PlayState::Stopped);
    assert_eq!(rig.triggers.borrow().len(), 8);

    let tone = rig.tone.borrow();
    assert!(tone.contains(&ToneEvent::Value { value: 0.0, time: 108.0 }));
    assert_eq!(tone.last(), Some(&ToneEvent::Value { value: 0.0, time: 108.25 }));
}

#[test]
fn test_rebuild_every_two_passes() {
    let mut rig = rig("bpm: 60\nrebuild-every: 2\nshuffler: full\nseed: 3\n", 0.0);
    let passes: Rc<RefCell<Vec<(u64, f64)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&passes);
    rig.scheduler.set_on_schedule(move |sample, first| seen.borrow_mut().push((sample.counter(), first)));

    rig.scheduler.play().unwrap();
    run_until(&mut rig.scheduler, 32.0).unwrap();

    let passes = passes.borrow();
    let counters: Vec<u64> = passes.iter().map(|p| p.0).collect();
    let firsts: Vec<f64> = passes.iter().map(|p| p.1).collect();
    assert_eq!(counters, vec![0, 0, 1, 1, 2]);
    assert_eq!(firsts, vec![0.0, 8.0, 16.0, 24.0, 32.0]);
    assert_eq!(rig.scheduler.counter(), 5);
    assert_eq!(rig.triggers.borrow().len(), 40);
}

#[test]
fn test_late_timers_do_not_drift() {
    let host = VirtualHost::new(0.0).with_latency(60.0);
    let mut rig = rig_with_host("bpm: 60\n", host);
    rig.scheduler.play().unwrap();
    run_until(&mut rig.scheduler, 20.0).unwrap();

    let expected: Vec<f64> = (0..24).map(|i| i as f64).collect();
    assert_eq!(times(&rig.triggers), expected);
}

#[test]
fn test_on_schedule_fires_once_per_pass_after_triggers() {
    let mut rig = rig("bpm: 60\nloop: false\n", 4.0);
    let calls: Rc<RefCell<Vec<(f64, usize)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&calls);
    let triggers = Rc::clone(&rig.triggers);
    rig.scheduler
        .set_on_schedule(move |_, first| seen.borrow_mut().push((first, triggers.borrow().len())));

    rig.scheduler.play().unwrap();
    run_until(&mut rig.scheduler, 30.0).unwrap();
    assert_eq!(*calls.borrow(), vec![(4.0, 8)]);
}

#[test]
fn test_late_timer_reports_one_batch() {
    let host = VirtualHost::new(0.0).with_latency(60.0);
    let mut rig = rig_with_host("bpm: 60\nloop: true\n", host);
    let calls: Rc<RefCell<Vec<(f64, usize)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&calls);
    let triggers = Rc::clone(&rig.triggers);
    rig.scheduler
        .set_on_schedule(move |_, first| seen.borrow_mut().push((first, triggers.borrow().len())));

    rig.scheduler.play().unwrap();
    assert_eq!(*calls.borrow(), vec![(0.0, 8)]);

    // Fires at 8.035, late enough to walk the sample twice
    let id = rig.scheduler.host_mut().pop_due(f64::INFINITY).unwrap();
    rig.scheduler.on_timer(id).unwrap();
    assert!(approx(rig.scheduler.host().now(), 8.035));
    assert_eq!(rig.triggers.borrow().len(), 24);
    assert_eq!(*calls.borrow(), vec![(0.0, 8), (8.0, 24)]);
}

#[test]
fn test_structural_change_regenerates_and_restarts() {
    let mut rig = rig("bpm: 60\n", 0.0);
    rig.scheduler.play().unwrap();
    assert_eq!(rig.scheduler.regenerations(), 1);
    run_until(&mut rig.scheduler, 3.0).unwrap();
    assert_eq!(rig.triggers.borrow().len(), 8);

    let change = rig.scheduler.set("tonic", "2").unwrap();
    assert_eq!(change, crate::config::ParamChange::Structural);
    assert_eq!(rig.scheduler.regenerations(), 2);
    assert_eq!(rig.scheduler.tonal().unwrap().tonic(), Note::from_parts(4, 2).unwrap());

    let triggers = rig.triggers.borrow();
    assert_eq!(triggers.len(), 16);
    assert_eq!(triggers[8].at, 3.0);
    assert!(approx(triggers[8].frequency, Note::from_parts(4, 2).unwrap().frequency()));
    assert!(rig.tone.borrow().contains(&ToneEvent::Cancel { from: 3.0 }));
}

#[test]
fn test_bpm_change_only_affects_next_pass() {
    let mut rig = rig("bpm: 60\n", 0.0);
    rig.scheduler.play().unwrap();
    run_until(&mut rig.scheduler, 1.0).unwrap();
    rig.scheduler.set("bpm", "120").unwrap();
    assert_eq!(rig.scheduler.regenerations(), 1);

    run_until(&mut rig.scheduler, 11.9).unwrap();
    let at = times(&rig.triggers);
    assert_eq!(at.len(), 16);
    assert_eq!(at[7], 7.0);
    assert_eq!(at[8], 8.0);
    assert_eq!(at[9], 8.5);
    assert_eq!(at[15], 11.5);
}

#[test]
fn test_beat_unit_change_rebuilds_next_pass() {
    let mut rig = rig("bpm: 60\n", 0.0);
    rig.scheduler.play().unwrap();
    rig.scheduler.set("beat-unit", "1/8").unwrap();
    run_until(&mut rig.scheduler, 9.0).unwrap();

    let at = times(&rig.triggers);
    assert_eq!(at[8], 8.0);
    assert_eq!(at[9], 8.5);
    assert_eq!(rig.scheduler.sample().unwrap().beat_unit(), BeatUnit::Eighth);
    assert_eq!(rig.scheduler.regenerations(), 1);
}

#[test]
fn test_shuffler_change_resets_counter() {
    let mut rig = rig("bpm: 60\n", 0.0);
    let counters: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&counters);
    rig.scheduler.set_on_schedule(move |sample, _| seen.borrow_mut().push(sample.counter()));

    rig.scheduler.play().unwrap();
    run_until(&mut rig.scheduler, 10.0).unwrap();
    assert_eq!(rig.scheduler.counter(), 2);

    rig.scheduler.set("shuffler", "full").unwrap();
    assert_eq!(rig.scheduler.counter(), 0);
    run_until(&mut rig.scheduler, 16.0).unwrap();
    assert_eq!(*counters.borrow(), vec![0, 0, 1]);
}

#[test]
fn test_invalid_change_keeps_previous_state() {
    let mut rig = rig("bpm: 60\n", 0.0);
    rig.scheduler.play().unwrap();

    let err = rig.scheduler.set("octave-span", "9").unwrap_err();
    assert!(matches!(err, SamplerError::InvalidArgument(_)));
    assert!(rig.scheduler.set("bpm", "500").is_err());
    assert!(rig.scheduler.set("tonality", "nonsense").is_err());

    assert_eq!(rig.scheduler.config().octave_span(), 1);
    assert_eq!(rig.scheduler.config().bpm(), 60.0);
    assert_eq!(rig.scheduler.regenerations(), 1);
    assert!(rig.scheduler.is_playing());

    run_until(&mut rig.scheduler, 8.0).unwrap();
    assert_eq!(rig.triggers.borrow().len(), 16);
}

#[test]
fn test_play_with_invalid_config_stays_stopped() {
    let mut rig = rig("octave: 8\noctave-span: 2\n", 0.0);
    let err = rig.scheduler.play().unwrap_err();
    assert!(matches!(err, SamplerError::InvalidArgument(_)));
    assert_eq!(rig.scheduler.state(), PlayState::Stopped);
    assert!(rig.scheduler.tonal().is_none());
    assert_eq!(rig.scheduler.host().pending(), 0);
    assert!(rig.triggers.borrow().is_empty());
    assert!(rig.tone.borrow().is_empty());
}

#[test]
fn test_instrument_wiring_errors() {
    let mut rig = rig("bpm: 60\nloop: false\n", 0.0);
    let duplicate = rig.scheduler.connect("piano", Box::new(RecordingInstrument::new()));
    assert!(matches!(duplicate, Err(SamplerError::UnsupportedOperation(_))));
    let unknown = rig.scheduler.disconnect("organ");
    assert!(matches!(unknown, Err(SamplerError::UnsupportedOperation(_))));

    rig.scheduler.disconnect("piano").unwrap();
    rig.scheduler.play().unwrap();
    assert!(rig.triggers.borrow().is_empty());
    // the tone still follows the melody
    let values = rig.tone.borrow().iter().filter(|e| matches!(e, ToneEvent::Value { .. })).count();
    assert_eq!(values, 9);
}

#[test]
fn test_several_instruments_receive_the_same_triggers() {
    let mut rig = rig("bpm: 60\nloop: false\nvelociter: metric\n", 0.0);
    let strings = RecordingInstrument::new();
    let strings_log = strings.log();
    rig.scheduler.connect("strings", Box::new(strings)).unwrap();
    rig.scheduler.play().unwrap();

    assert_eq!(*rig.triggers.borrow(), *strings_log.borrow());
    let velocities: Vec<f64> = strings_log.borrow().iter().map(|t| t.velocity).collect();
    assert_eq!(velocities, vec![1.0, 0.6, 0.85, 0.7, 1.0, 0.75, 0.85, 0.7]);
}

#[test]
fn test_stale_timer_is_ignored() {
    let mut rig = rig("bpm: 60\n", 0.0);
    rig.scheduler.play().unwrap();
    rig.scheduler.play().unwrap();
    assert_eq!(rig.triggers.borrow().len(), 16);

    // the first play's pass timer was cancelled by the second
    rig.scheduler.on_timer(TimerId(0)).unwrap();
    assert_eq!(rig.triggers.borrow().len(), 16);
    assert_eq!(rig.scheduler.host().pending(), 1);
}

#[test]
fn test_stop_silences_and_cancels() {
    let mut rig = rig("bpm: 60\n", 0.0);
    rig.scheduler.play().unwrap();
    run_until(&mut rig.scheduler, 2.0).unwrap();
    rig.scheduler.stop();

    assert_eq!(rig.scheduler.state(), PlayState::Stopped);
    assert_eq!(rig.scheduler.host().pending(), 0);
    assert_eq!(rig.tone.borrow().last(), Some(&ToneEvent::Value { value: 0.0, time: 2.0 }));

    let events = rig.tone.borrow().len();
    rig.scheduler.stop();
    assert_eq!(rig.tone.borrow().len(), events);

    run_until(&mut rig.scheduler, 30.0).unwrap();
    assert_eq!(rig.triggers.borrow().len(), 8);
}

#[test]
fn test_loop_toggle_while_playing() {
    let mut once = rig("bpm: 60\nloop: false\n", 0.0);
    once.scheduler.play().unwrap();
    once.scheduler.set("loop", "true").unwrap();
    run_until(&mut once.scheduler, 20.0).unwrap();
    assert!(once.scheduler.is_playing());
    assert_eq!(times(&once.triggers)[8], 8.0);
    assert!(once.tone.borrow().contains(&ToneEvent::Cancel { from: 8.0 }));

    let mut looping = rig("bpm: 60\n", 0.0);
    looping.scheduler.play().unwrap();
    looping.scheduler.set("loop", "false").unwrap();
    run_until(&mut looping.scheduler, 8.25).unwrap();
    assert_eq!(looping.scheduler.state(), PlayState::Stopped);
    assert_eq!(looping.triggers.borrow().len(), 8);
}

#[test]
fn test_rests_and_holds_drive_the_tone_only() {
    for seed in 0..16 {
        let yaml = format!("bpm: 60\nloop: false\nshuffler: sprinkle\nseed: {}\n", seed);
        let mut rig = rig(&yaml, 0.0);
        rig.scheduler.play().unwrap();

        let sample = rig.scheduler.sample().unwrap();
        assert_eq!(rig.triggers.borrow().len(), sample.note_count());
        let values = rig.tone.borrow().iter().filter(|e| matches!(e, ToneEvent::Value { .. })).count();
        assert_eq!(values, sample.len() + 1);
        assert_eq!(rig.scheduler.next_time(), sample.duration_seconds(60.0));
    }
}
