//! Integration tests for the sampler
//!
//! Tests the full pipeline from YAML configuration to recorded triggers.

use tonal_sampler::playback::{run_until, RecordingInstrument, RecordingTone, Scheduler, ToneEvent, VirtualHost};
use tonal_sampler::{render_once, KeySignature, SamplerConfig, SamplerError, Tonality};

const DORIAN: &str = include_str!("../demos/dorian_eighths.yaml");

#[test]
fn test_render_c_major_once() {
    let config = SamplerConfig::from_yaml("bpm: 60\n").unwrap();
    let rendering = render_once(&config).unwrap();

    assert_eq!(rendering.key_signature.label, "C");
    assert_eq!(rendering.scale, vec!["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"]);
    assert_eq!(rendering.events.len(), 8);
    assert_eq!(rendering.events[0].note, "C4");
    assert_eq!(rendering.events[7].trigger.at, 7.0);
    assert_eq!(rendering.stopped_at, 8.25);
}

#[test]
fn test_render_spells_in_key() {
    let config = SamplerConfig::from_yaml("tonic: 6\ntonality: major\n").unwrap();
    let rendering = render_once(&config).unwrap();
    assert_eq!(rendering.key_signature.label, "F♯");
    assert_eq!(rendering.scale, vec!["F♯4", "G♯4", "A♯4", "B4", "C♯5", "D♯5", "E♯5", "F♯5"]);

    let flats = SamplerConfig::from_yaml("tonic: F\ntonality: minor\n").unwrap();
    let rendering = render_once(&flats).unwrap();
    assert_eq!(rendering.key_signature.label, "Fm");
    assert_eq!(rendering.scale[..4], ["F4", "G4", "A♭4", "B♭4"]);
}

#[test]
fn test_render_json_shape() {
    let config = SamplerConfig::from_yaml("bpm: 120\nvelociter: metric\n").unwrap();
    let rendering = render_once(&config).unwrap();
    let json = serde_json::to_value(&rendering).unwrap();

    assert_eq!(json["keySignature"]["label"], "C");
    assert_eq!(json["keySignature"]["accidentalCount"], 0);
    assert_eq!(json["events"][0]["note"], "C4");
    assert_eq!(json["events"][0]["velocity"], 1.0);
    assert_eq!(json["events"][1]["at"], 0.5);
    assert_eq!(json["events"][0]["articulation"], "unset");
}

#[test]
fn test_demo_config_loops_with_rebuilds() {
    let config = SamplerConfig::from_yaml(DORIAN).unwrap();
    assert_eq!(config.tonality(), Tonality::Dorian);
    assert_eq!(KeySignature::lookup(config.tonality(), config.tonic()).label, "Am");

    let tone = RecordingTone::new();
    let tone_log = tone.log();
    let mut scheduler = Scheduler::new(VirtualHost::new(0.0), Box::new(tone), config);
    let synth = RecordingInstrument::new();
    let triggers = synth.log();
    scheduler.connect("synth", Box::new(synth)).unwrap();

    let counters = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let seen = std::rc::Rc::clone(&counters);
    scheduler.set_on_schedule(move |sample, first| seen.borrow_mut().push((sample.counter(), first)));

    scheduler.play().unwrap();
    // 15 eighths at 90 bpm = 5 seconds per pass
    run_until(&mut scheduler, 19.9).unwrap();

    let passes = counters.borrow().clone();
    assert_eq!(passes.len(), 4);
    assert_eq!(passes.iter().map(|p| p.0).collect::<Vec<_>>(), vec![0, 0, 1, 1]);
    for (i, (_, first)) in passes.iter().enumerate() {
        assert!((first - 5.0 * i as f64).abs() < 1e-9);
    }

    // The tonic always opens a pass
    let d4 = tonal_sampler::Note::from_parts(4, 2).unwrap().frequency();
    for (_, first) in passes.iter() {
        let opener = triggers.borrow().iter().find(|t| (t.at - first).abs() < 1e-9).copied().unwrap();
        assert!((opener.frequency - d4).abs() < 1e-9);
    }

    // Triggers never overlap and never leave gaps inside a pass
    let triggers = triggers.borrow();
    for pair in triggers.windows(2) {
        assert!(pair[1].at > pair[0].at);
        assert!((pair[1].at - (pair[0].at + pair[0].duration)).abs() < 1e-9);
    }
    assert!(tone_log.borrow().iter().all(|e| match e {
        ToneEvent::Value { value, .. } => *value >= 0.0,
        ToneEvent::Cancel { .. } => true,
    }));
}

#[test]
fn test_live_reconfiguration() {
    let config = SamplerConfig::from_yaml("bpm: 60\n").unwrap();
    let mut scheduler = Scheduler::new(VirtualHost::new(0.0), Box::new(RecordingTone::new()), config);
    let synth = RecordingInstrument::new();
    let triggers = synth.log();
    scheduler.connect("synth", Box::new(synth)).unwrap();

    scheduler.play().unwrap();
    scheduler.update(|config| Ok(config.set_tonality(Tonality::Blues))).unwrap();
    assert_eq!(scheduler.regenerations(), 2);
    assert_eq!(triggers.borrow().len(), 8 + 7);

    let result = scheduler.set("octave", "12");
    assert!(matches!(result, Err(SamplerError::InvalidArgument(_))));
    assert_eq!(scheduler.config().octave(), 4);

    scheduler.stop();
    assert!(!scheduler.is_playing());
    scheduler.play().unwrap();
    assert_eq!(scheduler.regenerations(), 2);
}

#[test]
fn test_bad_yaml_is_a_config_error() {
    let result = SamplerConfig::from_yaml("tonic: [C, D]\n");
    assert!(matches!(result, Err(SamplerError::ConfigError(_))));
    let result = render_once(&SamplerConfig::from_yaml("octave: 8\noctave-span: 3\n").unwrap());
    assert!(matches!(result, Err(SamplerError::InvalidArgument(_))));
}
