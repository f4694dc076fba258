pub mod config;
pub mod error;
pub mod key_signature;
pub mod note;
pub mod playback;
pub mod sample;
pub mod scale;
pub mod tonality;
pub mod transform;

pub use config::{ParamChange, SamplerConfig};
pub use error::*;
pub use key_signature::KeySignature;
pub use note::{Accidental, Articulation, Letter, Note, SampleNote, Spelling, TonalNote};
pub use playback::{PlayState, Scheduler, Trigger};
pub use sample::{BeatUnit, Entry, Sample, TimeSignature, TonalSample};
pub use scale::{generate, GenerateOptions};
pub use tonality::{Direction, Tonality};

use playback::{Host, RecordingInstrument, RecordingTone, VirtualHost};
use serde::Serialize;

/// A trigger paired with the spelled note that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedEvent {
    pub note: String,
    pub articulation: Articulation,
    #[serde(flatten)]
    pub trigger: Trigger,
}

/// One offline pass over a configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendering {
    pub key_signature: &'static KeySignature,
    /// Generated scale, spelled in its key.
    pub scale: Vec<String>,
    pub events: Vec<RenderedEvent>,
    /// Host time at which playback stopped.
    pub stopped_at: f64,
}

/// Play `config` once, without looping, on a virtual clock starting at 0.
/// This is the main entry point for offline use.
pub fn render_once(config: &SamplerConfig) -> Result<Rendering, SamplerError> {
    let mut config = config.clone();
    config.set_loop(false);
    let key_signature = KeySignature::resolve(config.tonality(), config.tonic())?;

    let mut scheduler = Scheduler::new(VirtualHost::new(0.0), Box::new(RecordingTone::new()), config);
    let recorder = RecordingInstrument::new();
    let triggers = recorder.log();
    scheduler.connect("recorder", Box::new(recorder))?;
    scheduler.play()?;

    let scale = scheduler
        .tonal()
        .map(|tonal| tonal.notes().iter().map(|n| n.spelling().to_string()).collect())
        .unwrap_or_default();
    let spelled: Vec<(String, Articulation)> = scheduler
        .sample()
        .map(|sample| {
            sample
                .entries()
                .iter()
                .filter_map(Entry::as_note)
                .map(|n| (n.spelling().to_string(), n.articulation))
                .collect()
        })
        .unwrap_or_default();

    // Only the stop timer is pending after a one-shot pass.
    while let Some(id) = scheduler.host_mut().pop_due(f64::INFINITY) {
        scheduler.on_timer(id)?;
    }
    let stopped_at = scheduler.host().now();

    let events = spelled
        .into_iter()
        .zip(triggers.borrow().iter().copied())
        .map(|((note, articulation), trigger)| RenderedEvent { note, articulation, trigger })
        .collect();

    Ok(Rendering { key_signature, scale, events, stopped_at })
}
