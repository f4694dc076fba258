use std::env;
use std::fs;
use std::process;

use tonal_sampler::{render_once, Articulation, SamplerConfig};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: sampler <config.yaml>");
        eprintln!("       sampler --json <config.yaml>");
        process::exit(1);
    }

    let mut json = false;
    let mut input_path = &args[1];

    // Parse flags
    if args[1] == "--json" {
        json = true;
        if args.len() < 3 {
            eprintln!("Usage: sampler --json <config.yaml>");
            process::exit(1);
        }
        input_path = &args[2];
    }

    let source = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let config = match SamplerConfig::from_yaml(&source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let rendering = match render_once(&config) {
        Ok(rendering) => rendering,
        Err(e) => {
            eprintln!("Playback error: {}", e);
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&rendering) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing playback: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let key = rendering.key_signature;
    println!("Key: {} ({} {})", key.label, key.accidental_count, if key.is_flat { "flats" } else { "sharps" });
    println!("Scale: {}", rendering.scale.join(" "));
    println!();
    for event in &rendering.events {
        let t = &event.trigger;
        println!(
            "{:>8.3}s  {:<4} {:>8.2} Hz  {:.3}s  vel {:.2}{}",
            t.at,
            event.note,
            t.frequency,
            t.duration,
            t.velocity,
            if event.articulation == Articulation::Open { "  (open)" } else { "" }
        );
    }
    println!("stopped at {:.3}s", rendering.stopped_at);
}
