//! Offline replay demonstration: feeds a synthetic spoofed fix stream
//! through the detection engine and prints every event it emits.
//!
//! Select the platform profile with the first argument
//! (static, pedestrian, vehicular, airborne):
//!
//! cargo run --example replay -- vehicular

use std::process::ExitCode;
use std::str::FromStr;

use gnss_guard::prelude::{
    Config, Duration, Engine, EngineEvent, Epoch, Fix, Profile, Vector3,
};

/// 60 s of nominal 5 m/s motion, then a 800 m position pull-off.
fn synthetic_stream() -> Vec<Fix> {
    let t0 = Epoch::from_gpst_seconds(0.0);
    let velocity = Vector3::new(5.0, 0.0, 0.0);

    let mut fixes = Vec::with_capacity(90);
    let mut position = Vector3::<f64>::zeros();

    for k in 0..90 {
        if k == 60 {
            position += Vector3::new(800.0, 0.0, 0.0);
        }

        let epoch = t0 + Duration::from_seconds(k as f64);
        fixes.push(
            Fix::new(epoch, position, velocity).with_clock_state(1.0E-9 * k as f64, 1.0E-9),
        );

        position += velocity;
    }

    fixes
}

fn main() -> ExitCode {
    env_logger::init();

    let profile = match std::env::args().nth(1) {
        Some(arg) => match Profile::from_str(&arg) {
            Ok(profile) => profile,
            Err(error) => {
                eprintln!("{}", error);
                return ExitCode::FAILURE;
            },
        },
        None => Profile::Vehicular,
    };

    let replay = match Engine::replay(Config::preset(profile), synthetic_stream()) {
        Ok(replay) => replay,
        Err(error) => {
            eprintln!("invalid configuration: {}", error);
            return ExitCode::FAILURE;
        },
    };

    for event in &replay.events {
        match event {
            EngineEvent::Alert(alert) => {
                println!(
                    "{} alert: {} -> {} (confidence {:.3}, {})",
                    alert.epoch,
                    alert.previous,
                    alert.new,
                    alert.verdict.confidence,
                    alert.verdict.classification,
                );
            },
            EngineEvent::Gap(quiet) => {
                println!("data gap: stream quiet for {}", quiet);
            },
        }
    }

    println!(
        "{} fixes accepted, {} rejected, final state: {}",
        replay.accepted, replay.rejected, replay.final_state
    );

    ExitCode::SUCCESS
}
