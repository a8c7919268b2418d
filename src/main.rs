use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use synthseq::audio::midi_to_freq;
use synthseq::{
    EngineConfig, EngineUpdate, Error, EventRecord, Sequencer, Synth, register_synth, spawn_engine,
};
use tracing_subscriber::EnvFilter;

/// Stands in for a real renderer: logs every voice operation.
struct LoggingSynth;

impl Synth for LoggingSynth {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        tracing::info!(channel, key, velocity, freq = midi_to_freq(key), "note on");
    }
    fn note_off(&mut self, channel: u8, key: u8) {
        tracing::info!(channel, key, "note off");
    }
    fn control_change(&mut self, channel: u8, control: u8, value: u8) {
        tracing::info!(channel, control, value, "control change");
    }
    fn program_change(&mut self, channel: u8, program: u8) {
        tracing::info!(channel, program, "program change");
    }
    fn bank_select(&mut self, channel: u8, bank: u16) {
        tracing::info!(channel, bank, "bank select");
    }
    fn pitch_bend(&mut self, channel: u8, value: u16) {
        tracing::info!(channel, value, "pitch bend");
    }
    fn pitch_wheel_sensitivity(&mut self, channel: u8, semitones: u8) {
        tracing::info!(channel, semitones, "pitch wheel sensitivity");
    }
    fn system_reset(&mut self) {
        tracing::info!("system reset");
    }
    fn all_notes_off(&mut self, channel: u8) {
        tracing::info!(channel, "all notes off");
    }
    fn all_sounds_off(&mut self, channel: u8) {
        tracing::info!(channel, "all sounds off");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run() {
        tracing::error!(%err, "synthseq failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };

    let sequencer = Arc::new(Sequencer::with_config(config.sequencer())?);
    let synth = register_synth(&sequencer, Arc::new(Mutex::new(LoggingSynth)));
    let keyboard = sequencer.register_source("keyboard");
    let arpeggiator = sequencer.register_source("arpeggiator");

    let (engine, mut producer) = spawn_engine(&config, Arc::clone(&sequencer))?;

    let updates = engine.update_rx.clone();
    std::thread::spawn(move || {
        for update in updates.iter() {
            match update {
                EngineUpdate::Error { message } => tracing::warn!(message, "engine error"),
                other => tracing::debug!(?other, "engine update"),
            }
        }
    });

    let live = std::thread::spawn(move || {
        for key in [60u8, 64, 67, 72] {
            let on = EventRecord::note_on(0, key, 100).with_source(keyboard).with_dest(synth);
            let off = EventRecord::note_off(0, key).with_source(keyboard).with_dest(synth);
            for event in [on, off] {
                while let Err(Error::QueueFull) = producer.push(event) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                std::thread::sleep(Duration::from_millis(150));
            }
        }
    });

    sequencer.send_now(&EventRecord::program_change(1, 4).with_source(arpeggiator).with_dest(synth))?;
    for (step, key) in [48u8, 52, 55, 60, 55, 52].into_iter().enumerate() {
        let note = EventRecord::note(1, key, 90, 200)
            .with_source(arpeggiator)
            .with_dest(synth);
        sequencer.send_at(note, 1500 + step as u32 * 250, false)?;
    }

    let _ = live.join();
    std::thread::sleep(Duration::from_millis(2000));
    engine.stop();
    Ok(())
}
