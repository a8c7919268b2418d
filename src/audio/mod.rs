//! Driving a synthesizer from sequencer events.

mod binding;

pub use binding::register_synth;

/// MIDI controller numbers used when mapping pan and modulation events.
pub const MODULATION_MSB: u8 = 1;
pub const PAN_MSB: u8 = 10;

/// The voice-level operations a sequencer destination can drive.
///
/// Calls arrive on whichever thread dispatched the event, usually the render
/// thread, so implementations must not block.
pub trait Synth: Send {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, key: u8);
    fn control_change(&mut self, channel: u8, control: u8, value: u8);
    fn program_change(&mut self, channel: u8, program: u8);
    fn bank_select(&mut self, channel: u8, bank: u16);
    /// `value` is 14-bit, 8192 is centre.
    fn pitch_bend(&mut self, channel: u8, value: u16);
    fn pitch_wheel_sensitivity(&mut self, channel: u8, semitones: u8);
    fn system_reset(&mut self);
    fn all_notes_off(&mut self, channel: u8);
    fn all_sounds_off(&mut self, channel: u8);
}

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}
