use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{MODULATION_MSB, PAN_MSB, Synth};
use crate::events::{ClientId, EventKind, EventRecord};
use crate::sequencer::Sequencer;

struct Binding<S> {
    synth: Arc<Mutex<S>>,
    /// (channel, key) started by `Note` events whose note-off is still pending.
    held: Mutex<HashSet<(u8, u8)>>,
}

/// Registers `synth` as a destination client named "synth" and returns its id.
///
/// `Note` events are split into a note-on now and a note-off scheduled
/// `duration` ticks later, sent by the binding to itself.
pub fn register_synth<S>(seq: &Sequencer, synth: Arc<Mutex<S>>) -> ClientId
where
    S: Synth + 'static,
{
    let binding = Binding {
        synth,
        held: Mutex::new(HashSet::new()),
    };
    seq.register_destination("synth", move |tick, event, seq| binding.handle(tick, event, seq))
}

impl<S: Synth> Binding<S> {
    fn handle(&self, tick: u32, event: &EventRecord, seq: &Sequencer) {
        match event.kind {
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } => {
                if velocity == 0 {
                    self.release(channel, key);
                } else {
                    self.synth.lock().note_on(channel, key, velocity);
                }
            }
            EventKind::NoteOff { channel, key } => self.release(channel, key),
            EventKind::Note {
                channel,
                key,
                velocity,
                duration,
            } => self.play_note(event.dest, channel, key, velocity, duration, seq),
            EventKind::ControlChange {
                channel,
                control,
                value,
            } => self.synth.lock().control_change(channel, control, value),
            EventKind::ProgramChange { channel, program } => {
                self.synth.lock().program_change(channel, program)
            }
            EventKind::BankSelect { channel, bank } => self.synth.lock().bank_select(channel, bank),
            EventKind::PitchBend { channel, value } => self.synth.lock().pitch_bend(channel, value),
            EventKind::PitchWheelSensitivity { channel, value } => {
                self.synth.lock().pitch_wheel_sensitivity(channel, value)
            }
            EventKind::Pan { channel, value } => {
                self.synth.lock().control_change(channel, PAN_MSB, value)
            }
            EventKind::Modulation { channel, value } => {
                self.synth.lock().control_change(channel, MODULATION_MSB, value)
            }
            EventKind::AllNotesOff { channel } => {
                self.held.lock().retain(|(c, _)| *c != channel);
                self.synth.lock().all_notes_off(channel);
            }
            EventKind::AllSoundOff { channel } => {
                self.held.lock().retain(|(c, _)| *c != channel);
                self.synth.lock().all_sounds_off(channel);
            }
            EventKind::SystemReset => {
                self.held.lock().clear();
                self.synth.lock().system_reset();
            }
            EventKind::Unregistering => {
                self.held.lock().clear();
                tracing::debug!(tick, id = %event.dest, "synth binding detached");
            }
            EventKind::Timer { .. } => {}
        }
    }

    fn release(&self, channel: u8, key: u8) {
        self.held.lock().remove(&(channel, key));
        self.synth.lock().note_off(channel, key);
    }

    fn play_note(
        &self,
        me: ClientId,
        channel: u8,
        key: u8,
        velocity: u8,
        duration: u32,
        seq: &Sequencer,
    ) {
        let retrigger = !self.held.lock().insert((channel, key));
        if retrigger {
            // The earlier note's pending note-off would cut this one short.
            // Note-offs other clients scheduled for the key are left alone.
            let stale = EventKind::NoteOff { channel, key };
            seq.remove_events_where(|e| e.source == me && e.dest == me && e.kind == stale);
            self.synth.lock().note_off(channel, key);
        }

        self.synth.lock().note_on(channel, key, velocity);

        let off = EventRecord::note_off(channel, key)
            .with_source(me)
            .with_dest(me);
        if let Err(err) = seq.send_at(off, duration, false) {
            tracing::warn!(%err, channel, key, "synth binding: could not schedule note-off");
            self.held.lock().remove(&(channel, key));
        }
    }
}
