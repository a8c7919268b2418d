use std::fmt;

/// Handle of a registered sequencer client.
///
/// Ids are handed out by the sequencer starting at 1 and are never reused, so
/// a stale id is reported as unknown instead of reaching a newer client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientId(pub u32);

impl ClientId {
    /// No client. Used for events without a known origin or target.
    pub const UNSET: ClientId = ClientId(0);

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    /// A note-on followed by a note-off `duration` ticks later.
    Note { channel: u8, key: u8, velocity: u8, duration: u32 },
    ControlChange { channel: u8, control: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    BankSelect { channel: u8, bank: u16 },
    /// 14 bit, 8192 is centered.
    PitchBend { channel: u8, value: u16 },
    /// Semitones.
    PitchWheelSensitivity { channel: u8, value: u8 },
    Pan { channel: u8, value: u8 },
    Modulation { channel: u8, value: u8 },
    SystemReset,
    Unregistering,
    Timer { data: u64 },
    AllNotesOff { channel: u8 },
    AllSoundOff { channel: u8 },
}

/// Payload-free discriminant of [`EventKind`], used to filter events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKindTag {
    NoteOn,
    NoteOff,
    Note,
    ControlChange,
    ProgramChange,
    BankSelect,
    PitchBend,
    PitchWheelSensitivity,
    Pan,
    Modulation,
    SystemReset,
    Unregistering,
    Timer,
    AllNotesOff,
    AllSoundOff,
}

impl EventKind {
    pub fn tag(&self) -> EventKindTag {
        match self {
            EventKind::NoteOn { .. } => EventKindTag::NoteOn,
            EventKind::NoteOff { .. } => EventKindTag::NoteOff,
            EventKind::Note { .. } => EventKindTag::Note,
            EventKind::ControlChange { .. } => EventKindTag::ControlChange,
            EventKind::ProgramChange { .. } => EventKindTag::ProgramChange,
            EventKind::BankSelect { .. } => EventKindTag::BankSelect,
            EventKind::PitchBend { .. } => EventKindTag::PitchBend,
            EventKind::PitchWheelSensitivity { .. } => EventKindTag::PitchWheelSensitivity,
            EventKind::Pan { .. } => EventKindTag::Pan,
            EventKind::Modulation { .. } => EventKindTag::Modulation,
            EventKind::SystemReset => EventKindTag::SystemReset,
            EventKind::Unregistering => EventKindTag::Unregistering,
            EventKind::Timer { .. } => EventKindTag::Timer,
            EventKind::AllNotesOff { .. } => EventKindTag::AllNotesOff,
            EventKind::AllSoundOff { .. } => EventKindTag::AllSoundOff,
        }
    }

    /// True for events that start a sound: `Note`, and `NoteOn` with a
    /// non-zero velocity. A zero velocity `NoteOn` is a note-off.
    pub fn is_note_start(&self) -> bool {
        match self {
            EventKind::NoteOn { velocity, .. } => *velocity > 0,
            EventKind::Note { .. } => true,
            _ => false,
        }
    }

    pub fn channel(&self) -> Option<u8> {
        match *self {
            EventKind::NoteOn { channel, .. }
            | EventKind::NoteOff { channel, .. }
            | EventKind::Note { channel, .. }
            | EventKind::ControlChange { channel, .. }
            | EventKind::ProgramChange { channel, .. }
            | EventKind::BankSelect { channel, .. }
            | EventKind::PitchBend { channel, .. }
            | EventKind::PitchWheelSensitivity { channel, .. }
            | EventKind::Pan { channel, .. }
            | EventKind::Modulation { channel, .. }
            | EventKind::AllNotesOff { channel }
            | EventKind::AllSoundOff { channel } => Some(channel),
            EventKind::SystemReset | EventKind::Unregistering | EventKind::Timer { .. } => None,
        }
    }
}

/// One control or musical event, as scheduled, queued and dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    /// Absolute tick at which the event fires.
    pub time: u32,
    pub kind: EventKind,
    pub source: ClientId,
    pub dest: ClientId,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self::new(EventKind::Timer { data: 0 })
    }
}

impl EventRecord {
    pub fn new(kind: EventKind) -> Self {
        Self {
            time: 0,
            kind,
            source: ClientId::UNSET,
            dest: ClientId::UNSET,
        }
    }

    pub fn with_source(mut self, source: ClientId) -> Self {
        self.source = source;
        self
    }

    pub fn with_dest(mut self, dest: ClientId) -> Self {
        self.dest = dest;
        self
    }

    pub fn with_time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(EventKind::NoteOn {
            channel,
            key,
            velocity,
        })
    }

    pub fn note_off(channel: u8, key: u8) -> Self {
        Self::new(EventKind::NoteOff { channel, key })
    }

    pub fn note(channel: u8, key: u8, velocity: u8, duration: u32) -> Self {
        Self::new(EventKind::Note {
            channel,
            key,
            velocity,
            duration,
        })
    }

    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::new(EventKind::ControlChange {
            channel,
            control,
            value,
        })
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::new(EventKind::ProgramChange { channel, program })
    }

    pub fn bank_select(channel: u8, bank: u16) -> Self {
        Self::new(EventKind::BankSelect { channel, bank })
    }

    pub fn pitch_bend(channel: u8, value: u16) -> Self {
        Self::new(EventKind::PitchBend { channel, value })
    }

    pub fn pitch_wheel_sensitivity(channel: u8, value: u8) -> Self {
        Self::new(EventKind::PitchWheelSensitivity { channel, value })
    }

    pub fn pan(channel: u8, value: u8) -> Self {
        Self::new(EventKind::Pan { channel, value })
    }

    pub fn modulation(channel: u8, value: u8) -> Self {
        Self::new(EventKind::Modulation { channel, value })
    }

    pub fn system_reset() -> Self {
        Self::new(EventKind::SystemReset)
    }

    pub fn unregistering() -> Self {
        Self::new(EventKind::Unregistering)
    }

    pub fn timer(data: u64) -> Self {
        Self::new(EventKind::Timer { data })
    }

    pub fn all_notes_off(channel: u8) -> Self {
        Self::new(EventKind::AllNotesOff { channel })
    }

    pub fn all_sound_off(channel: u8) -> Self {
        Self::new(EventKind::AllSoundOff { channel })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_routing_and_time() {
        let event = EventRecord::note_on(1, 60, 90)
            .with_source(ClientId(3))
            .with_dest(ClientId(4))
            .with_time(250);

        assert_eq!(event.time, 250);
        assert_eq!(event.source, ClientId(3));
        assert_eq!(event.dest, ClientId(4));
        assert_eq!(event.kind.tag(), EventKindTag::NoteOn);
        assert_eq!(event.kind.channel(), Some(1));
    }

    #[test]
    fn new_events_are_unrouted() {
        let event = EventRecord::system_reset();
        assert!(event.source.is_unset());
        assert!(event.dest.is_unset());
        assert_eq!(event.time, 0);
        assert_eq!(event.kind.channel(), None);
    }

    #[test]
    fn note_start_classification() {
        assert!(EventRecord::note_on(0, 60, 1).kind.is_note_start());
        assert!(EventRecord::note(0, 60, 80, 100).kind.is_note_start());
        assert!(!EventRecord::note_on(0, 60, 0).kind.is_note_start());
        assert!(!EventRecord::note_off(0, 60).kind.is_note_start());
        assert!(!EventRecord::pan(0, 64).kind.is_note_start());
    }

    #[test]
    fn tags_match_kinds() {
        let pairs = [
            (EventRecord::note(0, 1, 2, 3), EventKindTag::Note),
            (EventRecord::bank_select(0, 1), EventKindTag::BankSelect),
            (EventRecord::pitch_bend(0, 8192), EventKindTag::PitchBend),
            (EventRecord::unregistering(), EventKindTag::Unregistering),
            (EventRecord::timer(7), EventKindTag::Timer),
            (EventRecord::all_sound_off(2), EventKindTag::AllSoundOff),
        ];
        for (event, tag) in pairs {
            assert_eq!(event.kind.tag(), tag);
        }
    }
}
