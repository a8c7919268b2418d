//! Dispatch order of scheduled events.
//!
//! Events are ordered by tick. Within one tick:
//!
//! 1. `SystemReset` goes first,
//! 2. then `Unregistering`,
//! 3. then `BankSelect`,
//! 4. then `ProgramChange`, so a program is picked from the bank selected on
//!    the same tick,
//! 5. then everything else,
//! 6. and note starts (`Note`, `NoteOn` with velocity > 0) go last.
//!
//! Events in the same class are equivalent. A zero velocity `NoteOn` is a
//! note-off and lands in class 5 like `NoteOff`, so a note stop is never held
//! back by a note start at the same tick.
//!
//! The relation is a strict weak ordering because it is a lexicographic
//! comparison of `(time, class)`; the heap in the scheduler depends on that.

use std::cmp::Ordering;

use crate::events::{EventKind, EventRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DispatchClass {
    SystemReset,
    Unregistering,
    BankSelect,
    ProgramChange,
    Other,
    NoteStart,
}

impl DispatchClass {
    pub fn of(kind: &EventKind) -> Self {
        match kind {
            EventKind::SystemReset => DispatchClass::SystemReset,
            EventKind::Unregistering => DispatchClass::Unregistering,
            EventKind::BankSelect { .. } => DispatchClass::BankSelect,
            EventKind::ProgramChange { .. } => DispatchClass::ProgramChange,
            kind if kind.is_note_start() => DispatchClass::NoteStart,
            _ => DispatchClass::Other,
        }
    }
}

/// Total preorder over events: `Less` means `a` is dispatched before `b`,
/// `Equal` means the two are equivalent.
pub fn dispatch_order(a: &EventRecord, b: &EventRecord) -> Ordering {
    a.time
        .cmp(&b.time)
        .then_with(|| DispatchClass::of(&a.kind).cmp(&DispatchClass::of(&b.kind)))
}

/// Strict "dispatched before" predicate.
pub fn sorts_before(a: &EventRecord, b: &EventRecord) -> bool {
    dispatch_order(a, b) == Ordering::Less
}
