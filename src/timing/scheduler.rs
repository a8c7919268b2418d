use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::ordering::dispatch_order;
use crate::events::{ClientId, EventKindTag, EventRecord};

/// Heap entry. `seq` is the insertion number, so events that are equivalent
/// under the dispatch order come out first-in first-out.
#[derive(Debug, Clone)]
struct Pending {
    event: EventRecord,
    seq: u64,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the first event to
        // dispatch on top.
        dispatch_order(&other.event, &self.event).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Events waiting for their tick, released in dispatch order.
#[derive(Debug, Default)]
pub struct ScheduledEventStore {
    heap: BinaryHeap<Pending>,
    next_seq: u64,
}

impl ScheduledEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Stores `event` as is. Its `time` must already be the absolute tick.
    pub fn insert(&mut self, event: EventRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Pending { event, seq });
    }

    /// Removes every stored event matching all given filters. `None` matches
    /// anything. Returns how many events were removed.
    pub fn remove_matching(
        &mut self,
        source: Option<ClientId>,
        dest: Option<ClientId>,
        kind: Option<EventKindTag>,
    ) -> usize {
        self.remove_where(|event| {
            source.is_none_or(|s| event.source == s)
                && dest.is_none_or(|d| event.dest == d)
                && kind.is_none_or(|k| event.kind.tag() == k)
        })
    }

    /// Removes every stored event for which `pred` is true.
    pub fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&EventRecord) -> bool,
    {
        let before = self.heap.len();
        self.heap.retain(|pending| !pred(&pending.event));
        before - self.heap.len()
    }

    /// Takes out the next event if it is due at `up_to_tick`.
    pub fn pop_due(&mut self, up_to_tick: u32) -> Option<EventRecord> {
        if self.heap.peek()?.event.time > up_to_tick {
            return None;
        }
        self.heap.pop().map(|pending| pending.event)
    }

    /// Removes and yields, in dispatch order, every event due at `up_to_tick`.
    /// Events still in the iterator when it is dropped stay in the store.
    pub fn drain_due(&mut self, up_to_tick: u32) -> DrainDue<'_> {
        DrainDue {
            store: self,
            up_to_tick,
        }
    }

    /// Tick of the next event to dispatch.
    pub fn next_due_tick(&self) -> Option<u32> {
        self.heap.peek().map(|pending| pending.event.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

pub struct DrainDue<'a> {
    store: &'a mut ScheduledEventStore,
    up_to_tick: u32,
}

impl Iterator for DrainDue<'_> {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        self.store.pop_due(self.up_to_tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use rand::seq::SliceRandom;

    fn kinds(events: &[EventRecord]) -> Vec<EventKindTag> {
        events.iter().map(|e| e.kind.tag()).collect()
    }

    #[test]
    fn drains_in_dispatch_order() {
        let mut store = ScheduledEventStore::new();
        store.insert(EventRecord::note_on(0, 60, 90).with_time(100));
        store.insert(EventRecord::control_change(0, 7, 100).with_time(100));
        store.insert(EventRecord::program_change(0, 1).with_time(50));
        store.insert(EventRecord::system_reset().with_time(100));
        store.insert(EventRecord::unregistering().with_time(100));

        let drained: Vec<_> = store.drain_due(100).collect();
        assert_eq!(
            kinds(&drained),
            vec![
                EventKindTag::ProgramChange,
                EventKindTag::SystemReset,
                EventKindTag::Unregistering,
                EventKindTag::ControlChange,
                EventKindTag::NoteOn,
            ]
        );
        assert!(store.is_empty());
    }

    #[test]
    fn leaves_future_events_in_place() {
        let mut store = ScheduledEventStore::new();
        store.insert(EventRecord::timer(1).with_time(10));
        store.insert(EventRecord::timer(2).with_time(20));
        store.insert(EventRecord::timer(3).with_time(21));

        let drained: Vec<_> = store.drain_due(20).collect();
        assert_eq!(drained.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.next_due_tick(), Some(21));
    }

    #[test]
    fn drained_events_are_gone() {
        let mut store = ScheduledEventStore::new();
        for t in 0..10 {
            store.insert(EventRecord::timer(t as u64).with_time(t));
        }

        assert_eq!(store.drain_due(9).count(), 10);
        assert_eq!(store.drain_due(u32::MAX).count(), 0);
        assert_eq!(store.pop_due(u32::MAX), None);
    }

    #[test]
    fn equivalent_events_keep_insertion_order() {
        let mut store = ScheduledEventStore::new();
        for data in 0..50 {
            store.insert(EventRecord::timer(data).with_time(7));
        }

        let order: Vec<u64> = store
            .drain_due(7)
            .map(|e| match e.kind {
                EventKind::Timer { data } => data,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn shuffled_insertion_drains_sorted() {
        let mut events = Vec::new();
        for t in 0..40u32 {
            events.push(EventRecord::note_on(0, 60, 90).with_time(t));
            events.push(EventRecord::note_off(0, 60).with_time(t));
            events.push(EventRecord::system_reset().with_time(t));
            events.push(EventRecord::pan(0, 10).with_time(t));
        }
        events.shuffle(&mut rand::thread_rng());

        let mut store = ScheduledEventStore::with_capacity(events.len());
        for event in &events {
            store.insert(*event);
        }

        let drained: Vec<_> = store.drain_due(u32::MAX).collect();
        assert_eq!(drained.len(), events.len());
        for pair in drained.windows(2) {
            assert_ne!(dispatch_order(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn remove_matching_with_wildcards() {
        let a = ClientId(1);
        let b = ClientId(2);
        let mut store = ScheduledEventStore::new();
        store.insert(EventRecord::note_on(0, 60, 90).with_source(a).with_dest(b).with_time(5));
        store.insert(EventRecord::note_off(0, 60).with_source(a).with_dest(b).with_time(6));
        store.insert(EventRecord::note_on(0, 62, 90).with_source(b).with_dest(a).with_time(5));
        store.insert(EventRecord::pan(0, 1).with_source(b).with_dest(b).with_time(5));

        assert_eq!(store.remove_matching(Some(a), None, Some(EventKindTag::NoteOn)), 1);
        assert_eq!(store.len(), 3);

        assert_eq!(store.remove_matching(None, Some(b), None), 2);
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove_matching(Some(a), None, None), 0);
        assert_eq!(store.remove_matching(None, None, None), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_where_uses_payload() {
        let mut store = ScheduledEventStore::new();
        store.insert(EventRecord::note_off(0, 60).with_time(5));
        store.insert(EventRecord::note_off(1, 60).with_time(5));

        let removed = store.remove_where(|e| e.kind.channel() == Some(1));
        assert_eq!(removed, 1);
        assert_eq!(store.pop_due(5).map(|e| e.kind.channel()), Some(Some(0)));
    }
}
