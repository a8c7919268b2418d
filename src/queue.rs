//! Fixed-capacity single-producer/single-consumer queue of [`EventRecord`]s.
//!
//! The writer and reader halves are separate, non-cloneable handles. Building
//! a queue and splitting it yields exactly one [`Producer`] and one
//! [`Consumer`], so the "one writer, one reader" contract is carried by the
//! types instead of by convention.
//!
//! The halves only share the slot array and an occupancy counter. Each side
//! keeps its own index. Pushing and popping never lock, never allocate and
//! never block: a full queue makes `try_begin_push` return `None` and the
//! caller decides what to do with the event.

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use crate::error::{Error, Result};
use crate::events::EventRecord;

struct Shared {
    slots: Box<[UnsafeCell<EventRecord>]>,
    /// Committed, not yet released slots. In `[0, capacity]`.
    occupancy: CachePadded<AtomicUsize>,
}

// Safety: a slot is only written by the producer while it is free and only
// read by the consumer while it is occupied. Ownership of a slot changes
// hands through the release/acquire pair on `occupancy`.
unsafe impl Sync for Shared {}

impl Shared {
    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

pub struct ControlQueue {
    shared: Arc<Shared>,
}

impl ControlQueue {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "control queue capacity must be at least 1".into(),
            ));
        }

        // Records are plain values, so slots start out as defaults and a
        // reused slot never holds anything that needs releasing.
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(EventRecord::default()))
            .collect();

        Ok(Self {
            shared: Arc::new(Shared {
                slots,
                occupancy: CachePadded::new(AtomicUsize::new(0)),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    pub fn split(self) -> (Producer, Consumer) {
        let producer = Producer {
            shared: Arc::clone(&self.shared),
            write_index: 0,
        };
        let consumer = Consumer {
            shared: self.shared,
            read_index: 0,
        };
        (producer, consumer)
    }
}

/// Writing half. Owned by exactly one thread at a time.
pub struct Producer {
    shared: Arc<Shared>,
    write_index: usize,
}

impl Producer {
    /// Next free slot, or `None` when the queue is full.
    ///
    /// The slot still holds whatever record last passed through it; the caller
    /// overwrites it and then publishes it with [`Producer::commit_push`].
    /// Nothing is published until then.
    pub fn try_begin_push(&mut self) -> Option<&mut EventRecord> {
        if self.shared.occupancy.load(Ordering::Acquire) == self.shared.capacity() {
            return None;
        }
        // Safety: occupancy < capacity, so the slot at write_index has been
        // released by the consumer and is not visible to it until we commit.
        Some(unsafe { &mut *self.shared.slots[self.write_index].get() })
    }

    /// Publishes the slot handed out by the last successful
    /// [`Producer::try_begin_push`].
    pub fn commit_push(&mut self) {
        if self.shared.occupancy.load(Ordering::Acquire) == self.shared.capacity() {
            tracing::warn!("control queue: commit_push on a full queue ignored");
            return;
        }
        self.write_index += 1;
        if self.write_index == self.shared.capacity() {
            self.write_index = 0;
        }
        self.shared.occupancy.fetch_add(1, Ordering::AcqRel);
    }

    /// Copies `event` into the queue. `Error::QueueFull` if there is no room.
    pub fn push(&mut self, event: EventRecord) -> Result<()> {
        match self.try_begin_push() {
            Some(slot) => {
                *slot = event;
                self.commit_push();
                Ok(())
            }
            None => Err(Error::QueueFull),
        }
    }

    pub fn len(&self) -> usize {
        self.shared.occupancy.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.shared.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Reading half. Owned by exactly one thread at a time, typically the render
/// loop.
pub struct Consumer {
    shared: Arc<Shared>,
    read_index: usize,
}

impl Consumer {
    /// Oldest unread record, or `None` when the queue is empty. The record
    /// stays in the queue until [`Consumer::commit_pop`].
    pub fn try_begin_pop(&self) -> Option<&EventRecord> {
        if self.shared.occupancy.load(Ordering::Acquire) == 0 {
            return None;
        }
        // Safety: occupancy > 0, so the slot at read_index was published by
        // the producer and it won't touch it again until we release it.
        Some(unsafe { &*self.shared.slots[self.read_index].get() })
    }

    /// Releases the slot returned by the last successful
    /// [`Consumer::try_begin_pop`] back to the producer.
    pub fn commit_pop(&mut self) {
        if self.shared.occupancy.load(Ordering::Acquire) == 0 {
            tracing::warn!("control queue: commit_pop on an empty queue ignored");
            return;
        }
        self.read_index += 1;
        if self.read_index == self.shared.capacity() {
            self.read_index = 0;
        }
        self.shared.occupancy.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn pop(&mut self) -> Option<EventRecord> {
        let event = *self.try_begin_pop()?;
        self.commit_pop();
        Some(event)
    }

    pub fn len(&self) -> usize {
        self.shared.occupancy.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ClientId;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ControlQueue::new(0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn capacity_bound() {
        let (mut producer, mut consumer) = ControlQueue::new(4).unwrap().split();

        for i in 0..4 {
            let slot = producer.try_begin_push().expect("free slot");
            *slot = EventRecord::timer(i);
            producer.commit_push();
        }
        assert!(producer.is_full());
        assert!(producer.try_begin_push().is_none());
        assert!(matches!(
            producer.push(EventRecord::timer(99)),
            Err(Error::QueueFull)
        ));

        assert!(consumer.try_begin_pop().is_some());
        consumer.commit_pop();

        assert!(producer.try_begin_push().is_some());
    }

    #[test]
    fn round_trip_keeps_every_field() {
        let (mut producer, mut consumer) = ControlQueue::new(2).unwrap().split();
        let event = EventRecord::control_change(3, 7, 100)
            .with_source(ClientId(1))
            .with_dest(ClientId(2))
            .with_time(42);

        producer.push(event).unwrap();
        assert_eq!(consumer.pop(), Some(event));
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn begin_pop_does_not_consume() {
        let (mut producer, mut consumer) = ControlQueue::new(2).unwrap().split();
        producer.push(EventRecord::timer(1)).unwrap();

        assert_eq!(consumer.try_begin_pop().map(|e| e.kind), Some(EventRecord::timer(1).kind));
        assert_eq!(consumer.try_begin_pop().map(|e| e.kind), Some(EventRecord::timer(1).kind));
        assert_eq!(consumer.len(), 1);

        consumer.commit_pop();
        assert!(consumer.is_empty());
    }

    #[test]
    fn wraps_around_in_fifo_order() {
        let (mut producer, mut consumer) = ControlQueue::new(3).unwrap().split();

        let mut expected = 0;
        for round in 0..10u64 {
            producer.push(EventRecord::timer(round * 2)).unwrap();
            producer.push(EventRecord::timer(round * 2 + 1)).unwrap();
            for _ in 0..2 {
                let event = consumer.pop().unwrap();
                assert_eq!(event.kind, EventRecord::timer(expected).kind);
                expected += 1;
            }
        }
    }

    #[test]
    fn stray_commits_are_ignored() {
        let (mut producer, mut consumer) = ControlQueue::new(1).unwrap().split();

        consumer.commit_pop();
        assert_eq!(consumer.len(), 0);

        producer.push(EventRecord::timer(5)).unwrap();
        producer.commit_push();
        assert_eq!(producer.len(), 1);
        assert_eq!(consumer.pop(), Some(EventRecord::timer(5)));
    }

    #[test]
    fn producer_and_consumer_on_separate_threads() {
        const COUNT: u64 = 20_000;
        let (mut producer, mut consumer) = ControlQueue::new(16).unwrap().split();

        let writer = std::thread::spawn(move || {
            let mut next = 0;
            while next < COUNT {
                if let Some(slot) = producer.try_begin_push() {
                    *slot = EventRecord::timer(next).with_time(next as u32);
                    producer.commit_push();
                    next += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            match consumer.pop() {
                Some(event) => {
                    assert_eq!(event.kind, EventRecord::timer(expected).kind);
                    assert_eq!(event.time, expected as u32);
                    expected += 1;
                }
                None => std::thread::yield_now(),
            }
        }

        writer.join().unwrap();
        assert!(consumer.is_empty());
    }
}
