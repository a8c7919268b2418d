//! Time-ordered event dispatch between registered clients.
//!
//! Any thread may register clients, send events now, schedule them for a
//! later tick or cancel them. The render thread calls [`Sequencer::advance`]
//! once per block, which hands every due event to its destination callback in
//! dispatch order (see [`crate::timing::dispatch_order`]).
//!
//! Locking:
//! - the client registry sits behind a plain mutex that is never held while a
//!   callback runs, so callbacks may register and unregister clients;
//! - the scheduled events sit behind a re-entrant mutex that `advance` holds
//!   for the whole drain. Callbacks run on the draining thread and may call
//!   back into `send_at` / `remove_events` without deadlocking, while other
//!   threads wait until the drain is done.

mod registry;

pub use registry::{Client, ClientRegistry};

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::error::{Error, Result};
use crate::events::{ClientId, EventKind, EventKindTag, EventRecord};
use crate::timing::{Clock, DEFAULT_TIME_SCALE, ScheduledEventStore};

/// Initial room in the scheduled event store.
const EVENTS_CAPACITY: usize = 1000;

/// Destination callback: `(tick, event, sequencer)`.
///
/// Whatever per-client state the destination needs is captured by the
/// closure. Callbacks must not block.
pub type DispatchFn = Arc<dyn Fn(u32, &EventRecord, &Sequencer) + Send + Sync>;

pub fn dispatch_fn<F>(f: F) -> DispatchFn
where
    F: Fn(u32, &EventRecord, &Sequencer) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerConfig {
    /// Ticks per second.
    pub time_scale: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            time_scale: DEFAULT_TIME_SCALE,
        }
    }
}

pub struct Sequencer {
    clock: Clock,
    clients: Mutex<ClientRegistry>,
    pending: ReentrantMutex<RefCell<ScheduledEventStore>>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self::from_clock(Clock::default())
    }

    pub fn with_config(config: SequencerConfig) -> Result<Self> {
        Ok(Self::from_clock(Clock::new(config.time_scale)?))
    }

    fn from_clock(clock: Clock) -> Self {
        Self {
            clock,
            clients: Mutex::new(ClientRegistry::new()),
            pending: ReentrantMutex::new(RefCell::new(ScheduledEventStore::with_capacity(
                EVENTS_CAPACITY,
            ))),
        }
    }

    /// Registers a client. With a callback the client is a destination,
    /// without one it can only be named as the source of events.
    pub fn register_client(&self, name: &str, callback: Option<DispatchFn>) -> ClientId {
        let destination = callback.is_some();
        let id = self.clients.lock().register(name, callback);
        tracing::debug!(%id, name, destination, "sequencer: client registered");
        id
    }

    pub fn register_source(&self, name: &str) -> ClientId {
        self.register_client(name, None)
    }

    pub fn register_destination<F>(&self, name: &str, callback: F) -> ClientId
    where
        F: Fn(u32, &EventRecord, &Sequencer) + Send + Sync + 'static,
    {
        self.register_client(name, Some(dispatch_fn(callback)))
    }

    /// Removes the client, then hands its callback (if any) an
    /// `Unregistering` event stamped with the current tick.
    ///
    /// The client is gone from the registry before the callback runs, so the
    /// callback sees `is_destination(id) == false` and a nested unregister of
    /// the same id reports `ClientNotFound` instead of dispatching twice.
    pub fn unregister_client(&self, id: ClientId) -> Result<()> {
        self.unregister(id).map(|_| ())
    }

    /// Returns whether a callback was run.
    fn unregister(&self, id: ClientId) -> Result<bool> {
        let now = self.current_tick();
        let client = self
            .clients
            .lock()
            .remove(id)
            .ok_or(Error::ClientNotFound(id))?;
        tracing::debug!(%id, name = %client.name, "sequencer: client unregistered");

        let Some(callback) = client.callback else {
            return Ok(false);
        };
        let event = EventRecord::unregistering().with_dest(id).with_time(now);
        callback(now, &event, self);
        Ok(true)
    }

    pub fn is_destination(&self, id: ClientId) -> bool {
        self.clients.lock().is_destination(id)
    }

    pub fn client_name(&self, id: ClientId) -> Option<String> {
        self.clients.lock().name_of(id).map(str::to_string)
    }

    pub fn count_clients(&self) -> usize {
        self.clients.lock().count()
    }

    /// Id of the `index`th live client, in registration order.
    pub fn client_id_at(&self, index: usize) -> Option<ClientId> {
        self.clients.lock().id_at(index)
    }

    /// Delivers `event` to its destination right away, on the calling thread.
    ///
    /// An `Unregistering` event unregisters its destination instead.
    pub fn send_now(&self, event: &EventRecord) -> Result<()> {
        self.dispatch(self.current_tick(), event).map(|_| ())
    }

    /// Schedules a copy of `event` at `time`, an absolute tick or, with
    /// `absolute == false`, a tick offset from now.
    ///
    /// Fails with `ClientNotFound` if the destination is not registered. If it
    /// unregisters before the event is due, the event is dropped.
    pub fn send_at(&self, mut event: EventRecord, time: u32, absolute: bool) -> Result<()> {
        if !self.clients.lock().contains(event.dest) {
            return Err(Error::ClientNotFound(event.dest));
        }

        event.time = if absolute {
            time
        } else {
            self.current_tick().saturating_add(time)
        };

        let pending = self.pending.lock();
        pending.borrow_mut().insert(event);
        Ok(())
    }

    /// Cancels scheduled events. `None` filters match anything. Once this
    /// returns none of the matched events will be dispatched.
    pub fn remove_events(
        &self,
        source: Option<ClientId>,
        dest: Option<ClientId>,
        kind: Option<EventKindTag>,
    ) -> usize {
        let pending = self.pending.lock();
        let removed = pending.borrow_mut().remove_matching(source, dest, kind);
        removed
    }

    pub fn remove_events_where<F>(&self, pred: F) -> usize
    where
        F: FnMut(&EventRecord) -> bool,
    {
        let pending = self.pending.lock();
        let removed = pending.borrow_mut().remove_where(pred);
        removed
    }

    pub fn pending_count(&self) -> usize {
        let pending = self.pending.lock();
        let count = pending.borrow().len();
        count
    }

    pub fn next_due_tick(&self) -> Option<u32> {
        let pending = self.pending.lock();
        let tick = pending.borrow().next_due_tick();
        tick
    }

    pub fn current_tick(&self) -> u32 {
        self.clock.tick()
    }

    pub fn time_scale(&self) -> f64 {
        self.clock.scale()
    }

    /// Changes the ticks-per-second scale, rebasing at the current moment so
    /// already scheduled events keep their place on the tick timeline.
    ///
    /// Must not be called while `advance` is dispatching, including from a
    /// destination callback.
    pub fn set_time_scale(&self, scale: f64) -> Result<()> {
        self.clock.set_scale(scale)?;
        tracing::debug!(scale = self.clock.scale(), "sequencer: time scale changed");
        Ok(())
    }

    /// Moves the clock to `now_ms` and dispatches every due event in order.
    /// Returns the number of events handed to a callback; events for source
    /// only or vanished clients are not counted.
    ///
    /// `now_ms` must be non-decreasing and come from the rendered frame count,
    /// not the wall clock.
    pub fn advance(&self, now_ms: u32) -> usize {
        let tick = self.clock.advance(now_ms);
        let pending = self.pending.lock();
        let mut delivered = 0;

        loop {
            // The borrow ends before dispatch so callbacks can schedule.
            let next = pending.borrow_mut().pop_due(tick);
            let Some(event) = next else {
                break;
            };
            match self.dispatch(tick, &event) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::trace!(%err, kind = ?event.kind.tag(), "sequencer: dropping due event")
                }
            }
        }
        delivered
    }

    /// Returns whether a callback was run.
    fn dispatch(&self, tick: u32, event: &EventRecord) -> Result<bool> {
        if matches!(event.kind, EventKind::Unregistering) {
            return self.unregister(event.dest);
        }

        let callback = {
            let clients = self.clients.lock();
            let client = clients
                .get(event.dest)
                .ok_or(Error::ClientNotFound(event.dest))?;
            client.callback.clone()
        };

        let Some(callback) = callback else {
            return Ok(false);
        };
        tracing::trace!(tick, dest = %event.dest, kind = ?event.kind.tag(), "sequencer: dispatch");
        callback(tick, event, self);
        Ok(true)
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        loop {
            let next = self.clients.lock().id_at(0);
            let Some(id) = next else {
                break;
            };
            let _ = self.unregister_client(id);
        }
    }
}
