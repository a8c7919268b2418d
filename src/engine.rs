use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::queue::{ControlQueue, Consumer, Producer};
use crate::sequencer::Sequencer;
use crate::timing::SampleTimer;
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    SetTimeScale(f64),
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    Started { sample_rate: u32, block_size: usize },
    TimeScaleChanged { scale: f64 },
    Error { message: String },
    Stopped { frames: u64 },
}

pub struct EngineHandle {
    pub command_tx: Sender<EngineCommand>,
    pub update_rx: Receiver<EngineUpdate>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn set_time_scale(&self, scale: f64) {
        let _ = self.command_tx.send(EngineCommand::SetTimeScale(scale));
    }

    /// Stops the render thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.command_tx.send(EngineCommand::Stop);
        if thread.join().is_err() {
            tracing::error!("engine: render thread panicked");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts the render thread driving `sequencer`.
///
/// The returned producer is the only way into the render thread's control
/// queue. Records whose `time` lies ahead of the sequencer's current tick
/// are scheduled at that absolute tick, everything else is delivered as
/// soon as the next block starts.
pub fn spawn_engine(
    config: &EngineConfig,
    sequencer: Arc<Sequencer>,
) -> Result<(EngineHandle, Producer)> {
    config.validate()?;

    let (producer, consumer) = ControlQueue::new(config.queue_capacity)?.split();
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();

    let render = RenderLoop {
        sequencer,
        consumer,
        timer: SampleTimer::new(config.sample_rate),
        block_size: config.block_size,
        period: config.realtime.then(|| config.block_duration()),
        command_rx,
        update_tx,
    };

    let thread = std::thread::Builder::new()
        .name("synthseq-render".into())
        .spawn(move || render.run())?;

    let handle = EngineHandle {
        command_tx,
        update_rx,
        thread: Some(thread),
    };
    Ok((handle, producer))
}

struct RenderLoop {
    sequencer: Arc<Sequencer>,
    consumer: Consumer,
    timer: SampleTimer,
    block_size: usize,
    /// `None` renders blocks back to back.
    period: Option<Duration>,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
}

impl RenderLoop {
    fn run(mut self) {
        tracing::info!(
            sample_rate = self.timer.sample_rate(),
            block_size = self.block_size,
            realtime = self.period.is_some(),
            "engine: render thread started"
        );
        let _ = self.update_tx.send(EngineUpdate::Started {
            sample_rate: self.timer.sample_rate(),
            block_size: self.block_size,
        });

        while self.apply_commands() {
            self.drain_queue();
            let now_ms = self.timer.advance(self.block_size);
            self.sequencer.advance(now_ms);

            match self.period {
                Some(period) => std::thread::sleep(period),
                None => std::thread::yield_now(),
            }
        }

        let frames = self.timer.frames();
        tracing::info!(frames, "engine: render thread stopped");
        let _ = self.update_tx.send(EngineUpdate::Stopped { frames });
    }

    /// Returns false once the loop should exit.
    fn apply_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(EngineCommand::SetTimeScale(scale)) => {
                    match self.sequencer.set_time_scale(scale) {
                        Ok(()) => {
                            let _ = self.update_tx.send(EngineUpdate::TimeScaleChanged {
                                scale: self.sequencer.time_scale(),
                            });
                        }
                        Err(err) => self.report(err),
                    }
                }
                Ok(EngineCommand::Stop) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn drain_queue(&mut self) {
        // Bounded so a producer that never pauses can not starve rendering.
        for _ in 0..self.consumer.capacity() {
            let Some(event) = self.consumer.pop() else {
                break;
            };
            let result = if event.time > self.sequencer.current_tick() {
                self.sequencer.send_at(event, event.time, true)
            } else {
                self.sequencer.send_now(&event)
            };
            if let Err(err) = result {
                self.report(err);
            }
        }
    }

    fn report(&self, err: Error) {
        tracing::warn!(%err, "engine");
        let _ = self.update_tx.send(EngineUpdate::Error {
            message: err.to_string(),
        });
    }
}
