//! Async playback driver
//!
//! Runs one [`Simulator`] on a tokio task. The task owns the simulator, so
//! ticks and commands are handled one at a time and never overlap. Commands
//! arrive on an mpsc channel; every state change is published on a watch
//! channel for renderers.

use pathplay_core::SimulationError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::player::Simulator;
use crate::state::PlaybackSnapshot;

/// Commands accepted by the driver task
#[derive(Debug)]
enum PlaybackCommand {
    Start(f64),
    Pause,
    Resume,
    Stop,
    Step,
    SetSpeed(f64),
    Close,
}

type Request = (PlaybackCommand, oneshot::Sender<Result<(), SimulationError>>);

/// Handle to a simulator running on its own task
pub struct PlaybackDriver {
    commands: mpsc::Sender<Request>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    /// Move `simulator` onto a new task. Must be called inside a tokio runtime.
    pub fn spawn(mut simulator: Simulator) -> Self {
        let (command_tx, mut command_rx) = mpsc::channel::<Request>(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(simulator.snapshot());
        let tick_interval = simulator.tick_interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    request = command_rx.recv() => {
                        let Some((command, reply)) = request else {
                            debug!("All driver handles dropped, closing simulator");
                            simulator.close();
                            break;
                        };
                        let closing = matches!(command, PlaybackCommand::Close);
                        let result = apply(&mut simulator, command);
                        if let Err(err) = &result {
                            warn!("Playback command failed: {}", err);
                        }
                        publish(&snapshot_tx, simulator.snapshot());
                        let _ = reply.send(result);
                        if closing {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        simulator.on_timer();
                        publish(&snapshot_tx, simulator.snapshot());
                    }
                }
            }
        });

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            task: Some(task),
        }
    }

    pub async fn start(&self, speed: f64) -> Result<(), SimulationError> {
        self.send(PlaybackCommand::Start(speed)).await
    }

    pub async fn pause(&self) -> Result<(), SimulationError> {
        self.send(PlaybackCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), SimulationError> {
        self.send(PlaybackCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), SimulationError> {
        self.send(PlaybackCommand::Stop).await
    }

    pub async fn step(&self) -> Result<(), SimulationError> {
        self.send(PlaybackCommand::Step).await
    }

    pub async fn set_speed(&self, speed: f64) -> Result<(), SimulationError> {
        self.send(PlaybackCommand::SetSpeed(speed)).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A fresh receiver for snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<PlaybackSnapshot, SimulationError>
    where
        F: FnMut(&PlaybackSnapshot) -> bool,
    {
        let mut receiver = self.subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| SimulationError::DriverStopped)?;
        Ok(snapshot.clone())
    }

    /// Close the simulator and wait for the task to end. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), SimulationError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        // The task may already be gone if every command sender was dropped.
        let _ = self.send(PlaybackCommand::Close).await;
        if let Err(err) = task.await {
            warn!("Playback task ended abnormally: {}", err);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    async fn send(&self, command: PlaybackCommand) -> Result<(), SimulationError> {
        if self.task.is_none() && !matches!(command, PlaybackCommand::Close) {
            return Err(SimulationError::DriverStopped);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send((command, reply_tx))
            .await
            .map_err(|_| SimulationError::DriverStopped)?;
        reply_rx.await.map_err(|_| SimulationError::DriverStopped)?
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn apply(simulator: &mut Simulator, command: PlaybackCommand) -> Result<(), SimulationError> {
    match command {
        PlaybackCommand::Start(speed) => simulator.start(speed),
        PlaybackCommand::Pause => {
            simulator.pause();
            Ok(())
        }
        PlaybackCommand::Resume => simulator.resume(),
        PlaybackCommand::Stop => {
            simulator.stop();
            Ok(())
        }
        PlaybackCommand::Step => simulator.step(),
        PlaybackCommand::SetSpeed(speed) => simulator.set_speed(speed),
        PlaybackCommand::Close => {
            simulator.close();
            Ok(())
        }
    }
}

fn publish(sender: &watch::Sender<PlaybackSnapshot>, snapshot: PlaybackSnapshot) {
    sender.send_if_modified(|current| {
        if *current == snapshot {
            return false;
        }
        *current = snapshot;
        true
    });
}
