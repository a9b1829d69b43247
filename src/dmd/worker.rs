/*
 *  dmd/worker.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Delivery thread - drains the frame queue into an output sink
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! One thread per device pops frames with a timeout and hands each to the
//! sink. The timeout lets the thread notice the shared stop signal without
//! ever being cancelled in the middle of a panel update.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, error, info};

use crate::dmd::error::DmdError;
use crate::dmd::queue::{FrameReceiver, Popped};
use crate::dmd::traits::BoxedSink;
use crate::frame::Frame;

/// How long a pop waits before the stop signal is checked again
pub const POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Sink shared between the delivery thread and its owner
pub type SharedSink = Arc<Mutex<BoxedSink>>;

/// Lock the sink, recovering it if a previous holder panicked
pub fn lock_sink(sink: &SharedSink) -> MutexGuard<'_, BoxedSink> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cooperative stop flag, set by the application and read by the worker
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Lifecycle of the delivery thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Starting = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug, Clone)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }
}

// Marks the worker Stopped however the thread exits, unwinding included
struct StoppedOnExit(SharedState);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        self.0.set(WorkerState::Stopped);
    }
}

/// Handle to a running delivery thread
pub struct DeliveryWorker {
    state: SharedState,
    delivered: Arc<AtomicU64>,
    join: Option<JoinHandle<Result<(), DmdError>>>,
}

struct WorkerArgs {
    sink: SharedSink,
    frames: FrameReceiver,
    stop: StopSignal,
    pop_timeout: Duration,
    state: SharedState,
    delivered: Arc<AtomicU64>,
    startup_tx: Sender<Result<(), DmdError>>,
}

impl DeliveryWorker {
    /// Spawn the delivery thread and wait until the sink is open.
    ///
    /// An error opening the sink or showing the startup frame is returned
    /// here, on the caller's thread, and the worker is already gone.
    pub fn spawn(
        name: &str,
        sink: SharedSink,
        frames: FrameReceiver,
        stop: StopSignal,
        pop_timeout: Duration,
    ) -> Result<Self, DmdError> {
        let state = SharedState(Arc::new(AtomicU8::new(WorkerState::Starting as u8)));
        let delivered = Arc::new(AtomicU64::new(0));
        let (startup_tx, startup_rx) = crossbeam_channel::bounded(1);

        let args = WorkerArgs {
            sink,
            frames,
            stop,
            pop_timeout,
            state: state.clone(),
            delivered: Arc::clone(&delivered),
            startup_tx,
        };

        let join = std::thread::Builder::new()
            .name(format!("rgbdmd-{name}"))
            .spawn(move || delivery_main(args))?;

        match startup_rx.recv() {
            Ok(Ok(())) => Ok(Self { state, delivered, join: Some(join) }),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            // thread died before it could report
            Err(_) => {
                let _ = join.join();
                Err(DmdError::WorkerPanicked)
            }
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Frames handed to the sink since startup, the startup frame excluded
    pub fn frames_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Wait for the thread to exit and collect its result.
    ///
    /// Only the first call sees the result, later calls return Ok.
    pub fn join(&mut self) -> Result<(), DmdError> {
        match self.join.take() {
            Some(handle) => handle.join().unwrap_or(Err(DmdError::WorkerPanicked)),
            None => Ok(()),
        }
    }
}

/// Entry point for the delivery thread.
fn delivery_main(args: WorkerArgs) -> Result<(), DmdError> {
    let WorkerArgs {
        sink,
        frames,
        stop,
        pop_timeout,
        state,
        delivered,
        startup_tx,
    } = args;
    let _stopped = StoppedOnExit(state.clone());

    state.set(WorkerState::Starting);
    let startup = {
        let mut sink = lock_sink(&sink);
        let test_frame = Frame::test_pattern(sink.geometry());
        sink.open().and_then(|_| sink.update(&test_frame))
    };
    if let Err(e) = startup {
        error!("DMD startup failed: {}", e);
        lock_sink(&sink).stop();
        let _ = startup_tx.send(Err(e));
        return Ok(());
    }
    let _ = startup_tx.send(Ok(()));

    state.set(WorkerState::Running);
    info!("DMD delivery thread running ({})", lock_sink(&sink).name());

    let result = loop {
        if stop.is_set() {
            break Ok(());
        }
        match frames.pop(pop_timeout) {
            Popped::Frame(frame) => {
                if let Err(e) = lock_sink(&sink).update(&frame) {
                    error!("DMD update failed, delivery thread exiting: {}", e);
                    break Err(e);
                }
                delivered.fetch_add(1, Ordering::AcqRel);
            }
            Popped::Empty => {
                if stop.is_set() {
                    info!("Stopping DMD delivery thread");
                    break Ok(());
                }
            }
            Popped::Closed => {
                debug!("all frame producers gone");
                break Ok(());
            }
        }
    };

    state.set(WorkerState::Stopping);
    lock_sink(&sink).stop();
    info!("DMD delivery thread stopped after {} frames", delivered.load(Ordering::Acquire));
    result
}
