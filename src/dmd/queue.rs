/*
 *  dmd/queue.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame queue between the render path and the delivery thread
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

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::trace;

use crate::dmd::error::DmdError;
use crate::frame::{Frame, FrameGeometry};

/// Poll interval while a producer waits for room in the queue
const ROOM_POLL: Duration = Duration::from_millis(2);

/// Result of a timed pop
#[derive(Debug, PartialEq, Eq)]
pub enum Popped {
    Frame(Frame),
    /// Nothing arrived within the timeout
    Empty,
    /// Every sender has been dropped and the queue is drained
    Closed,
}

/// Producer half. Cheap to clone, one per render path.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<Frame>,
    frame_len: usize,
    pushed: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

/// Consumer half, owned by the delivery thread
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<Frame>,
    closed: Arc<AtomicBool>,
}

/// Create an unbounded FIFO for frames of `geometry`
pub fn frame_queue(geometry: FrameGeometry) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let closed = Arc::new(AtomicBool::new(false));
    (
        FrameSender {
            tx,
            frame_len: geometry.frame_len(),
            pushed: Arc::new(AtomicU64::new(0)),
            closed: Arc::clone(&closed),
        },
        FrameReceiver { rx, closed },
    )
}

impl FrameSender {
    /// Queue a frame without blocking.
    ///
    /// Frames of the wrong length are handed back as an error rather than
    /// reaching the panel.
    pub fn push(&self, frame: Frame) -> Result<(), DmdError> {
        if frame.len() != self.frame_len {
            return Err(DmdError::BufferSizeMismatch {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }
        self.tx.send(frame).map_err(|_| DmdError::WorkerStopped)?;
        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Block until fewer than `limit` frames are waiting.
    ///
    /// For producers that can run ahead of the panel, such as a file or pipe.
    /// Fails once the delivery thread has gone.
    pub fn wait_for_room(&self, limit: usize) -> Result<(), DmdError> {
        let limit = limit.max(1);
        loop {
            if self.is_closed() {
                return Err(DmdError::WorkerStopped);
            }
            if self.tx.len() < limit {
                return Ok(());
            }
            std::thread::sleep(ROOM_POLL);
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Frames waiting for the delivery thread
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Frames accepted so far, across every clone of this sender
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// True once the delivery thread has dropped its end
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl FrameReceiver {
    /// Block up to `timeout` for the next frame
    pub fn pop(&self, timeout: Duration) -> Popped {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Popped::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Popped::Empty,
            Err(RecvTimeoutError::Disconnected) => {
                trace!("frame queue closed");
                Popped::Closed
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}
