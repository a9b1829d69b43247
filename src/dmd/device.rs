/*
 *  dmd/device.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  A configured DMD: frame queue, delivery thread and sink
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

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::config::DmdConfig;
use crate::dmd::error::DmdError;
use crate::dmd::queue::{frame_queue, FrameSender};
use crate::dmd::traits::BoxedSink;
use crate::dmd::worker::{lock_sink, DeliveryWorker, SharedSink, StopSignal, WorkerState, POP_TIMEOUT};
use crate::frame::{Frame, FrameGeometry};

/// A running DMD.
///
/// Frames pushed here are shown in order by the delivery thread. Dropping
/// the device stops it, so the panel is blanked on every exit path that
/// unwinds.
pub struct Device {
    name: String,
    config: DmdConfig,
    frames: FrameSender,
    sink: SharedSink,
    stop: StopSignal,
    worker: DeliveryWorker,
    stopped: bool,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.worker.state())
            .finish()
    }
}

impl Device {
    /// Start the delivery thread for `sink`.
    ///
    /// Returns once the sink is open and the startup frame is on the panel.
    /// `stop` is shared with the application, setting it winds the device
    /// down just like [`Device::stop`].
    pub fn configure(
        name: &str,
        config: &DmdConfig,
        sink: BoxedSink,
        stop: StopSignal,
    ) -> Result<Self, DmdError> {
        Self::configure_with_timeout(name, config, sink, stop, POP_TIMEOUT)
    }

    pub fn configure_with_timeout(
        name: &str,
        config: &DmdConfig,
        sink: BoxedSink,
        stop: StopSignal,
        pop_timeout: Duration,
    ) -> Result<Self, DmdError> {
        let sink_geometry = sink.geometry();
        if sink_geometry != config.geometry {
            return Err(DmdError::InitializationFailed(format!(
                "sink is {}x{}, config says {}x{}",
                sink_geometry.cols, sink_geometry.rows, config.geometry.cols, config.geometry.rows
            )));
        }

        let (frames, receiver) = frame_queue(config.geometry);
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let worker = DeliveryWorker::spawn(name, Arc::clone(&sink), receiver, stop.clone(), pop_timeout)?;
        info!("DMD '{}' configured: {}x{} on {}", name, config.geometry.cols, config.geometry.rows, config.kind().schema());

        Ok(Self {
            name: name.to_string(),
            config: config.clone(),
            frames,
            sink,
            stop,
            worker,
            stopped: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DmdConfig {
        &self.config
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.config.geometry
    }

    /// Queue a frame for display. Never blocks.
    pub fn update(&self, frame: Frame) -> Result<(), DmdError> {
        self.frames.push(frame)
    }

    /// Producer handle for other threads or tasks
    pub fn sender(&self) -> FrameSender {
        self.frames.clone()
    }

    /// Set brightness, 0.0 ..= 1.0; ignored by sinks without brightness
    pub fn set_brightness(&self, value: f32) -> Result<(), DmdError> {
        lock_sink(&self.sink).set_brightness(value)
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn frames_delivered(&self) -> u64 {
        self.worker.frames_delivered()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Wait until every frame queued so far has reached the sink.
    ///
    /// Returns false if the delivery thread ends first or `timeout` passes.
    pub fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let queued = self.frames.pushed();
            if self.frames_delivered() >= queued {
                debug!("DMD '{}' drained {} frames", self.name, queued);
                return true;
            }
            if self.worker.is_finished() {
                warn!("DMD '{}' delivery thread ended with frames still queued", self.name);
                return false;
            }
            if Instant::now() >= deadline {
                warn!(
                    "DMD '{}' still has {} frames queued after {:?}",
                    self.name,
                    queued.saturating_sub(self.frames_delivered()),
                    timeout
                );
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Stop the delivery thread and blank the output.
    ///
    /// Frames still queued are discarded. Safe to call more than once; only
    /// the first call reports how the thread ended.
    pub fn stop(&mut self) -> Result<(), DmdError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.stop.set();

        let result = self.worker.join();
        if let Err(e) = &result {
            error!("DMD '{}' delivery thread ended with: {}", self.name, e);
        }
        if matches!(result, Err(DmdError::WorkerPanicked)) {
            // the thread never reached its own stop
            lock_sink(&self.sink).stop();
        }
        debug!("DMD '{}' stopped after {} frames", self.name, self.frames_delivered());
        result
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
