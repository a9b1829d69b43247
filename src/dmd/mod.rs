/*
 *  dmd/mod.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  DMD subsystem - frame queue, delivery thread and output sinks
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod queue;
pub mod worker;

// Native matrix driver (loader gated on the hardware feature)
pub mod matrix;

// Sink implementations
pub mod sinks;
pub mod factory;

// Device and platform
pub mod device;
pub mod platform;

// Re-exports for convenience
pub use traits::{OutputSink, SinkCapabilities, BoxedSink};
pub use error::DmdError;
pub use queue::{frame_queue, FrameSender, FrameReceiver, Popped};
pub use worker::{DeliveryWorker, StopSignal, WorkerState, POP_TIMEOUT};
pub use matrix::{MatrixDriver, MatrixPanel, MatrixOptions, PanelImage};
pub use sinks::{HardwareSink, SocketSink};
pub use factory::SinkFactory;
pub use device::Device;
pub use platform::DmdPlatform;
