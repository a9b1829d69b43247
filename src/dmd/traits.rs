/*
 *  dmd/traits.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Output sink abstraction shared by the hardware and socket variants
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

use crate::dmd::error::DmdError;
use crate::frame::{Frame, FrameGeometry};

/// What a sink can do, reported once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkCapabilities {
    /// Frame dimensions the sink expects
    pub geometry: FrameGeometry,

    /// Whether set_brightness has a visible effect
    pub supports_brightness: bool,
}

/// Destination of decoded frames - all sinks must implement this trait
///
/// A sink is configured when it is built, opened once by the delivery
/// thread, fed frames, and stopped once on the way out. `stop` may be called
/// again by the owning device's drop path and must be a no-op the second time.
pub trait OutputSink: Send {
    /// Short name for logging
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> &SinkCapabilities;

    fn geometry(&self) -> FrameGeometry {
        self.capabilities().geometry
    }

    /// Acquire the output (create the matrix, bind the socket)
    fn open(&mut self) -> Result<(), DmdError>;

    /// Show one frame
    fn update(&mut self, frame: &Frame) -> Result<(), DmdError>;

    /// Set brightness, `value` in 0.0 ..= 1.0
    ///
    /// Sinks without brightness control accept and ignore the value.
    fn set_brightness(&mut self, value: f32) -> Result<(), DmdError>;

    /// Blank the output and release it. Best-effort, never fails.
    fn stop(&mut self);
}

/// Type alias for boxed sink trait objects
pub type BoxedSink = Box<dyn OutputSink>;
