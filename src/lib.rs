/*
 *  lib.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Forward raw RGB frames to an RGB dot-matrix display
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

//! Frames of `rows * cols * 3` bytes are queued by the application and shown
//! in order by a delivery thread, either on a panel driven by
//! rpi-rgb-led-matrix or as datagrams to an external renderer.

pub mod config;
pub mod frame;
pub mod dmd;
pub mod pattern;
pub mod source;

pub use config::{Config, ConfigError, DmdConfig, PlatformKind, SinkConfig};
pub use frame::{Frame, FrameGeometry};
pub use dmd::{Device, DmdError, DmdPlatform, StopSignal};
