/*
 *  dmd/matrix/mod.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  rpi-rgb-led-matrix driver seam
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

//! The hardware sink talks to the panel through two small traits so the
//! native library can be swapped for a recording double in tests.
//!
//! # Loading
//!
//! `librgbmatrix` is opened at runtime rather than linked, so a build with
//! the `hardware` feature still starts on a machine without the library and
//! can report exactly where it looked.

pub mod image;
pub mod options;

#[cfg(feature = "hardware")]
pub mod ffi;
#[cfg(feature = "hardware")]
pub mod loader;
#[cfg(feature = "hardware")]
pub mod native;

#[cfg(test)]
pub mod mock;

use crate::dmd::error::DmdError;

pub use image::PanelImage;
pub use options::{MatrixOptions, MATRIX_OPTION_KEYS};

#[cfg(feature = "hardware")]
pub use loader::MatrixLibrary;

/// A source of matrix panels, normally the loaded native library
pub trait MatrixDriver: Send + Sync {
    /// Where the driver came from, for logging
    fn describe(&self) -> String;

    /// Create and start a panel with the given options.
    ///
    /// Options the library refuses surface here as an error.
    fn create_panel(&self, options: &MatrixOptions) -> Result<Box<dyn MatrixPanel>, DmdError>;
}

/// One running matrix, exclusively owned by its sink
pub trait MatrixPanel: Send {
    /// (width, height) as reported by the driver
    fn size(&self) -> (u32, u32);

    /// Show a full image, pixels outside the panel are ignored
    fn set_image(&mut self, image: &PanelImage);

    /// Turn every pixel off
    fn clear(&mut self);

    /// Driver brightness, 0 ..= 100
    fn set_brightness(&mut self, percent: u8);

    fn brightness(&self) -> u8;
}

/// Map a 0.0 ..= 1.0 brightness to the driver's 0 ..= 100 scale
pub fn brightness_percent(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brightness_percent() {
        assert_eq!(brightness_percent(0.0), 0);
        assert_eq!(brightness_percent(0.5), 50);
        assert_eq!(brightness_percent(1.0), 100);
        assert_eq!(brightness_percent(0.333), 33);
    }

    #[test]
    fn test_brightness_percent_clamps() {
        assert_eq!(brightness_percent(-0.2), 0);
        assert_eq!(brightness_percent(1.7), 100);
        assert_eq!(brightness_percent(f32::NAN), 0);
    }
}
