/*
 *  dmd/matrix/native.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  A running librgbmatrix panel
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

use std::os::raw::c_int;
use std::sync::Arc;

use embedded_graphics::pixelcolor::RgbColor;
use log::{info, warn};

use super::ffi::{FfiOptions, LedCanvas, RGBLedMatrix};
use super::image::PanelImage;
use super::loader::LoadedLibrary;
use super::options::MatrixOptions;
use super::MatrixPanel;
use crate::dmd::error::DmdError;

/// Matrix created through the C API, drawn via an offscreen canvas that is
/// swapped in on vsync so a frame never shows half-written.
pub struct NativePanel {
    lib: Arc<LoadedLibrary>,
    matrix: *mut RGBLedMatrix,
    offscreen: *mut LedCanvas,
    width: u32,
    height: u32,
}

impl NativePanel {
    pub(crate) fn create(lib: Arc<LoadedLibrary>, options: &MatrixOptions) -> Result<Self, DmdError> {
        // SAFETY: geteuid has no preconditions
        if unsafe { libc::geteuid() } != 0 {
            warn!("not running as root, GPIO access may fail");
        }

        let mut ffi = FfiOptions::new(options)?;
        let api = lib.api;

        // SAFETY: both option structs and their strings outlive the call
        let matrix = unsafe { (api.create)(&mut ffi.matrix, &mut ffi.runtime) };
        if matrix.is_null() {
            return Err(DmdError::InitializationFailed(format!(
                "librgbmatrix rejected the panel options {:?}",
                options
            )));
        }

        // SAFETY: matrix is a live handle from create
        let offscreen = unsafe { (api.create_offscreen_canvas)(matrix) };
        if offscreen.is_null() {
            unsafe { (api.delete)(matrix) };
            return Err(DmdError::InitializationFailed("no offscreen canvas".to_string()));
        }

        let (mut w, mut h): (c_int, c_int) = (0, 0);
        unsafe { (api.canvas_size)(offscreen, &mut w, &mut h) };
        info!("Matrix panel up: {}x{}", w, h);

        Ok(Self {
            lib,
            matrix,
            offscreen,
            width: w.max(0) as u32,
            height: h.max(0) as u32,
        })
    }
}

impl MatrixPanel for NativePanel {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_image(&mut self, image: &PanelImage) {
        let api = self.lib.api;
        let w = self.width.min(image.width());
        let h = self.height.min(image.height());
        for y in 0..h {
            for x in 0..w {
                if let Some(px) = image.pixel(x, y) {
                    // SAFETY: offscreen belongs to self.matrix, coordinates are on-panel
                    unsafe {
                        (api.set_pixel)(self.offscreen, x as c_int, y as c_int, px.r(), px.g(), px.b())
                    };
                }
            }
        }
        // the previously shown canvas comes back as the next offscreen
        self.offscreen = unsafe { (api.swap_on_vsync)(self.matrix, self.offscreen) };
    }

    fn clear(&mut self) {
        let api = self.lib.api;
        unsafe {
            (api.clear)(self.offscreen);
            self.offscreen = (api.swap_on_vsync)(self.matrix, self.offscreen);
        }
    }

    fn set_brightness(&mut self, percent: u8) {
        unsafe { (self.lib.api.set_brightness)(self.matrix, percent.min(100)) };
    }

    fn brightness(&self) -> u8 {
        unsafe { (self.lib.api.get_brightness)(self.matrix) }
    }
}

impl Drop for NativePanel {
    fn drop(&mut self) {
        // also frees every canvas and stops the refresh thread
        unsafe { (self.lib.api.delete)(self.matrix) };
    }
}

// SAFETY: the handles are only touched through &mut self or &self by the one
// thread that currently owns the panel; librgbmatrix's own refresh thread
// synchronises canvas swaps internally.
unsafe impl Send for NativePanel {}
