/*
 *  dmd/matrix/ffi.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  C ABI of librgbmatrix (led-matrix-c.h)
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

//! Layouts mirror `struct RGBLedMatrixOptions` and
//! `struct RGBLedRuntimeOptions` from the library's C header. A zero or
//! null field tells the library to keep its default.

use std::ffi::{CString, c_char};
use std::os::raw::{c_int, c_uint};
use std::ptr;

use crate::config::ConfigError;
use crate::dmd::matrix::options::MatrixOptions;

/// Opaque matrix handle
#[repr(C)]
pub struct RGBLedMatrix {
    _private: [u8; 0],
}

/// Opaque canvas handle
#[repr(C)]
pub struct LedCanvas {
    _private: [u8; 0],
}

// bitfield word following panel_type
pub const FLAG_DISABLE_HARDWARE_PULSING: c_uint = 1 << 0;
pub const FLAG_SHOW_REFRESH_RATE: c_uint = 1 << 1;
pub const FLAG_INVERSE_COLORS: c_uint = 1 << 2;

#[repr(C)]
#[derive(Debug)]
pub struct RGBLedMatrixOptions {
    pub hardware_mapping: *const c_char,
    pub rows: c_int,
    pub cols: c_int,
    pub chain_length: c_int,
    pub parallel: c_int,
    pub pwm_bits: c_int,
    pub pwm_lsb_nanoseconds: c_int,
    pub pwm_dither_bits: c_int,
    pub brightness: c_int,
    pub scan_mode: c_int,
    pub row_address_type: c_int,
    pub multiplexing: c_int,
    pub led_rgb_sequence: *const c_char,
    pub pixel_mapper_config: *const c_char,
    pub panel_type: *const c_char,
    pub flags: c_uint,
    pub limit_refresh_rate_hz: c_int,
}

#[repr(C)]
#[derive(Debug)]
pub struct RGBLedRuntimeOptions {
    pub gpio_slowdown: c_int,
    /// -1 disabled, 0 default, 1 on
    pub daemon: c_int,
    /// -1 disabled, 0 default, 1 on
    pub drop_privileges: c_int,
    pub do_gpio_init: bool,
    pub drop_priv_user: *const c_char,
    pub drop_priv_group: *const c_char,
}

pub type CreateFromOptionsFn =
    unsafe extern "C" fn(*mut RGBLedMatrixOptions, *mut RGBLedRuntimeOptions) -> *mut RGBLedMatrix;
pub type MatrixDeleteFn = unsafe extern "C" fn(*mut RGBLedMatrix);
pub type CreateOffscreenCanvasFn = unsafe extern "C" fn(*mut RGBLedMatrix) -> *mut LedCanvas;
pub type SwapOnVsyncFn = unsafe extern "C" fn(*mut RGBLedMatrix, *mut LedCanvas) -> *mut LedCanvas;
pub type SetBrightnessFn = unsafe extern "C" fn(*mut RGBLedMatrix, u8);
pub type GetBrightnessFn = unsafe extern "C" fn(*mut RGBLedMatrix) -> u8;
pub type CanvasSizeFn = unsafe extern "C" fn(*const LedCanvas, *mut c_int, *mut c_int);
pub type SetPixelFn = unsafe extern "C" fn(*mut LedCanvas, c_int, c_int, u8, u8, u8);
pub type CanvasClearFn = unsafe extern "C" fn(*mut LedCanvas);

/// Option structs plus the strings they point into.
///
/// The pointers stay valid for as long as this value lives; moving it is
/// fine since the `CString` buffers are on the heap.
#[derive(Debug)]
pub struct FfiOptions {
    pub matrix: RGBLedMatrixOptions,
    pub runtime: RGBLedRuntimeOptions,
    _strings: Vec<CString>,
}

impl FfiOptions {
    pub fn new(options: &MatrixOptions) -> Result<Self, ConfigError> {
        let mut strings = Vec::new();
        let mut c_str = |key: &str, value: &Option<String>| -> Result<*const c_char, ConfigError> {
            match value {
                None => Ok(ptr::null()),
                Some(s) => {
                    let owned = CString::new(s.as_str()).map_err(|_| ConfigError::RejectedOption {
                        key: key.to_string(),
                        value: s.escape_debug().to_string(),
                    })?;
                    let p = owned.as_ptr();
                    strings.push(owned);
                    Ok(p)
                }
            }
        };

        let hardware_mapping = c_str("hardware_mapping", &options.hardware_mapping)?;
        let led_rgb_sequence = c_str("led_rgb_sequence", &options.led_rgb_sequence)?;
        let pixel_mapper_config = c_str("pixel_mapper_config", &options.pixel_mapper_config)?;
        let panel_type = c_str("panel_type", &options.panel_type)?;

        let mut flags = 0;
        if options.disable_hardware_pulsing == Some(true) {
            flags |= FLAG_DISABLE_HARDWARE_PULSING;
        }
        if options.show_refresh_rate == Some(true) {
            flags |= FLAG_SHOW_REFRESH_RATE;
        }
        if options.inverse_colors == Some(true) {
            flags |= FLAG_INVERSE_COLORS;
        }

        let int = |v: Option<i32>| v.unwrap_or(0) as c_int;

        Ok(Self {
            matrix: RGBLedMatrixOptions {
                hardware_mapping,
                rows: int(options.rows),
                cols: int(options.cols),
                chain_length: int(options.chain_length),
                parallel: int(options.parallel),
                pwm_bits: int(options.pwm_bits),
                pwm_lsb_nanoseconds: int(options.pwm_lsb_nanoseconds),
                pwm_dither_bits: int(options.pwm_dither_bits),
                brightness: int(options.brightness),
                scan_mode: int(options.scan_mode),
                row_address_type: int(options.row_address_type),
                multiplexing: int(options.multiplexing),
                led_rgb_sequence,
                pixel_mapper_config,
                panel_type,
                flags,
                limit_refresh_rate_hz: int(options.limit_refresh_rate_hz),
            },
            runtime: RGBLedRuntimeOptions {
                gpio_slowdown: int(options.gpio_slowdown),
                daemon: tristate(options.daemon),
                drop_privileges: tristate(options.drop_privileges),
                do_gpio_init: true,
                drop_priv_user: ptr::null(),
                drop_priv_group: ptr::null(),
            },
            _strings: strings,
        })
    }
}

// 0 keeps the library default, so an explicit "off" has to be -1
fn tristate(value: Option<bool>) -> c_int {
    match value {
        None => 0,
        Some(true) => 1,
        Some(false) => -1,
    }
}
