/*
 *  frame.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raw RGB frame buffers and panel geometry
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

use serde::{Deserialize, Serialize};

/// Bytes per pixel - one each for R, G and B
pub const BYTES_PER_PIXEL: usize = 3;

/// Fill byte of the frame pushed when the panel comes up
pub const TEST_FRAME_FILL: u8 = 0x11;

/// Panel dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub rows: u32,
    pub cols: u32,
}

impl FrameGeometry {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Number of bytes in one frame, `rows * cols * 3`
    pub fn frame_len(&self) -> usize {
        self.rows as usize * self.cols as usize * BYTES_PER_PIXEL
    }

    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

/// One full panel image as raw RGB triplets, row-major.
///
/// Frames are moved from the producer through the queue to the delivery
/// thread and never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// A frame with every channel byte set to `value`
    pub fn filled(geometry: FrameGeometry, value: u8) -> Self {
        Self { data: vec![value; geometry.frame_len()] }
    }

    /// All pixels off
    pub fn blank(geometry: FrameGeometry) -> Self {
        Self::filled(geometry, 0)
    }

    /// The frame shown while the panel starts up
    pub fn test_pattern(geometry: FrameGeometry) -> Self {
        Self::filled(geometry, TEST_FRAME_FILL)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
