/*
 *  dmd/matrix/image.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized RGB888 panel image
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::dmd::error::DmdError;
use crate::frame::{Frame, FrameGeometry, BYTES_PER_PIXEL};

/// The driver-side image: one `Rgb888` per pixel, row-major.
///
/// Raw frames are copied in with [`PanelImage::copy_from_bytes`]; it is also
/// an embedded-graphics draw target so test patterns can be rendered
/// straight into it.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelImage {
    pixels: Vec<Rgb888>,
    geometry: FrameGeometry,
}

impl PanelImage {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            pixels: vec![Rgb888::BLACK; geometry.pixel_count()],
            geometry,
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn width(&self) -> u32 { self.geometry.cols }
    pub fn height(&self) -> u32 { self.geometry.rows }

    /// Pixel at (x, y), None outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixels.get((y * self.width() + x) as usize).copied()
    }

    /// Replace the whole image with a raw RGB frame
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> Result<(), DmdError> {
        let expected = self.geometry.frame_len();
        if bytes.len() != expected {
            return Err(DmdError::BufferSizeMismatch { expected, actual: bytes.len() });
        }
        for (px, rgb) in self.pixels.iter_mut().zip(bytes.chunks_exact(BYTES_PER_PIXEL)) {
            *px = Rgb888::new(rgb[0], rgb[1], rgb[2]);
        }
        Ok(())
    }

    /// Flatten back into a raw frame
    pub fn to_frame(&self) -> Frame {
        let mut bytes = Vec::with_capacity(self.geometry.frame_len());
        for px in &self.pixels {
            bytes.extend_from_slice(&[px.r(), px.g(), px.b()]);
        }
        Frame::from_vec(bytes)
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        let (w, h) = (self.width() as i32, self.height() as i32);
        if p.x >= 0 && p.y >= 0 && p.x < w && p.y < h {
            Some((p.y * w + p.x) as usize)
        } else {
            None
        }
    }
}

impl OriginDimensions for PanelImage {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for PanelImage {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.index(p) {
                self.pixels[i] = c;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // clip once, then fill row spans
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };
        let w = self.width() as usize;
        for y in area.top_left.y..=bottom_right.y {
            let row = y as usize * w;
            let start = row + area.top_left.x as usize;
            let end = row + bottom_right.x as usize + 1;
            self.pixels[start..end].fill(color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}
