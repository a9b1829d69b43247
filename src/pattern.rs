/*
 *  pattern.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Animated test pattern for panel bring-up
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

use embedded_graphics::{
    mono_font::{ascii::FONT_5X8, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};

use crate::dmd::matrix::PanelImage;
use crate::frame::{Frame, FrameGeometry};

const BARS: [Rgb888; 8] = [
    Rgb888::WHITE,
    Rgb888::YELLOW,
    Rgb888::CYAN,
    Rgb888::GREEN,
    Rgb888::MAGENTA,
    Rgb888::RED,
    Rgb888::BLUE,
    Rgb888::BLACK,
];

/// Color bars with a sweeping column and a frame counter
pub struct TestPattern {
    image: PanelImage,
    tick: u64,
}

impl TestPattern {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { image: PanelImage::new(geometry), tick: 0 }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Render the next frame
    pub fn next_frame(&mut self) -> Frame {
        self.draw();
        self.tick = self.tick.wrapping_add(1);
        self.image.to_frame()
    }

    fn draw(&mut self) {
        let Size { width, height } = self.image.size();
        if width == 0 || height == 0 {
            return;
        }
        let image = &mut self.image;
        image.fill(Rgb888::BLACK);

        let bar_w = (width / BARS.len() as u32).max(1);
        for (i, color) in BARS.iter().enumerate() {
            let x = i as i32 * bar_w as i32;
            Rectangle::new(Point::new(x, 0), Size::new(bar_w, height))
                .into_styled(PrimitiveStyle::with_fill(*color))
                .draw(image)
                .ok();
        }

        // sweep column, inverted against the bars
        let x = (self.tick % width as u64) as i32;
        Line::new(Point::new(x, 0), Point::new(x, height as i32 - 1))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::new(0xff, 0x80, 0x00), 1))
            .draw(image)
            .ok();

        if height >= 8 {
            let label = format!("{}", self.tick % 10_000);
            let style = MonoTextStyle::new(&FONT_5X8, Rgb888::WHITE);
            let bg = Rectangle::new(Point::new(0, height as i32 - 8), Size::new(label.len() as u32 * 5 + 1, 8));
            bg.into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK)).draw(image).ok();
            Text::with_baseline(&label, Point::new(1, height as i32 - 8), style, Baseline::Top)
                .draw(image)
                .ok();
        }
    }
}
