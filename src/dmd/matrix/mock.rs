/*
 *  dmd/matrix/mock.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Recording matrix driver for tests
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

use super::image::PanelImage;
use super::options::MatrixOptions;
use super::{MatrixDriver, MatrixPanel};
use crate::dmd::error::DmdError;
use crate::frame::Frame;

/// What the mock panels saw
#[derive(Debug, Default)]
pub struct MockMatrixState {
    pub panels_created: usize,
    pub panels_dropped: usize,
    pub last_options: Option<MatrixOptions>,
    pub images: Vec<Frame>,
    pub clears: usize,
    pub brightness: Vec<u8>,
    pub fail_create: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockMatrixDriver {
    state: Arc<Mutex<MockMatrixState>>,
}

impl MockMatrixDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<MockMatrixState>> {
        Arc::clone(&self.state)
    }
}

impl MatrixDriver for MockMatrixDriver {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    fn create_panel(&self, options: &MatrixOptions) -> Result<Box<dyn MatrixPanel>, DmdError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(DmdError::InitializationFailed("Simulated panel failure".to_string()));
        }
        state.panels_created += 1;
        state.last_options = Some(options.clone());
        Ok(Box::new(MockPanel {
            size: (options.cols.unwrap_or(32) as u32, options.rows.unwrap_or(32) as u32),
            // like librgbmatrix, 0 in the options means "use the default"
            brightness: options.brightness.filter(|&b| b > 0).unwrap_or(100) as u8,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockPanel {
    size: (u32, u32),
    brightness: u8,
    state: Arc<Mutex<MockMatrixState>>,
}

impl MatrixPanel for MockPanel {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_image(&mut self, image: &PanelImage) {
        self.state.lock().unwrap().images.push(image.to_frame());
    }

    fn clear(&mut self) {
        self.state.lock().unwrap().clears += 1;
    }

    fn set_brightness(&mut self, percent: u8) {
        self.brightness = percent;
        self.state.lock().unwrap().brightness.push(percent);
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }
}

impl Drop for MockPanel {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.panels_dropped += 1;
        }
    }
}
