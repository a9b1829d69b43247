/*
 *  dmd/sinks/hardware.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  RGB LED matrix sink driven through rpi-rgb-led-matrix
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

use std::sync::Arc;

use log::{debug, info, warn};

use crate::dmd::error::DmdError;
use crate::dmd::matrix::{brightness_percent, MatrixDriver, MatrixOptions, MatrixPanel, PanelImage};
use crate::dmd::traits::{OutputSink, SinkCapabilities};
use crate::frame::{Frame, FrameGeometry};

/// Sink owning one physical matrix.
///
/// The panel is created in `open` on the delivery thread, so the refresh
/// thread the library starts belongs to the same process lifetime as the
/// worker, and released by `stop`.
pub struct HardwareSink {
    driver: Arc<dyn MatrixDriver>,
    options: MatrixOptions,
    panel: Option<Box<dyn MatrixPanel>>,
    image: PanelImage,
    capabilities: SinkCapabilities,
    // brightness to apply once the panel exists; seeded from the options
    // because the library reads a configured 0 as "unset"
    pending_brightness: Option<u8>,
}

impl HardwareSink {
    pub fn new(driver: Arc<dyn MatrixDriver>, options: MatrixOptions, geometry: FrameGeometry) -> Self {
        let pending_brightness = options.brightness.map(|b| b.clamp(0, 100) as u8);
        Self {
            driver,
            options,
            panel: None,
            image: PanelImage::new(geometry),
            capabilities: SinkCapabilities { geometry, supports_brightness: true },
            pending_brightness,
        }
    }

    pub fn options(&self) -> &MatrixOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.panel.is_some()
    }

    /// Current driver brightness, 0 ..= 100
    pub fn brightness(&self) -> Option<u8> {
        self.panel.as_ref().map(|p| p.brightness()).or(self.pending_brightness)
    }
}

impl OutputSink for HardwareSink {
    fn name(&self) -> &'static str {
        "rgb-matrix"
    }

    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn open(&mut self) -> Result<(), DmdError> {
        if self.panel.is_some() {
            return Ok(());
        }
        debug!("Creating matrix panel via {}", self.driver.describe());
        let mut panel = self.driver.create_panel(&self.options)?;

        let (w, h) = panel.size();
        let geometry = self.capabilities.geometry;
        if w != geometry.cols || h != geometry.rows {
            warn!(
                "panel reports {}x{} but frames are {}x{}, extra pixels are clipped",
                w, h, geometry.cols, geometry.rows
            );
        }
        if let Some(percent) = self.pending_brightness.take() {
            panel.set_brightness(percent);
        }
        info!("RGB matrix open: {}x{}, brightness {}", w, h, panel.brightness());

        self.panel = Some(panel);
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<(), DmdError> {
        let Some(panel) = self.panel.as_mut() else {
            return Err(DmdError::InitializationFailed("matrix panel is not open".to_string()));
        };
        self.image.copy_from_bytes(frame.as_bytes())?;
        panel.set_image(&self.image);
        Ok(())
    }

    fn set_brightness(&mut self, value: f32) -> Result<(), DmdError> {
        let percent = brightness_percent(value);
        match self.panel.as_mut() {
            Some(panel) => panel.set_brightness(percent),
            None => self.pending_brightness = Some(percent),
        }
        debug!("matrix brightness {} -> {}", value, percent);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut panel) = self.panel.take() {
            panel.clear();
            debug!("RGB matrix cleared");
        }
    }
}

impl Drop for HardwareSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmd::matrix::mock::MockMatrixDriver;

    const GEOMETRY: FrameGeometry = FrameGeometry { rows: 4, cols: 8 };

    fn sink_with(driver: &MockMatrixDriver) -> HardwareSink {
        let options = MatrixOptions { rows: Some(4), cols: Some(8), ..Default::default() };
        HardwareSink::new(Arc::new(driver.clone()), options, GEOMETRY)
    }

    #[test]
    fn test_update_reaches_panel() {
        let driver = MockMatrixDriver::new();
        let mut sink = sink_with(&driver);
        sink.open().unwrap();
        sink.update(&Frame::filled(GEOMETRY, 0x11)).unwrap();

        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.panels_created, 1);
        assert_eq!(state.images, vec![Frame::filled(GEOMETRY, 0x11)]);
        assert_eq!(state.last_options.as_ref().and_then(|o| o.cols), Some(8));
    }

    #[test]
    fn test_brightness_scaled_to_percent() {
        let driver = MockMatrixDriver::new();
        let mut sink = sink_with(&driver);
        sink.open().unwrap();

        for value in [0.0, 0.5, 1.0] {
            sink.set_brightness(value).unwrap();
        }
        assert_eq!(driver.state().lock().unwrap().brightness, vec![0, 50, 100]);
        assert_eq!(sink.brightness(), Some(100));
    }

    #[test]
    fn test_brightness_before_open_is_applied_on_open() {
        let driver = MockMatrixDriver::new();
        let mut sink = sink_with(&driver);
        sink.set_brightness(0.25).unwrap();
        assert!(driver.state().lock().unwrap().brightness.is_empty());

        sink.open().unwrap();
        assert_eq!(driver.state().lock().unwrap().brightness, vec![25]);
    }

    #[test]
    fn test_configured_zero_brightness_applied_after_create() {
        let driver = MockMatrixDriver::new();
        let options = MatrixOptions { rows: Some(4), cols: Some(8), brightness: Some(0), ..Default::default() };
        let mut sink = HardwareSink::new(Arc::new(driver.clone()), options, GEOMETRY);
        assert_eq!(sink.brightness(), Some(0));

        sink.open().unwrap();
        assert_eq!(driver.state().lock().unwrap().brightness, vec![0]);
        assert_eq!(sink.brightness(), Some(0));
    }

    #[test]
    fn test_runtime_brightness_overrides_configured() {
        let driver = MockMatrixDriver::new();
        let options = MatrixOptions { brightness: Some(40), ..Default::default() };
        let mut sink = HardwareSink::new(Arc::new(driver.clone()), options, GEOMETRY);
        sink.set_brightness(0.8).unwrap();

        sink.open().unwrap();
        assert_eq!(driver.state().lock().unwrap().brightness, vec![80]);
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let driver = MockMatrixDriver::new();
        let mut sink = sink_with(&driver);
        sink.open().unwrap();

        let err = sink.update(&Frame::from_vec(vec![0; 10])).unwrap_err();
        assert!(matches!(err, DmdError::BufferSizeMismatch { expected: 96, actual: 10 }));
        assert!(driver.state().lock().unwrap().images.is_empty());
    }

    #[test]
    fn test_update_before_open_fails() {
        let driver = MockMatrixDriver::new();
        let mut sink = sink_with(&driver);
        assert!(sink.update(&Frame::blank(GEOMETRY)).is_err());
    }

    #[test]
    fn test_failed_create_leaves_no_panel() {
        let driver = MockMatrixDriver::new();
        driver.state().lock().unwrap().fail_create = true;
        let mut sink = sink_with(&driver);

        assert!(sink.open().is_err());
        assert!(!sink.is_open());
        sink.stop();
        assert_eq!(driver.state().lock().unwrap().clears, 0);
    }

    #[test]
    fn test_stop_clears_once_and_releases_panel() {
        let driver = MockMatrixDriver::new();
        let mut sink = sink_with(&driver);
        sink.open().unwrap();
        sink.stop();
        sink.stop();
        drop(sink);

        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.clears, 1);
        assert_eq!(state.panels_dropped, 1);
    }
}
