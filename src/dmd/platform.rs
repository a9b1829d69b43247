/*
 *  dmd/platform.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Platform entry point - hands out the one DMD device
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

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

use crate::config::{DmdConfig, PlatformKind};
use crate::dmd::device::Device;
use crate::dmd::error::DmdError;
use crate::dmd::factory::SinkFactory;
use crate::dmd::matrix::MatrixDriver;
use crate::dmd::worker::StopSignal;

/// Owns the validated configuration and, once requested, the device.
///
/// The matrix library is checked when the platform is built so a missing
/// install is reported before anything touches the panel.
pub struct DmdPlatform {
    config: DmdConfig,
    stop: StopSignal,
    driver: Option<Arc<dyn MatrixDriver>>,
    device: Option<Device>,
}

impl DmdPlatform {
    pub fn new(config: DmdConfig, stop: StopSignal) -> Result<Self, DmdError> {
        Self::resolve(config, stop, SinkFactory::matrix_driver)
    }

    /// Like [`DmdPlatform::new`], looking for the matrix library in
    /// `search_paths` and, if `system_loader` is set, through the system loader
    pub fn with_library_search(
        config: DmdConfig,
        stop: StopSignal,
        search_paths: &[PathBuf],
        system_loader: bool,
    ) -> Result<Self, DmdError> {
        Self::resolve(config, stop, || SinkFactory::matrix_driver_in(search_paths, system_loader))
    }

    fn resolve<F>(config: DmdConfig, stop: StopSignal, load: F) -> Result<Self, DmdError>
    where
        F: FnOnce() -> Result<Arc<dyn MatrixDriver>, DmdError>,
    {
        let driver = match config.kind() {
            PlatformKind::RpiDmd => Some(load()?),
            PlatformKind::SocketDmd => None,
        };
        Ok(Self::with_driver(config, stop, driver))
    }

    /// Build with a given matrix driver instead of loading the library
    pub fn with_driver(config: DmdConfig, stop: StopSignal, driver: Option<Arc<dyn MatrixDriver>>) -> Self {
        debug!("{} platform initialised", config.kind().schema());
        Self { config, stop, driver, device: None }
    }

    pub fn kind(&self) -> PlatformKind {
        self.config.kind()
    }

    pub fn config(&self) -> &DmdConfig {
        &self.config
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// The device, creating it on first call.
    ///
    /// Later calls return the same device whatever `name` they pass.
    pub fn configure_rgb_dmd(&mut self, name: &str) -> Result<&Device, DmdError> {
        if self.device.is_none() {
            let sink = SinkFactory::create(&self.config, self.driver.clone())?;
            let device = Device::configure(name, &self.config, sink, self.stop.clone())?;
            info!("{} configured RGB DMD '{}'", self, name);
            self.device = Some(device);
        }
        self.device.as_ref().ok_or(DmdError::WorkerStopped)
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    /// Stop the device if one was created. Idempotent.
    pub fn stop(&mut self) -> Result<(), DmdError> {
        self.stop.set();
        match self.device.as_mut() {
            Some(device) => device.stop(),
            None => Ok(()),
        }
    }
}

impl fmt::Display for DmdPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            PlatformKind::RpiDmd => write!(f, "<Platform.RpiDmd>"),
            PlatformKind::SocketDmd => write!(f, "<Platform.SocketDmd>"),
        }
    }
}

impl Drop for DmdPlatform {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkConfig;
    use crate::dmd::matrix::mock::MockMatrixDriver;
    use crate::dmd::matrix::MatrixOptions;
    use crate::dmd::worker::WorkerState;
    use crate::frame::FrameGeometry;

    const GEOMETRY: FrameGeometry = FrameGeometry { rows: 4, cols: 8 };

    fn hardware_config() -> DmdConfig {
        let options = MatrixOptions { rows: Some(4), cols: Some(8), ..Default::default() };
        DmdConfig { geometry: GEOMETRY, sink: SinkConfig::Hardware(options) }
    }

    fn hardware_platform(driver: &MockMatrixDriver) -> DmdPlatform {
        DmdPlatform::with_driver(hardware_config(), StopSignal::new(), Some(Arc::new(driver.clone())))
    }

    #[test]
    fn test_display_names() {
        let driver = MockMatrixDriver::new();
        assert_eq!(hardware_platform(&driver).to_string(), "<Platform.RpiDmd>");

        let config = DmdConfig {
            geometry: GEOMETRY,
            sink: SinkConfig::Socket { dmd_socket: PathBuf::from("/unused") },
        };
        let platform = DmdPlatform::new(config, StopSignal::new()).unwrap();
        assert_eq!(platform.to_string(), "<Platform.SocketDmd>");
    }

    #[test]
    fn test_device_created_once() {
        let driver = MockMatrixDriver::new();
        let mut platform = hardware_platform(&driver);
        assert!(platform.device().is_none());

        platform.configure_rgb_dmd("dmd").unwrap();
        platform.configure_rgb_dmd("other").unwrap();
        assert_eq!(platform.device().map(|d| d.name()), Some("dmd"));
        assert_eq!(driver.state().lock().unwrap().panels_created, 1);

        // the startup frame went out on creation
        assert_eq!(driver.state().lock().unwrap().images.len(), 1);
    }

    #[test]
    fn test_stop_clears_panel_once() {
        let driver = MockMatrixDriver::new();
        let mut platform = hardware_platform(&driver);
        platform.configure_rgb_dmd("dmd").unwrap();

        platform.stop().unwrap();
        platform.stop().unwrap();
        assert_eq!(platform.device().map(|d| d.state()), Some(WorkerState::Stopped));
        drop(platform);

        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.clears, 1);
        assert_eq!(state.panels_dropped, 1);
    }

    #[test]
    fn test_panel_failure_surfaces_on_configure() {
        let driver = MockMatrixDriver::new();
        driver.state().lock().unwrap().fail_create = true;
        let mut platform = hardware_platform(&driver);

        assert!(platform.configure_rgb_dmd("dmd").is_err());
        assert!(platform.device().is_none());
    }

    #[test]
    fn test_stop_without_device() {
        let driver = MockMatrixDriver::new();
        let mut platform = hardware_platform(&driver);
        assert!(platform.stop().is_ok());
        assert!(platform.stop_signal().is_set());
    }

    #[cfg(feature = "hardware")]
    #[test]
    fn test_missing_library_fails_before_any_device() {
        let dir = tempfile::tempdir().unwrap();
        let stop = StopSignal::new();

        match DmdPlatform::with_library_search(hardware_config(), stop.clone(), &[dir.path().to_path_buf()], false) {
            Err(DmdError::LibraryMissing { searched }) => {
                assert_eq!(searched, vec![
                    dir.path().join("librgbmatrix.so.1"),
                    dir.path().join("librgbmatrix.so"),
                ]);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(platform) => panic!("platform built without a library: {}", platform),
        }
        // nothing was started, so nothing needed stopping
        assert!(!stop.is_set());
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_rpi_dmd_needs_hardware_feature() {
        let dir = tempfile::tempdir().unwrap();
        let result = DmdPlatform::with_library_search(hardware_config(), StopSignal::new(), &[dir.path().to_path_buf()], false);
        assert!(matches!(result, Err(DmdError::UnsupportedSink(_))));
    }

    #[test]
    fn test_socket_platform_skips_library_search() {
        let config = DmdConfig {
            geometry: GEOMETRY,
            sink: SinkConfig::Socket { dmd_socket: PathBuf::from("/unused") },
        };
        let platform = DmdPlatform::with_library_search(config, StopSignal::new(), &[], false).unwrap();
        assert!(platform.device().is_none());
    }
}
