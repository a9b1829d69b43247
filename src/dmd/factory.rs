/*
 *  dmd/factory.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the output sink a DMD configuration asks for
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

use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use crate::config::{DmdConfig, SinkConfig};
use crate::dmd::error::DmdError;
use crate::dmd::matrix::MatrixDriver;
use crate::dmd::sinks::{HardwareSink, SocketSink};
use crate::dmd::traits::BoxedSink;

/// Factory for creating output sinks from configuration
pub struct SinkFactory;

impl SinkFactory {
    /// Create a sink from configuration.
    ///
    /// For the hardware sink this locates and loads librgbmatrix first, so a
    /// missing library fails here rather than on the delivery thread.
    pub fn create_from_config(config: &DmdConfig) -> Result<BoxedSink, DmdError> {
        let driver = match config.sink {
            SinkConfig::Hardware(_) => Some(Self::matrix_driver()?),
            SinkConfig::Socket { .. } => None,
        };
        Self::create(config, driver)
    }

    /// Create a sink with an already loaded matrix driver
    pub fn create(
        config: &DmdConfig,
        driver: Option<Arc<dyn MatrixDriver>>,
    ) -> Result<BoxedSink, DmdError> {
        let geometry = config.geometry;
        match &config.sink {
            SinkConfig::Hardware(options) => {
                let driver = driver.ok_or_else(|| DmdError::InitializationFailed(
                    "no matrix driver loaded".to_string()
                ))?;
                info!("Creating RGB matrix sink {}x{} via {}", geometry.cols, geometry.rows, driver.describe());
                Ok(Box::new(HardwareSink::new(driver, options.clone(), geometry)))
            }
            SinkConfig::Socket { dmd_socket } => {
                info!("Creating socket sink {}x{} -> {}", geometry.cols, geometry.rows, dmd_socket.display());
                Ok(Box::new(SocketSink::new(dmd_socket, geometry)))
            }
        }
    }

    /// Load the native matrix library
    #[cfg(feature = "hardware")]
    pub fn matrix_driver() -> Result<Arc<dyn MatrixDriver>, DmdError> {
        let library = crate::dmd::matrix::MatrixLibrary::locate()?;
        Ok(Arc::new(library))
    }

    /// Load the native matrix library from the given places only
    #[cfg(feature = "hardware")]
    pub fn matrix_driver_in(search_paths: &[PathBuf], system_loader: bool) -> Result<Arc<dyn MatrixDriver>, DmdError> {
        let library = crate::dmd::matrix::MatrixLibrary::locate_in(search_paths, system_loader)?;
        Ok(Arc::new(library))
    }

    #[cfg(not(feature = "hardware"))]
    pub fn matrix_driver() -> Result<Arc<dyn MatrixDriver>, DmdError> {
        Err(DmdError::UnsupportedSink("rpi_dmd (enable the hardware feature)"))
    }

    #[cfg(not(feature = "hardware"))]
    pub fn matrix_driver_in(_search_paths: &[PathBuf], _system_loader: bool) -> Result<Arc<dyn MatrixDriver>, DmdError> {
        Self::matrix_driver()
    }
}
