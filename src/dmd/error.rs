/*
 *  dmd/error.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the DMD subsystem
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
use thiserror::Error;

use crate::config::ConfigError;

/// Unified error type for all DMD operations
#[derive(Debug, Error)]
pub enum DmdError {
    /// Configuration rejected before any device was created
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// librgbmatrix could not be found or loaded
    #[error("Please install the rpi-rgb-led-matrix library (librgbmatrix.so.1) to use a RGB matrix on the RPi; searched: {}", join_paths(.searched))]
    LibraryMissing { searched: Vec<PathBuf> },

    /// The library loaded but lacks an entry point we need
    #[error("Matrix library symbol {symbol} unavailable: {reason}")]
    MissingSymbol { symbol: &'static str, reason: String },

    /// Panel or socket could not be brought up
    #[error("DMD initialization failed: {0}")]
    InitializationFailed(String),

    /// Frame length does not match rows * cols * 3
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Sink kind compiled out of this build
    #[error("{0} sink not enabled in this build")]
    UnsupportedSink(&'static str),

    /// The delivery thread is gone, frames can no longer be queued
    #[error("DMD delivery thread is not running")]
    WorkerStopped,

    /// The delivery thread died without reporting
    #[error("DMD delivery thread panicked")]
    WorkerPanicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
