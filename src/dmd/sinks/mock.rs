/*
 *  dmd/sinks/mock.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock output sink for testing without hardware
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

use crate::dmd::error::DmdError;
use crate::dmd::traits::{OutputSink, SinkCapabilities};
use crate::frame::{Frame, FrameGeometry};

/// Mock sink for testing
///
/// Records every call so tests can check what the delivery thread did.
#[derive(Debug, Clone)]
pub struct MockSink {
    capabilities: SinkCapabilities,

    /// Shared state for testing
    state: Arc<Mutex<MockSinkState>>,
}

/// Internal state for the mock sink (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockSinkState {
    /// Number of times open() was called
    pub open_count: usize,

    /// Every frame passed to update(), in order
    pub frames: Vec<Frame>,

    /// Every brightness passed to set_brightness()
    pub brightness: Vec<f32>,

    /// Number of times stop() was called
    pub stop_calls: usize,

    /// Number of stop() calls that actually blanked the output
    pub blanks: usize,

    /// Whether the output is currently open
    pub is_open: bool,

    /// Simulate failures (for error testing)
    pub simulate_open_failure: bool,
    pub simulate_update_failure: bool,
    pub simulate_update_panic: bool,
}

impl MockSink {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            capabilities: SinkCapabilities { geometry, supports_brightness: true },
            state: Arc::new(Mutex::new(MockSinkState::default())),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockSinkState>> {
        Arc::clone(&self.state)
    }
}

impl OutputSink for MockSink {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn open(&mut self) -> Result<(), DmdError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_open_failure {
            return Err(DmdError::InitializationFailed("Simulated open failure".to_string()));
        }
        state.open_count += 1;
        state.is_open = true;
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<(), DmdError> {
        let should_panic = {
            let mut state = self.state.lock().unwrap();
            if state.simulate_update_failure {
                return Err(DmdError::InitializationFailed("Simulated update failure".to_string()));
            }
            if !state.simulate_update_panic {
                state.frames.push(frame.clone());
            }
            state.simulate_update_panic
        }; // release lock before panicking so the state stays readable

        if should_panic {
            panic!("Simulated sink panic");
        }
        Ok(())
    }

    fn set_brightness(&mut self, value: f32) -> Result<(), DmdError> {
        self.state.lock().unwrap().brightness.push(value);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.stop_calls += 1;
        if state.is_open {
            state.is_open = false;
            state.blanks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY: FrameGeometry = FrameGeometry { rows: 2, cols: 3 };

    #[test]
    fn test_mock_sink_records_frames() {
        let mut sink = MockSink::new(GEOMETRY);
        sink.open().unwrap();
        sink.update(&Frame::filled(GEOMETRY, 9)).unwrap();

        let state = sink.state();
        let state = state.lock().unwrap();
        assert_eq!(state.open_count, 1);
        assert_eq!(state.frames.len(), 1);
        assert_eq!(state.frames[0].len(), 18);
    }

    #[test]
    fn test_mock_sink_stop_is_idempotent() {
        let mut sink = MockSink::new(GEOMETRY);
        sink.open().unwrap();
        sink.stop();
        sink.stop();

        let state = sink.state();
        let state = state.lock().unwrap();
        assert_eq!(state.stop_calls, 2);
        assert_eq!(state.blanks, 1);
    }

    #[test]
    fn test_mock_sink_simulated_failure() {
        let mut sink = MockSink::new(GEOMETRY);
        sink.state().lock().unwrap().simulate_update_failure = true;
        assert!(sink.update(&Frame::blank(GEOMETRY)).is_err());

        sink.state().lock().unwrap().simulate_update_failure = false;
        assert!(sink.update(&Frame::blank(GEOMETRY)).is_ok());
    }
}
