/*
 *  dmd/sinks/socket.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unix datagram sink - one frame per datagram to an external renderer
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

//! Frames go out as raw RGB bytes, one datagram each: no header, no
//! sequence number, no acknowledgment. The renderer may not be running yet
//! (or at all), so a missing or busy destination silently drops the frame.

use std::io::{self, ErrorKind};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};

use crate::dmd::error::DmdError;
use crate::dmd::traits::{OutputSink, SinkCapabilities};
use crate::frame::{Frame, FrameGeometry};

/// Sink sending frames to a Unix datagram socket
#[derive(Debug)]
pub struct SocketSink {
    path: PathBuf,
    socket: Option<UnixDatagram>,
    capabilities: SinkCapabilities,
    dropped: u64,
}

impl SocketSink {
    pub fn new(path: impl Into<PathBuf>, geometry: FrameGeometry) -> Self {
        Self {
            path: path.into(),
            socket: None,
            capabilities: SinkCapabilities { geometry, supports_brightness: false },
            dropped: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Frames discarded because nobody was listening
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// Send one datagram, swallowing the errors that mean "no receiver"
    fn send(&mut self, bytes: &[u8]) -> Result<(), DmdError> {
        let Some(socket) = self.socket.as_ref() else {
            trace!("socket closed, frame dropped");
            return Ok(());
        };

        match socket.send_to(bytes, &self.path) {
            Ok(_) => Ok(()),
            Err(e) if is_receiver_absent(&e) => {
                if self.dropped == 0 {
                    debug!("no DMD renderer at {} ({}), dropping frames", self.path.display(), e);
                }
                self.dropped += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ENOENT - path gone, ECONNREFUSED - stale socket file, EAGAIN - receiver queue full
fn is_receiver_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::WouldBlock
    ) || e.raw_os_error() == Some(libc::ENOTCONN)
}

impl OutputSink for SocketSink {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn open(&mut self) -> Result<(), DmdError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = UnixDatagram::unbound()?;
        // a stalled renderer must not stall the delivery thread
        socket.set_nonblocking(true)?;
        self.socket = Some(socket);
        info!("DMD frames to {} ({} bytes each)", self.path.display(), self.capabilities.geometry.frame_len());
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<(), DmdError> {
        self.send(frame.as_bytes())
    }

    fn set_brightness(&mut self, _value: f32) -> Result<(), DmdError> {
        // not carried by the wire format
        Ok(())
    }

    fn stop(&mut self) {
        if self.socket.is_none() {
            return;
        }
        let blank = Frame::blank(self.capabilities.geometry);
        if let Err(e) = self.send(blank.as_bytes()) {
            warn!("failed to send blank DMD frame: {}", e);
        }
        self.socket = None;
        debug!("DMD socket to {} closed ({} frames dropped)", self.path.display(), self.dropped);
    }
}

impl Drop for SocketSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const GEOMETRY: FrameGeometry = FrameGeometry { rows: 4, cols: 4 };

    fn listener(dir: &tempfile::TempDir) -> (UnixDatagram, PathBuf) {
        let path = dir.path().join("dmd.sock");
        let socket = UnixDatagram::bind(&path).unwrap();
        socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        (socket, path)
    }

    fn recv(socket: &UnixDatagram) -> Vec<u8> {
        let mut buf = vec![0u8; 4096];
        let n = socket.recv(&mut buf).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn test_frame_is_one_datagram() {
        let dir = tempfile::tempdir().unwrap();
        let (rx, path) = listener(&dir);

        let mut sink = SocketSink::new(&path, GEOMETRY);
        sink.open().unwrap();
        sink.update(&Frame::filled(GEOMETRY, 0x42)).unwrap();

        let got = recv(&rx);
        assert_eq!(got.len(), GEOMETRY.frame_len());
        assert!(got.iter().all(|&b| b == 0x42));
    }

    #[test]
    fn test_missing_listener_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SocketSink::new(dir.path().join("nobody.sock"), GEOMETRY);
        sink.open().unwrap();

        let start = Instant::now();
        for _ in 0..10 {
            sink.update(&Frame::blank(GEOMETRY)).unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(sink.dropped_frames(), 10);
    }

    #[test]
    fn test_stale_socket_file_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let (rx, path) = listener(&dir);
        drop(rx); // file stays, nobody reads

        let mut sink = SocketSink::new(&path, GEOMETRY);
        sink.open().unwrap();
        assert!(sink.update(&Frame::blank(GEOMETRY)).is_ok());
    }

    #[test]
    fn test_brightness_is_ignored() {
        let mut sink = SocketSink::new("/tmp/unused.sock", GEOMETRY);
        assert!(sink.set_brightness(0.3).is_ok());
        assert!(!sink.capabilities().supports_brightness);
    }

    #[test]
    fn test_stop_sends_one_blank_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let (rx, path) = listener(&dir);

        let mut sink = SocketSink::new(&path, GEOMETRY);
        sink.open().unwrap();
        sink.stop();
        sink.stop();
        assert!(!sink.is_open());

        let blank = recv(&rx);
        assert!(blank.iter().all(|&b| b == 0));

        rx.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(rx.recv(&mut buf).unwrap_err().kind(), ErrorKind::WouldBlock);
    }
}
