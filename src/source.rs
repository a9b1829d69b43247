/*
 *  source.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raw frame stream reader
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

use std::io::{ErrorKind, Read};

use log::{debug, info};

use crate::dmd::error::DmdError;
use crate::dmd::queue::FrameSender;
use crate::frame::Frame;

/// Frames a stream may run ahead of the panel
pub const STREAM_AHEAD: usize = 4;

/// Queue back-to-back raw frames from `input` until end of stream.
///
/// Reading pauses while `max_pending` frames are waiting, so a fast pipe
/// is paced by the panel instead of piling up in memory. Returns the number
/// of frames queued. A short trailing chunk is dropped.
pub fn read_frames<R: Read>(mut input: R, frames: &FrameSender, max_pending: usize) -> Result<u64, DmdError> {
    let frame_len = frames.frame_len();
    let mut count = 0u64;

    loop {
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            match input.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < frame_len {
            if filled > 0 {
                debug!("dropping {} trailing bytes, short of a {} byte frame", filled, frame_len);
            }
            info!("frame stream ended after {} frames", count);
            return Ok(count);
        }

        frames.wait_for_room(max_pending)?;
        frames.push(Frame::from_vec(buf))?;
        count += 1;
    }
}
