/*
 *  main.rs
 *
 *  rgbdmd - pixels out the door
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::time::Duration;
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};
use tokio::time::MissedTickBehavior;

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind};

use rgbdmd::config::{self, Cli, FrameSource};
use rgbdmd::dmd::{DmdError, DmdPlatform, FrameSender, StopSignal};
use rgbdmd::frame::FrameGeometry;
use rgbdmd::pattern::TestPattern;
use rgbdmd::source::{read_frames, STREAM_AHEAD};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Name the device is configured under
const DEVICE_NAME: &str = "dmd";

/// How long a finished source waits for queued frames to reach the panel
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Feed the device until the source runs dry or the device goes away
async fn feed_frames(
    source: FrameSource,
    frames: FrameSender,
    geometry: FrameGeometry,
    fps: u32,
) -> Result<(), DmdError> {
    match source {
        FrameSource::Pattern => {
            let fps = fps.max(1);
            let mut ticker = tokio::time::interval(Duration::from_secs(1) / fps);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut pattern = TestPattern::new(geometry);
            loop {
                ticker.tick().await;
                // a panel slower than the pattern would otherwise grow the queue forever
                if frames.pending() > fps as usize {
                    debug!("{} frames pending, skipping one", frames.pending());
                    continue;
                }
                frames.push(pattern.next_frame())?;
            }
        }
        FrameSource::Stdin => {
            // blocking reads stay off the runtime; the thread is left behind on shutdown
            let (tx, rx) = tokio::sync::oneshot::channel();
            std::thread::Builder::new()
                .name("rgbdmd-stdin".to_string())
                .spawn(move || {
                    let _ = tx.send(read_frames(std::io::stdin().lock(), &frames, STREAM_AHEAD));
                })?;
            let count = rx.await.unwrap_or(Err(DmdError::WorkerStopped))?;
            info!("stdin closed after {} frames", count);
            Ok(())
        }
        FrameSource::Blank => {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

#[tokio::main] // Requires the `tokio` runtime with `macros` and `rt-multi-thread` features
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_from(&cli).context("loading configuration")?;

    let level = if cli.debug {
        "debug".to_string()
    } else {
        cfg.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - pixels out the door", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let dmd_config = cfg.dmd_config()?;
    let stop = StopSignal::new();
    let mut platform = DmdPlatform::new(dmd_config, stop.clone())
        .context("initialising DMD platform")?;
    info!("Platform {}", platform);

    let (frames, geometry) = {
        let device = platform.configure_rgb_dmd(DEVICE_NAME)
            .context("configuring RGB DMD")?;
        if let Some(brightness) = cli.brightness {
            device.set_brightness(brightness)?;
        }
        (device.sender(), device.geometry())
    };

    let mut outcome = Ok(());
    let mut source_done = false;

    // Main application loop
    tokio::select! {
        // Handle Unix signals for graceful shutdown
        r = signal_handler() => {
            r.context("installing signal handlers")?;
        }
        r = feed_frames(cli.source, frames, geometry, cli.fps) => {
            match r {
                Ok(()) => {
                    info!("Frame source finished.");
                    source_done = true;
                }
                Err(e) => {
                    error!("Frame source stopped: {}", e);
                    outcome = Err(e);
                }
            }
        }
    }

    if source_done {
        // let the tail of a finite stream reach the panel before blanking it
        if let Some(device) = platform.device() {
            tokio::task::block_in_place(|| device.drain(DRAIN_TIMEOUT));
        }
    }

    info!("Main application exiting. Clearing display and stopping delivery thread.");
    stop.set();
    let stopped = platform.stop();

    outcome.context("feeding frames")?;
    stopped.context("stopping DMD")?;
    Ok(())
}
