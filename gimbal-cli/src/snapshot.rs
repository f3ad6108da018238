//! Saving decoded frames as JPEG

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use gimbal_stream::{DecodedFrame, PixelFormat, StreamBackend, StreamError, StreamIngest};
use image::RgbImage;
use tracing::{debug, info, warn};

/// Encode `frame` as a JPEG at `path`
pub fn save_jpeg(frame: &DecodedFrame, path: &Path) -> Result<()> {
    if !frame.is_complete() {
        bail!(
            "Frame buffer holds {} bytes, expected {}x{} {:?}",
            frame.size(),
            frame.width,
            frame.height,
            frame.format
        );
    }

    let rgb = match frame.format {
        PixelFormat::Rgb24 => frame.data.clone(),
        PixelFormat::Bgr24 => frame
            .swap_red_blue()
            .map(|f| f.data)
            .ok_or_else(|| anyhow!("Could not convert BGR frame"))?,
        PixelFormat::Rgba => frame
            .data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
    };

    let image = RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| anyhow!("Frame size does not match its dimensions"))?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Snapshot capture options
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub count: u32,
    pub interval: Duration,
    /// How long to wait for the first decoded frame
    pub first_frame_timeout: Duration,
    pub out_dir: PathBuf,
}

/// Connect, save `count` snapshots, disconnect. Returns the written paths.
pub fn capture<B: StreamBackend>(
    ingest: &mut StreamIngest<B>,
    options: &CaptureOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("Failed to create {}", options.out_dir.display()))?;

    ingest
        .connect()
        .with_context(|| format!("Failed to connect to {}", ingest.config().url()))?;

    let result = capture_frames(ingest, options);

    let stats = ingest.stats();
    info!(
        "Packets pushed {} evicted {} decoded-from {}; frames published {}",
        stats.buffer.pushed, stats.buffer.evicted, stats.buffer.consumed, stats.cache.published
    );
    if let Err(e) = ingest.disconnect() {
        warn!("Disconnect failed: {}", e);
    }
    result
}

fn capture_frames<B: StreamBackend>(
    ingest: &StreamIngest<B>,
    options: &CaptureOptions,
) -> Result<Vec<PathBuf>> {
    let deadline = Instant::now() + options.first_frame_timeout;
    loop {
        match ingest.get_frame() {
            Ok(_) => break,
            Err(StreamError::NoFrameYet) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(20));
            }
            Err(StreamError::NoFrameYet) => {
                bail!("No frame within {:?}", options.first_frame_timeout)
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut written = Vec::with_capacity(options.count as usize);
    for i in 0..options.count {
        if i > 0 {
            thread::sleep(options.interval);
        }
        let frame = ingest.get_frame()?;
        let path = options.out_dir.join(format!("frame_{:04}.jpg", i));
        save_jpeg(&frame, &path)?;
        debug!("Saved {}x{} frame to {}", frame.width, frame.height, path.display());
        written.push(path);
    }
    Ok(written)
}
