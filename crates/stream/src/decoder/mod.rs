//! Decoder task: packet buffer -> frame cache

#[cfg(feature = "ffmpeg")]
mod ffmpeg;

#[cfg(feature = "ffmpeg")]
pub use self::ffmpeg::{FfmpegBackend, FfmpegDecoder, FfmpegSource};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, trace};

use crate::error::Result;
use crate::{DecodedFrame, FrameCache, PacketBuffer};

/// Turns compressed packets into images
pub trait PacketDecoder: Send + 'static {
    type Packet: Send + 'static;

    /// Decode one packet. Returns the last image it completed, if any.
    fn decode(&mut self, packet: Self::Packet) -> Result<Option<DecodedFrame>>;
}

/// Decoder loop timings
#[derive(Debug, Clone, Copy)]
pub struct DecoderTiming {
    /// Wait for a packet before rechecking the stop flag
    pub idle_wait: Duration,
    /// Pause after a failed decode
    pub backoff: Duration,
}

/// Decoder loop state
pub struct FrameDecoder<D: PacketDecoder> {
    decoder: D,
    buffer: Arc<PacketBuffer<D::Packet>>,
    cache: Arc<FrameCache>,
    session: u64,
    stop: Arc<AtomicBool>,
    timing: DecoderTiming,
    verbose: bool,
}

impl<D: PacketDecoder> FrameDecoder<D> {
    pub fn new(
        decoder: D,
        buffer: Arc<PacketBuffer<D::Packet>>,
        cache: Arc<FrameCache>,
        session: u64,
        stop: Arc<AtomicBool>,
        timing: DecoderTiming,
    ) -> Self {
        Self {
            decoder,
            buffer,
            cache,
            session,
            stop,
            timing,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run until the stop flag is set. Always decodes the newest buffered
    /// packet; older ones wait or get evicted.
    pub fn run(mut self) {
        debug!("Decoder task started");
        let mut decoded = 0u64;

        while !self.stop.load(Ordering::Acquire) {
            let packet = match self.buffer.pop_newest_timeout(self.timing.idle_wait) {
                Some(packet) => packet,
                None => continue,
            };

            match self.decoder.decode(packet) {
                Ok(Some(frame)) => {
                    if self.stop.load(Ordering::Acquire) {
                        break;
                    }
                    let (width, height) = (frame.width, frame.height);
                    if self.cache.publish(self.session, frame) {
                        decoded += 1;
                        if self.verbose {
                            debug!("Published frame {} ({}x{})", decoded, width, height);
                        } else {
                            trace!("Published frame {} ({}x{})", decoded, width, height);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Error decoding packet: {}", e);
                    thread::sleep(self.timing.backoff);
                }
            }
        }

        debug!("Decoder task exiting after {} frames", decoded);
    }
}
