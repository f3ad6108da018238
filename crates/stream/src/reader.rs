//! Network reader task: source -> packet buffer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::error::{Result, StreamError};
use crate::PacketBuffer;

/// Pull side of a compressed video stream
pub trait PacketSource: Send + 'static {
    type Packet: Send + 'static;

    /// Read the next packet.
    ///
    /// `Ok(None)` means nothing usable arrived this time (a read timeout or a
    /// packet from another elementary stream). `Err(EndOfStream)` ends the
    /// reader; any other error is retried after a backoff.
    fn read_packet(&mut self) -> Result<Option<Self::Packet>>;
}

/// Reader loop state
pub struct PacketReader<S: PacketSource> {
    source: S,
    buffer: Arc<PacketBuffer<S::Packet>>,
    stop: Arc<AtomicBool>,
    backoff: Duration,
    verbose: bool,
}

impl<S: PacketSource> PacketReader<S> {
    pub fn new(
        source: S,
        buffer: Arc<PacketBuffer<S::Packet>>,
        stop: Arc<AtomicBool>,
        backoff: Duration,
    ) -> Self {
        Self {
            source,
            buffer,
            stop,
            backoff,
            verbose: false,
        }
    }

    /// Log per-packet events at debug level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run until the stop flag is set or the stream ends. The source is
    /// dropped (closing the connection) on return.
    pub fn run(mut self) {
        debug!("Reader task started");
        let mut pushed = 0u64;

        while !self.stop.load(Ordering::Acquire) {
            match self.source.read_packet() {
                Ok(Some(packet)) => {
                    pushed += 1;
                    if self.buffer.push(packet).is_some() {
                        if self.verbose {
                            debug!("Buffer full, dropped oldest packet (#{})", pushed);
                        } else {
                            trace!("Buffer full, dropped oldest packet (#{})", pushed);
                        }
                    }
                }
                Ok(None) => {}
                Err(StreamError::EndOfStream) => {
                    warn!("End of stream reached");
                    break;
                }
                Err(e) => {
                    error!("Error reading packet: {}", e);
                    thread::sleep(self.backoff);
                }
            }
        }

        debug!("Reader task exiting after {} packets", pushed);
    }
}
