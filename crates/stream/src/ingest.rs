//! Stream ingest: reader and decoder tasks around a shared packet buffer,
//! publishing into a latest-frame cache

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::decoder::{DecoderTiming, FrameDecoder, PacketDecoder};
use crate::error::{Result, StreamError};
use crate::reader::{PacketReader, PacketSource};
use crate::{BufferStats, CacheStats, DecodedFrame, FrameCache, PacketBuffer, StreamConfig};

/// Opens a stream and splits it into a packet source and a decoder
pub trait StreamBackend {
    type Packet: Send + 'static;
    type Source: PacketSource<Packet = Self::Packet>;
    type Decoder: PacketDecoder<Packet = Self::Packet>;

    fn open(&self, config: &StreamConfig) -> Result<(Self::Source, Self::Decoder)>;
}

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestState {
    Idle,
    Running,
}

/// Snapshot of pipeline counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IngestStats {
    pub state: IngestState,
    pub buffer: BufferStats,
    pub cache: CacheStats,
}

/// Cheap, cloneable read handle on the latest frame
#[derive(Clone)]
pub struct FrameReader {
    cache: Arc<FrameCache>,
}

impl FrameReader {
    /// Copy of the freshest decoded frame.
    ///
    /// Fails with `NotConnected` when the pipeline is not running and with
    /// `NoFrameYet` until the first decode of the current session.
    pub fn get_frame(&self) -> Result<DecodedFrame> {
        self.cache.latest()
    }

    pub fn is_live(&self) -> bool {
        self.cache.is_live()
    }
}

/// A spawned task plus the channel it closes on exit
struct Task {
    name: &'static str,
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl Task {
    fn spawn<F>(name: &'static str, body: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (done_tx, done_rx): (Sender<()>, Receiver<()>) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                body();
                drop(done_tx);
            })?;
        Ok(Self {
            name,
            handle,
            done: done_rx,
        })
    }

    /// Join, giving up after `timeout`. Returns false if the task was left
    /// running.
    fn join_timeout(self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    warn!("{} task panicked", self.name);
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "{} task did not stop within {:?}, detaching",
                    self.name, timeout
                );
                false
            }
        }
    }
}

struct Session<P> {
    stop: Arc<AtomicBool>,
    buffer: Arc<PacketBuffer<P>>,
    reader: Task,
    decoder: Task,
}

/// Freshness-first frame ingest.
///
/// `connect` opens the stream and starts a reader task (network -> bounded
/// packet buffer, oldest dropped when full) and a decoder task (newest
/// packet -> frame cache). `get_frame` never waits on the network.
pub struct StreamIngest<B: StreamBackend> {
    config: StreamConfig,
    backend: B,
    cache: Arc<FrameCache>,
    session: Option<Session<B::Packet>>,
    last_buffer: Option<BufferStats>,
}

#[cfg(feature = "ffmpeg")]
impl StreamIngest<crate::decoder::FfmpegBackend> {
    /// Ingest backed by FFmpeg
    pub fn ffmpeg(config: StreamConfig) -> Self {
        Self::with_backend(config, crate::decoder::FfmpegBackend::new())
    }
}

impl<B: StreamBackend> StreamIngest<B> {
    pub fn with_backend(config: StreamConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            cache: Arc::new(FrameCache::new()),
            session: None,
            last_buffer: None,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> IngestState {
        if self.session.is_some() {
            IngestState::Running
        } else {
            IngestState::Idle
        }
    }

    /// Open the stream and start both tasks
    pub fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            warn!("Already connected to {}", self.config.url());
            return Err(StreamError::AlreadyConnected);
        }
        self.config.validate()?;

        let (source, decoder) = self.backend.open(&self.config)?;

        let stop = Arc::new(AtomicBool::new(false));
        let buffer = Arc::new(PacketBuffer::new(self.config.buffer_capacity));
        let session_id = self.cache.open_session();

        let reader = PacketReader::new(
            source,
            buffer.clone(),
            stop.clone(),
            self.config.reader_backoff(),
        )
        .verbose(self.config.debug);

        let frame_decoder = FrameDecoder::new(
            decoder,
            buffer.clone(),
            self.cache.clone(),
            session_id,
            stop.clone(),
            DecoderTiming {
                idle_wait: self.config.idle_wait(),
                backoff: self.config.decoder_backoff(),
            },
        )
        .verbose(self.config.debug);

        let reader = match Task::spawn("stream-reader", move || reader.run()) {
            Ok(task) => task,
            Err(e) => {
                self.cache.close_session();
                return Err(e);
            }
        };
        let decoder = match Task::spawn("stream-decoder", move || frame_decoder.run()) {
            Ok(task) => task,
            Err(e) => {
                stop.store(true, Ordering::Release);
                reader.join_timeout(self.config.join_timeout());
                self.cache.close_session();
                return Err(e);
            }
        };

        self.session = Some(Session {
            stop,
            buffer,
            reader,
            decoder,
        });
        info!("Streaming from {}", self.config.url());
        Ok(())
    }

    /// Stop both tasks and close the stream.
    ///
    /// Each task gets `join_timeout_ms` to exit. A task still running after
    /// that is detached; a reader blocked in a network read keeps the input
    /// open for at most `io_timeout_us` more before it notices the stop.
    pub fn disconnect(&mut self) -> Result<()> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                warn!("Already disconnected from {}", self.config.url());
                return Err(StreamError::NotConnected);
            }
        };

        self.cache.close_session();
        session.stop.store(true, Ordering::Release);

        let timeout = self.config.join_timeout();
        let reader_joined = session.reader.join_timeout(timeout);
        let decoder_joined = session.decoder.join_timeout(timeout);

        self.last_buffer = Some(session.buffer.stats());
        session.buffer.clear();

        if reader_joined && decoder_joined {
            info!("Disconnected from {}", self.config.url());
        } else {
            warn!(
                "Disconnected from {} with tasks still running",
                self.config.url()
            );
        }
        Ok(())
    }

    /// Copy of the freshest decoded frame
    pub fn get_frame(&self) -> Result<DecodedFrame> {
        self.cache.latest()
    }

    /// Read handle usable from other threads
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            cache: self.cache.clone(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        let buffer = match &self.session {
            Some(session) => session.buffer.stats(),
            None => self.last_buffer.unwrap_or_default(),
        };
        IngestStats {
            state: self.state(),
            buffer,
            cache: self.cache.stats(),
        }
    }
}

impl<B: StreamBackend> Drop for StreamIngest<B> {
    fn drop(&mut self) {
        if self.session.is_some() {
            debug!("Stopping stream ingest on drop");
            let _ = self.disconnect();
        }
    }
}
