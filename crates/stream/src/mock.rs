//! Scripted backend for testing the pipeline without a camera

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::decoder::PacketDecoder;
use crate::error::{Result, StreamError};
use crate::ingest::StreamBackend;
use crate::reader::PacketSource;
use crate::{DecodedFrame, PixelFormat, StreamConfig};

/// What the mock source hands out next
#[derive(Debug, Clone)]
pub enum MockEvent {
    Packet(u32),
    /// A transient read failure
    Fail(String),
    End,
}

/// Backend whose packets are fed through a channel.
///
/// Packets are plain ids. Decoding packet `n` yields a 2x2 BGR frame filled
/// with `n as u8`, unless `n` was marked undecodable. Every decode attempt is
/// reported on the feed's `decoded` channel.
pub struct MockBackend {
    events: Receiver<MockEvent>,
    decoded: Sender<u32>,
    gate: Option<Receiver<()>>,
    undecodable: HashSet<u32>,
    fail_open: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
}

/// Test-side handle of a `MockBackend`
pub struct MockFeed {
    events: Sender<MockEvent>,
    decoded: Receiver<u32>,
    fail_open: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> (Self, MockFeed) {
        let (events_tx, events_rx) = unbounded();
        let (decoded_tx, decoded_rx) = unbounded();
        let fail_open = Arc::new(AtomicBool::new(false));
        let opens = Arc::new(AtomicUsize::new(0));

        let backend = Self {
            events: events_rx,
            decoded: decoded_tx,
            gate: None,
            undecodable: HashSet::new(),
            fail_open: fail_open.clone(),
            opens: opens.clone(),
        };
        let feed = MockFeed {
            events: events_tx,
            decoded: decoded_rx,
            fail_open,
            opens,
        };
        (backend, feed)
    }

    /// Hold every decode until a token arrives on the returned sender.
    /// Dropping the sender releases the decoder for good.
    pub fn with_gate(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = unbounded();
        self.gate = Some(rx);
        (self, tx)
    }

    /// Make decoding packet `id` fail
    pub fn undecodable(mut self, id: u32) -> Self {
        self.undecodable.insert(id);
        self
    }
}

impl MockFeed {
    pub fn packet(&self, id: u32) {
        let _ = self.events.send(MockEvent::Packet(id));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.events.send(MockEvent::Fail(reason.into()));
    }

    pub fn end(&self) {
        let _ = self.events.send(MockEvent::End);
    }

    /// Next packet id the decoder was handed
    pub fn next_decoded(&self, timeout: Duration) -> Option<u32> {
        self.decoded.recv_timeout(timeout).ok()
    }

    /// Make the next `open` fail
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl StreamBackend for MockBackend {
    type Packet = u32;
    type Source = MockSource;
    type Decoder = MockDecoder;

    fn open(&self, config: &StreamConfig) -> Result<(MockSource, MockDecoder)> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StreamError::Open {
                url: config.url(),
                reason: "connection refused".into(),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        let source = MockSource {
            events: self.events.clone(),
            poll: Duration::from_micros(config.io_timeout_us.min(20_000)),
        };
        let decoder = MockDecoder {
            decoded: self.decoded.clone(),
            gate: self.gate.clone(),
            undecodable: self.undecodable.clone(),
            format: config.pixel_format,
        };
        Ok((source, decoder))
    }
}

pub struct MockSource {
    events: Receiver<MockEvent>,
    poll: Duration,
}

impl PacketSource for MockSource {
    type Packet = u32;

    fn read_packet(&mut self) -> Result<Option<u32>> {
        match self.events.recv_timeout(self.poll) {
            Ok(MockEvent::Packet(id)) => Ok(Some(id)),
            Ok(MockEvent::Fail(reason)) => Err(StreamError::TransientIo(reason)),
            Ok(MockEvent::End) | Err(RecvTimeoutError::Disconnected) => {
                Err(StreamError::EndOfStream)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
        }
    }
}

pub struct MockDecoder {
    decoded: Sender<u32>,
    gate: Option<Receiver<()>>,
    undecodable: HashSet<u32>,
    format: PixelFormat,
}

impl PacketDecoder for MockDecoder {
    type Packet = u32;

    fn decode(&mut self, packet: u32) -> Result<Option<DecodedFrame>> {
        if let Some(gate) = &self.gate {
            // A dropped sender opens the gate
            let _ = gate.recv();
        }
        let _ = self.decoded.send(packet);

        if self.undecodable.contains(&packet) {
            return Err(StreamError::Decode(format!("packet {} is corrupt", packet)));
        }

        let (width, height) = (2, 2);
        let len = width as usize * height as usize * self.format.bytes_per_pixel();
        Ok(Some(DecodedFrame::new(
            width,
            height,
            self.format,
            vec![packet as u8; len],
        )))
    }
}
