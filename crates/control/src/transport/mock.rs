//! Mock transport for testing

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::Transport;
use crate::error::{ControlError, Result};

/// Scripted transport: queued replies are handed out in order, an empty
/// queue (or a queued `None`) reads as a timeout. Clones share state so a
/// test can keep a handle after moving one into a controller.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    open: bool,
    replies: VecDeque<Option<Vec<u8>>>,
    sent: Vec<Vec<u8>>,
    opens: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram for the next `receive`
    pub fn push_reply(&self, frame: impl Into<Vec<u8>>) {
        self.inner.lock().replies.push_back(Some(frame.into()));
    }

    /// Queue a timeout for the next `receive`
    pub fn push_timeout(&self) {
        self.inner.lock().replies.push_back(None);
    }

    /// All frames sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().sent.clone()
    }

    pub fn pending_replies(&self) -> usize {
        self.inner.lock().replies.len()
    }

    /// How many times `open` was called
    pub fn open_count(&self) -> usize {
        self.inner.lock().opens
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.open = true;
        inner.opens += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().open = false;
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(ControlError::NotConnected);
        }
        inner.sent.push(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(ControlError::NotConnected);
        }
        match inner.replies.pop_front() {
            Some(Some(frame)) => Ok(frame),
            Some(None) | None => Err(ControlError::Timeout {
                waited: Duration::ZERO,
            }),
        }
    }
}
