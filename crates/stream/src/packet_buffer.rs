//! Bounded packet buffer between the reader and decoder tasks
//!
//! Push never blocks: a full buffer drops its oldest packet. Pop always takes
//! the newest packet, so a lagging decoder skips ahead instead of working
//! through the backlog in order.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Counters for observing the eviction/consumption discipline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub pushed: u64,
    pub evicted: u64,
    pub consumed: u64,
    pub len: usize,
    pub capacity: usize,
}

pub struct PacketBuffer<P> {
    inner: Mutex<BufferInner<P>>,
    available: Condvar,
    capacity: usize,
}

struct BufferInner<P> {
    packets: VecDeque<P>,
    pushed: u64,
    evicted: u64,
    consumed: u64,
}

impl<P> PacketBuffer<P> {
    /// Create a buffer holding at most `capacity` packets (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(BufferInner {
                packets: VecDeque::with_capacity(capacity),
                pushed: 0,
                evicted: 0,
                consumed: 0,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a packet, evicting and returning the oldest one when full
    pub fn push(&self, packet: P) -> Option<P> {
        let mut inner = self.inner.lock();

        let evicted = if inner.packets.len() >= self.capacity {
            inner.evicted += 1;
            inner.packets.pop_front()
        } else {
            None
        };

        inner.packets.push_back(packet);
        inner.pushed += 1;
        drop(inner);

        self.available.notify_one();
        evicted
    }

    /// Take the most recently pushed packet still held
    pub fn pop_newest(&self) -> Option<P> {
        let mut inner = self.inner.lock();
        let packet = inner.packets.pop_back();
        if packet.is_some() {
            inner.consumed += 1;
        }
        packet
    }

    /// Like `pop_newest`, waiting up to `timeout` for a packet to arrive.
    /// A timeout too large to form a deadline waits indefinitely.
    pub fn pop_newest_timeout(&self, timeout: Duration) -> Option<P> {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.inner.lock();

        while inner.packets.is_empty() {
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut inner, deadline).timed_out() {
                        break;
                    }
                }
                None => self.available.wait(&mut inner),
            }
        }

        let packet = inner.packets.pop_back();
        if packet.is_some() {
            inner.consumed += 1;
        }
        packet
    }

    pub fn len(&self) -> usize {
        self.inner.lock().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().packets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every held packet. Counters are kept.
    pub fn clear(&self) {
        self.inner.lock().packets.clear();
    }

    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock();
        BufferStats {
            pushed: inner.pushed,
            evicted: inner.evicted,
            consumed: inner.consumed,
            len: inner.packets.len(),
            capacity: self.capacity,
        }
    }
}
