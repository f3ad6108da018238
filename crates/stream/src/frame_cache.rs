//! Single-slot latest-frame cache

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{Result, StreamError};
use crate::DecodedFrame;

/// Cached frame data
#[derive(Clone)]
struct CachedFrame {
    frame: Arc<DecodedFrame>,
    timestamp: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Frames published in the current session
    pub published: u64,
    /// Publishes dropped because they came from a finished session
    pub stale_rejected: u64,
    pub has_frame: bool,
    pub live: bool,
    /// Milliseconds since the latest frame was published
    pub latest_age_ms: Option<u64>,
}

/// Thread-safe latest-frame slot.
///
/// One decoder writes, any number of readers copy out. Each connect opens a
/// new session; publishes tagged with an older session are ignored, so a
/// decoder that outlived its `disconnect` cannot leak frames into the next
/// session.
pub struct FrameCache {
    inner: RwLock<FrameCacheInner>,
}

struct FrameCacheInner {
    latest: Option<CachedFrame>,
    session: u64,
    live: bool,
    published: u64,
    stale_rejected: u64,
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(FrameCacheInner {
                latest: None,
                session: 0,
                live: false,
                published: 0,
                stale_rejected: 0,
            }),
        }
    }

    /// Start a new session: drop the old frame and accept publishes tagged
    /// with the returned id.
    pub fn open_session(&self) -> u64 {
        let mut inner = self.inner.write();
        inner.session += 1;
        inner.live = true;
        inner.latest = None;
        inner.published = 0;
        inner.session
    }

    /// Stop serving frames. Later publishes for this session are ignored.
    pub fn close_session(&self) {
        let mut inner = self.inner.write();
        inner.live = false;
        inner.session += 1;
    }

    pub fn is_live(&self) -> bool {
        self.inner.read().live
    }

    /// Replace the cached frame. Returns false when `session` is not current.
    pub fn publish(&self, session: u64, frame: DecodedFrame) -> bool {
        let cached = CachedFrame {
            frame: Arc::new(frame),
            timestamp: Instant::now(),
        };

        let mut inner = self.inner.write();
        if !inner.live || inner.session != session {
            inner.stale_rejected += 1;
            return false;
        }
        inner.latest = Some(cached);
        inner.published += 1;
        true
    }

    /// Copy of the latest frame
    pub fn latest(&self) -> Result<DecodedFrame> {
        let inner = self.inner.read();
        if !inner.live {
            return Err(StreamError::NotConnected);
        }
        match &inner.latest {
            Some(cached) => Ok(cached.frame.as_ref().clone()),
            None => Err(StreamError::NoFrameYet),
        }
    }

    /// Time since the latest frame was published
    pub fn latest_age(&self) -> Option<Duration> {
        let inner = self.inner.read();
        inner.latest.as_ref().map(|c| c.timestamp.elapsed())
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        CacheStats {
            published: inner.published,
            stale_rejected: inner.stale_rejected,
            has_frame: inner.latest.is_some(),
            live: inner.live,
            latest_age_ms: inner
                .latest
                .as_ref()
                .map(|c| c.timestamp.elapsed().as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;
    use std::thread;

    fn solid(value: u8, len: usize) -> DecodedFrame {
        DecodedFrame::new(len as u32, 1, PixelFormat::Bgr24, vec![value; len * 3])
    }

    #[test]
    fn test_not_connected_before_session() {
        let cache = FrameCache::new();
        assert!(matches!(cache.latest(), Err(StreamError::NotConnected)));
    }

    #[test]
    fn test_no_frame_yet() {
        let cache = FrameCache::new();
        cache.open_session();
        assert!(matches!(cache.latest(), Err(StreamError::NoFrameYet)));
        assert!(cache.latest_age().is_none());
    }

    #[test]
    fn test_publish_and_copy_out() {
        let cache = FrameCache::new();
        let session = cache.open_session();

        assert!(cache.publish(session, solid(7, 4)));
        let mut copy = cache.latest().unwrap();
        copy.data[0] = 0;

        // Mutating the copy does not touch the cached frame
        assert_eq!(cache.latest().unwrap().data[0], 7);
        assert!(cache.stats().has_frame);
    }

    #[test]
    fn test_latest_wins() {
        let cache = FrameCache::new();
        let session = cache.open_session();
        cache.publish(session, solid(1, 2));
        cache.publish(session, solid(2, 2));

        assert_eq!(cache.latest().unwrap().data, vec![2; 6]);
        assert_eq!(cache.stats().published, 2);
    }

    #[test]
    fn test_stale_session_rejected() {
        let cache = FrameCache::new();
        let old = cache.open_session();
        cache.close_session();
        let current = cache.open_session();

        assert!(!cache.publish(old, solid(9, 2)));
        assert!(matches!(cache.latest(), Err(StreamError::NoFrameYet)));
        assert!(cache.publish(current, solid(3, 2)));
        assert_eq!(cache.stats().stale_rejected, 1);
    }

    #[test]
    fn test_close_session_stops_serving() {
        let cache = FrameCache::new();
        let session = cache.open_session();
        cache.publish(session, solid(1, 2));
        cache.close_session();

        assert!(matches!(cache.latest(), Err(StreamError::NotConnected)));
        assert!(!cache.publish(session, solid(2, 2)));
    }

    #[test]
    fn test_concurrent_reads_never_torn() {
        let cache = Arc::new(FrameCache::new());
        let session = cache.open_session();
        cache.publish(session, solid(0, 4096));

        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for value in 1..=200u8 {
                    cache.publish(session, solid(value, 4096));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let frame = cache.latest().unwrap();
                        let first = frame.data[0];
                        assert!(frame.is_complete());
                        assert!(frame.data.iter().all(|&b| b == first));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cache.latest().unwrap().data[0], 200);
    }
}
