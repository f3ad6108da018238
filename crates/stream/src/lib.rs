//! Freshness-first video ingest for the gimbal camera
//!
//! ```text
//! network ──reader task──▶ PacketBuffer ──decoder task──▶ FrameCache ◀── get_frame()
//!           (drop oldest)     (bounded)     (take newest)   (one slot)
//! ```
//!
//! Under backlog the pipeline gives up completeness for bounded staleness:
//! the reader never blocks, the decoder always works on the most recent
//! packet, and callers always get a copy of the most recent image. Packets a
//! codec needs in order may be skipped, showing up as decode artifacts rather
//! than errors.
//!
//! The real RTSP/H.264 backend uses FFmpeg and sits behind the `ffmpeg`
//! feature. `mock::MockBackend` drives the same pipeline from a channel.

mod config;
pub mod decoder;
mod error;
mod frame;
mod frame_cache;
mod ingest;
pub mod mock;
mod packet_buffer;
pub mod reader;

pub use config::{StreamConfig, DEFAULT_HOST, DEFAULT_NAME, DEFAULT_PORT};
pub use decoder::{DecoderTiming, FrameDecoder, PacketDecoder};
pub use error::{Result, StreamError};
pub use frame::{DecodedFrame, PixelFormat};
pub use frame_cache::{CacheStats, FrameCache};
pub use ingest::{FrameReader, IngestState, IngestStats, StreamBackend, StreamIngest};
pub use packet_buffer::{BufferStats, PacketBuffer};
pub use reader::{PacketReader, PacketSource};

#[cfg(feature = "ffmpeg")]
pub use decoder::FfmpegBackend;
