//! FFmpeg RTSP demuxer and video decoder

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use tracing::{info, trace};

use super::PacketDecoder;
use crate::error::{Result, StreamError};
use crate::ingest::StreamBackend;
use crate::reader::PacketSource;
use crate::{DecodedFrame, PixelFormat, StreamConfig};

/// Opens the configured RTSP URL with FFmpeg
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

impl StreamBackend for FfmpegBackend {
    type Packet = ffmpeg::Packet;
    type Source = FfmpegSource;
    type Decoder = FfmpegDecoder;

    fn open(&self, config: &StreamConfig) -> Result<(FfmpegSource, FfmpegDecoder)> {
        let url = config.url();
        let open_err = |reason: String| StreamError::Open {
            url: url.clone(),
            reason,
        };

        ffmpeg::init().map_err(|e| open_err(e.to_string()))?;

        let mut options = ffmpeg::Dictionary::new();
        options.set("rtsp_transport", &config.rtsp_transport);
        options.set("max_delay", &config.max_delay_us.to_string());
        options.set("timeout", &config.io_timeout_us.to_string());

        let input = ffmpeg::format::input_with_dictionary(&url, options)
            .map_err(|e| open_err(e.to_string()))?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| open_err("no video stream found".into()))?;
        let stream_index = stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_err(e.to_string()))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| open_err(e.to_string()))?;

        let codec_name = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            "Opened {}: {}x{}, codec: {}",
            url,
            decoder.width(),
            decoder.height(),
            codec_name
        );

        let source = FfmpegSource {
            input,
            stream_index,
        };
        let decoder = FfmpegDecoder {
            decoder,
            target_format: config.pixel_format,
        };
        Ok((source, decoder))
    }
}

/// Demuxer half: owns the network connection
pub struct FfmpegSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
}

impl PacketSource for FfmpegSource {
    type Packet = ffmpeg::Packet;

    fn read_packet(&mut self) -> Result<Option<ffmpeg::Packet>> {
        let mut packet = ffmpeg::Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) if packet.stream() == self.stream_index => Ok(Some(packet)),
            Ok(()) => Ok(None),
            Err(ffmpeg::Error::Eof) => Err(StreamError::EndOfStream),
            Err(e) => Err(StreamError::TransientIo(e.to_string())),
        }
    }
}

/// Codec half: turns packets into packed images
pub struct FfmpegDecoder {
    decoder: ffmpeg::decoder::Video,
    target_format: PixelFormat,
}

impl FfmpegDecoder {
    fn pixel(&self) -> Pixel {
        match self.target_format {
            PixelFormat::Bgr24 => Pixel::BGR24,
            PixelFormat::Rgb24 => Pixel::RGB24,
            PixelFormat::Rgba => Pixel::RGBA,
        }
    }

    /// Convert frame to the target pixel format
    fn convert_frame(&self, frame: &VideoFrame) -> Result<DecodedFrame> {
        let width = frame.width();
        let height = frame.height();

        let mut scaler = ScalingContext::get(
            frame.format(),
            width,
            height,
            self.pixel(),
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| StreamError::Decode(e.to_string()))?;

        let mut output = VideoFrame::empty();
        scaler
            .run(frame, &mut output)
            .map_err(|e| StreamError::Decode(e.to_string()))?;

        // Copy rows into a contiguous buffer, dropping stride padding
        let stride = output.stride(0);
        let width_bytes = width as usize * self.target_format.bytes_per_pixel();
        let src = output.data(0);

        let data = if stride == width_bytes {
            src[..width_bytes * height as usize].to_vec()
        } else {
            let mut data = Vec::with_capacity(width_bytes * height as usize);
            for y in 0..height as usize {
                let row_start = y * stride;
                data.extend_from_slice(&src[row_start..row_start + width_bytes]);
            }
            data
        };

        Ok(DecodedFrame::new(width, height, self.target_format, data))
    }
}

impl PacketDecoder for FfmpegDecoder {
    type Packet = ffmpeg::Packet;

    fn decode(&mut self, packet: ffmpeg::Packet) -> Result<Option<DecodedFrame>> {
        self.decoder
            .send_packet(&packet)
            .map_err(|e| StreamError::Decode(e.to_string()))?;

        // Keep only the last completed picture
        let mut frame = VideoFrame::empty();
        let mut last = None;
        while self.decoder.receive_frame(&mut frame).is_ok() {
            last = Some(frame.clone());
        }

        match last {
            Some(frame) => {
                trace!("Decoded {}x{} picture", frame.width(), frame.height());
                self.convert_frame(&frame).map(Some)
            }
            None => Ok(None),
        }
    }
}
