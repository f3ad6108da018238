//! Decoded image type

use serde::{Deserialize, Serialize};

/// Packed output pixel layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Bgr24,
    Rgb24,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr24 | PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// One decoded image, rows packed without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl DecodedFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Whether `data` holds exactly `height` packed rows
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.row_bytes() * self.height as usize
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Same image with red and blue swapped (BGR <-> RGB)
    pub fn swap_red_blue(&self) -> Option<DecodedFrame> {
        let format = match self.format {
            PixelFormat::Bgr24 => PixelFormat::Rgb24,
            PixelFormat::Rgb24 => PixelFormat::Bgr24,
            PixelFormat::Rgba => return None,
        };
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Some(DecodedFrame::new(self.width, self.height, format, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_frame() {
        let frame = DecodedFrame::new(4, 2, PixelFormat::Bgr24, vec![0; 24]);
        assert_eq!(frame.row_bytes(), 12);
        assert!(frame.is_complete());

        let short = DecodedFrame::new(4, 2, PixelFormat::Rgba, vec![0; 24]);
        assert!(!short.is_complete());
    }

    #[test]
    fn test_swap_red_blue() {
        let frame = DecodedFrame::new(2, 1, PixelFormat::Bgr24, vec![1, 2, 3, 4, 5, 6]);
        let rgb = frame.swap_red_blue().unwrap();
        assert_eq!(rgb.format, PixelFormat::Rgb24);
        assert_eq!(rgb.data, vec![3, 2, 1, 6, 5, 4]);

        let rgba = DecodedFrame::new(1, 1, PixelFormat::Rgba, vec![0; 4]);
        assert!(rgba.swap_red_blue().is_none());
    }
}
