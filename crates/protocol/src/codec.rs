//! Binary control frame encoding/decoding

use std::fmt::Write;

use crate::{ProtocolError, CTRL, SEQ, STX};

/// Size of the trailing checksum
pub const CRC_SIZE: usize = 2;

/// Smallest frame that can carry a header and checksum
pub const MIN_FRAME_SIZE: usize = FrameHeader::SIZE + CRC_SIZE;

/// Control frame header (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub ctrl: u8,
    pub data_len: u16,
    pub seq: u16,
    pub cmd_id: u8,
}

impl FrameHeader {
    pub const SIZE: usize = 8;

    pub fn new(cmd_id: u8, data_len: u16) -> Self {
        Self {
            ctrl: CTRL,
            data_len,
            seq: SEQ,
            cmd_id,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];

        // STX (2 bytes)
        buf[0..2].copy_from_slice(&STX);

        // CTRL (1 byte)
        buf[2] = self.ctrl;

        // Data length (2 bytes, little endian)
        buf[3..5].copy_from_slice(&self.data_len.to_le_bytes());

        // Sequence (2 bytes, little endian)
        buf[5..7].copy_from_slice(&self.seq.to_le_bytes());

        // Command id (1 byte)
        buf[7] = self.cmd_id;

        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        if buf[0..2] != STX {
            return None;
        }

        Some(Self {
            ctrl: buf[2],
            data_len: u16::from_le_bytes([buf[3], buf[4]]),
            seq: u16::from_le_bytes([buf[5], buf[6]]),
            cmd_id: buf[7],
        })
    }
}

/// CRC16/XMODEM (poly 0x1021, init 0x0000, no reflection, no final xor)
pub fn crc16_xmodem(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Checksum bytes in device wire order (low byte first)
pub fn compute_crc16(bytes: &[u8]) -> [u8; CRC_SIZE] {
    crc16_xmodem(bytes).to_le_bytes()
}

/// Encode a request frame for `cmd_id` carrying `payload`
pub fn encode_frame(cmd_id: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let data_len =
        u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge(payload.len()))?;
    let header = FrameHeader::new(cmd_id, data_len);

    let mut msg = Vec::with_capacity(FrameHeader::SIZE + payload.len() + CRC_SIZE);
    msg.extend_from_slice(&header.to_bytes());
    msg.extend_from_slice(payload);

    let crc = compute_crc16(&msg);
    msg.extend_from_slice(&crc);

    Ok(msg)
}

/// Verify and split a raw frame into header and payload.
///
/// The checksum is verified before any header field is trusted.
pub fn parse_frame(raw: &[u8]) -> Result<(FrameHeader, &[u8]), ProtocolError> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(ProtocolError::MalformedFrame(format!(
            "{} bytes is shorter than the minimum frame of {}",
            raw.len(),
            MIN_FRAME_SIZE
        )));
    }

    let (body, trailer) = raw.split_at(raw.len() - CRC_SIZE);
    let expected = compute_crc16(body);
    if expected != trailer {
        return Err(ProtocolError::ChecksumMismatch {
            expected: u16::from_le_bytes(expected),
            actual: u16::from_le_bytes([trailer[0], trailer[1]]),
        });
    }

    let header = FrameHeader::from_bytes(body)
        .ok_or_else(|| ProtocolError::MalformedFrame("missing 0x5566 start marker".into()))?;

    let payload_end = FrameHeader::SIZE + header.data_len as usize;
    if payload_end > body.len() {
        return Err(ProtocolError::MalformedFrame(format!(
            "declared payload of {} bytes, only {} present",
            header.data_len,
            body.len() - FrameHeader::SIZE
        )));
    }

    Ok((header, &body[FrameHeader::SIZE..payload_end]))
}

/// Verify a raw frame and return its payload
pub fn decode_frame(raw: &[u8]) -> Result<&[u8], ProtocolError> {
    parse_frame(raw).map(|(_, payload)| payload)
}

/// Lowercase hex rendering used in log output
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = FrameHeader::new(0x0d, 12);
        let bytes = header.to_bytes();
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, header);
        assert_eq!(&bytes[0..3], &[0x55, 0x66, 0x01]);
        assert_eq!(&bytes[3..5], &[0x0c, 0x00]);
        assert_eq!(&bytes[5..7], &[0x00, 0x00]);
    }

    #[test]
    fn test_header_rejects_bad_marker() {
        let mut bytes = FrameHeader::new(0x01, 0).to_bytes();
        bytes[1] = 0x67;
        assert!(FrameHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_crc16_xmodem_check_value() {
        // Standard XMODEM check input
        assert_eq!(crc16_xmodem(b"123456789"), 0x31c3);
        assert_eq!(crc16_xmodem(&[]), 0x0000);
    }

    #[test]
    fn test_crc_bytes_are_swapped() {
        let prefix = [0x55, 0x66, 0x01, 0x01, 0x00, 0x00, 0x00, 0x08, 0x01];
        assert_eq!(crc16_xmodem(&prefix), 0x12d1);
        assert_eq!(compute_crc16(&prefix), [0xd1, 0x12]);
    }

    #[test]
    fn test_encode_center_frame() {
        let frame = encode_frame(0x08, &[0x01]).unwrap();
        let hex = to_hex(&frame);

        assert!(hex.starts_with("556601"));
        assert_eq!(hex, "556601010000000801d112");

        let (body, crc) = frame.split_at(frame.len() - CRC_SIZE);
        assert_eq!(compute_crc16(body), crc);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode_frame(0x01, &[]).unwrap();
        assert_eq!(to_hex(&frame), "556601000000000164c4");
    }

    #[test]
    fn test_decode_recovers_payload() {
        let payloads: [&[u8]; 4] = [&[], &[0x01], &[0x32, 0xce], &[0xab; 64]];
        for (cmd_id, payload) in payloads.iter().enumerate() {
            let frame = encode_frame(cmd_id as u8, payload).unwrap();
            assert_eq!(decode_frame(&frame).unwrap(), *payload);
        }
    }

    #[test]
    fn test_parse_exposes_header() {
        let frame = encode_frame(0x05, &[0xff]).unwrap();
        let (header, payload) = parse_frame(&frame).unwrap();

        assert_eq!(header.cmd_id, 0x05);
        assert_eq!(header.data_len, 1);
        assert_eq!(header.seq, 0);
        assert_eq!(payload, &[0xff]);
    }

    #[test]
    fn test_any_single_bit_flip_is_rejected() {
        let frame = encode_frame(0x0d, &[0x64, 0x00, 0x9c, 0xff, 0x00, 0x00]).unwrap();

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;

                let err = decode_frame(&corrupted).unwrap_err();
                assert!(
                    matches!(err, ProtocolError::ChecksumMismatch { .. }),
                    "flip at byte {} bit {} gave {:?}",
                    byte,
                    bit,
                    err
                );
            }
        }
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let err = decode_frame(&[0x55, 0x66, 0x01]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
        assert!(decode_frame(&[]).is_err());
    }

    #[test]
    fn test_declared_length_beyond_frame_is_malformed() {
        // Valid checksum over a header that claims 4 payload bytes but has 1
        let mut msg = FrameHeader::new(0x08, 4).to_bytes().to_vec();
        msg.push(0x01);
        let crc = compute_crc16(&msg);
        msg.extend_from_slice(&crc);

        let err = decode_frame(&msg).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
    }

    #[test]
    fn test_missing_marker_with_valid_crc_is_malformed() {
        let mut msg = vec![0xaa, 0xbb, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01];
        let crc = compute_crc16(&msg);
        msg.extend_from_slice(&crc);

        let err = decode_frame(&msg).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
    }

    #[test]
    fn test_reply_control_byte_is_not_checked() {
        // Devices answer with CTRL = 0x02
        let mut msg = FrameHeader::new(0x05, 2).to_bytes().to_vec();
        msg[2] = 0x02;
        msg.extend_from_slice(&[0x0f, 0x00]);
        let crc = compute_crc16(&msg);
        msg.extend_from_slice(&crc);

        assert_eq!(decode_frame(&msg).unwrap(), &[0x0f, 0x00]);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
        assert_eq!(to_hex(&[]), "");
    }
}
