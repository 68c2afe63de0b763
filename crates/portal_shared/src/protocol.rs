//! Wire framing for command and reply messages.
//!
//! Each message is an opaque payload preceded by a fixed 4-byte header
//! holding its length as a little-endian `u32`:
//!
//! ```text
//! ┌──────────────┬───────────────────────────┐
//! │ len (u32 LE) │ payload (len bytes)       │
//! └──────────────┴───────────────────────────┘
//! ```
//!
//! The payload grammar belongs to the embedding page and is never inspected here.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Size of [`FrameHeader`] on the wire.
pub const FRAME_HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

/// Length prefix in front of every framed message.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameHeader {
    /// Payload length, stored little-endian.
    len_le: u32,
}

impl FrameHeader {
    /// Builds a header for a payload of `len` bytes.
    #[inline]
    #[must_use]
    pub const fn new(len: u32) -> Self {
        Self { len_le: len.to_le() }
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u32 {
        u32::from_le(self.len_le)
    }

    /// Returns true for a zero-length payload.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors produced while framing or unframing a message stream.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The stream ended inside a header or payload.
    #[error("truncated frame at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        /// Offset of the frame that could not be completed.
        offset: usize,
        /// Bytes required to finish the frame.
        needed: usize,
        /// Bytes left in the stream.
        available: usize,
    },

    /// Payload does not fit in a `u32` length prefix.
    #[error("payload of {0} bytes exceeds the frame length limit")]
    TooLarge(usize),
}

/// Appends one framed message to `out`.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the payload length does not fit in `u32`.
pub fn encode_frame(payload: &[u8], out: &mut Vec<u8>) -> Result<(), FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;
    out.reserve(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(bytemuck::bytes_of(&FrameHeader::new(len)));
    out.extend_from_slice(payload);
    Ok(())
}

/// Splits a stream of framed messages into payload slices.
///
/// The whole stream must consist of complete frames.
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] if the stream ends mid-frame.
pub fn decode_frames(stream: &[u8]) -> Result<Vec<&[u8]>, FrameError> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < stream.len() {
        let rest = &stream[offset..];
        if rest.len() < FRAME_HEADER_LEN {
            return Err(FrameError::Truncated {
                offset,
                needed: FRAME_HEADER_LEN,
                available: rest.len(),
            });
        }

        let header: FrameHeader = bytemuck::pod_read_unaligned(&rest[..FRAME_HEADER_LEN]);
        let len = header.len() as usize;
        let body = &rest[FRAME_HEADER_LEN..];
        if body.len() < len {
            return Err(FrameError::Truncated {
                offset,
                needed: FRAME_HEADER_LEN + len,
                available: rest.len(),
            });
        }

        frames.push(&body[..len]);
        offset += FRAME_HEADER_LEN + len;
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_four_bytes() {
        assert_eq!(FRAME_HEADER_LEN, 4);
    }

    #[test]
    fn test_header_bytes_are_little_endian() {
        let mut out = Vec::new();
        encode_frame(b"abc", &mut out).unwrap();
        assert_eq!(&out[..4], &[3, 0, 0, 0]);
        assert_eq!(&out[4..], b"abc");
    }

    #[test]
    fn test_decode_multiple_frames() {
        let mut stream = Vec::new();
        encode_frame(b"GET_STATE", &mut stream).unwrap();
        encode_frame(b"", &mut stream).unwrap();
        encode_frame(b"PAUSE_TOGGLE", &mut stream).unwrap();

        let frames = decode_frames(&stream).unwrap();
        assert_eq!(frames, vec![&b"GET_STATE"[..], &b""[..], &b"PAUSE_TOGGLE"[..]]);
    }

    #[test]
    fn test_decode_empty_stream() {
        assert!(decode_frames(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let err = decode_frames(&[1, 0]).unwrap_err();
        assert_eq!(
            err,
            FrameError::Truncated {
                offset: 0,
                needed: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_truncated_payload() {
        let mut stream = Vec::new();
        encode_frame(b"ok", &mut stream).unwrap();
        stream.extend_from_slice(&[10, 0, 0, 0, b'x']);

        let err = decode_frames(&stream).unwrap_err();
        assert_eq!(
            err,
            FrameError::Truncated {
                offset: 6,
                needed: 14,
                available: 5
            }
        );
    }
}
