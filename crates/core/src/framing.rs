//! MLLP byte framing for TCP transport.
//!
//! A framed message is `VT payload FS CR`. The frame carries no length prefix, so a payload
//! must not itself contain the end-block byte.

use crate::constants::{MLLP_END_BLOCK, MLLP_START_BLOCK, MLLP_TERMINATOR};
use crate::{GenerationError, GenerationResult};
use serde::{Deserialize, Serialize};

/// Number of bytes the frame adds around the payload.
pub const FRAME_OVERHEAD: usize = 3;

/// Description of a frame, reported next to the framed bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramingInfo {
    pub start_block: String,
    pub end_block: String,
    pub terminator: String,
    pub total_length: usize,
    pub payload_length: usize,
    pub frame_overhead: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramedMessage {
    pub bytes: Vec<u8>,
    pub info: FramingInfo,
}

impl FramedMessage {
    /// Lower-case hex rendering of the framed bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Wraps `payload` in an MLLP frame.
///
/// # Errors
///
/// Returns [`GenerationError::Encoding`] if the payload contains the end-block byte.
pub fn frame(payload: &str) -> GenerationResult<FramedMessage> {
    let payload = payload.as_bytes();
    if payload.contains(&MLLP_END_BLOCK) {
        return Err(GenerationError::Encoding(
            "payload contains the MLLP end-block byte".into(),
        ));
    }

    let mut bytes = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    bytes.push(MLLP_START_BLOCK);
    bytes.extend_from_slice(payload);
    bytes.push(MLLP_END_BLOCK);
    bytes.push(MLLP_TERMINATOR);

    let info = FramingInfo {
        start_block: format!("0x{MLLP_START_BLOCK:02X} (VT - Vertical Tab)"),
        end_block: format!("0x{MLLP_END_BLOCK:02X} (FS - File Separator)"),
        terminator: format!("0x{MLLP_TERMINATOR:02X} (CR - Carriage Return)"),
        total_length: bytes.len(),
        payload_length: payload.len(),
        frame_overhead: FRAME_OVERHEAD,
    };
    Ok(FramedMessage { bytes, info })
}

/// Strips an MLLP frame and returns the payload text.
///
/// # Errors
///
/// Returns [`GenerationError::InvalidInput`] if the frame markers are missing or the payload
/// is not UTF-8.
pub fn unframe(bytes: &[u8]) -> GenerationResult<String> {
    let payload = bytes
        .strip_prefix(&[MLLP_START_BLOCK])
        .and_then(|rest| rest.strip_suffix(&[MLLP_END_BLOCK, MLLP_TERMINATOR]))
        .ok_or_else(|| GenerationError::InvalidInput("not an MLLP frame".into()))?;
    String::from_utf8(payload.to_vec())
        .map_err(|e| GenerationError::InvalidInput(format!("framed payload is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_payload() {
        let framed = frame("MSH|^~\\&|A").expect("frames");
        assert_eq!(framed.bytes.first(), Some(&0x0B));
        assert_eq!(&framed.bytes[framed.bytes.len() - 2..], &[0x1C, 0x0D]);
        assert_eq!(framed.info.payload_length, 10);
        assert_eq!(framed.info.total_length, 13);
        assert_eq!(framed.info.frame_overhead, 3);
        assert!(framed.info.start_block.starts_with("0x0B"));
    }

    #[test]
    fn hex_output() {
        let framed = frame("AB").expect("frames");
        assert_eq!(framed.to_hex(), "0b41421c0d");
    }

    #[test]
    fn payload_length_counts_bytes() {
        let framed = frame("Ó Súilleabháin").expect("frames");
        assert_eq!(framed.info.payload_length, "Ó Súilleabháin".len());
        assert_eq!(unframe(&framed.bytes).expect("unframes"), "Ó Súilleabháin");
    }

    #[test]
    fn rejects_embedded_end_block() {
        assert!(frame("bad\u{1c}payload").is_err());
    }

    #[test]
    fn unframe_requires_markers() {
        assert!(unframe(b"MSH|").is_err());
        assert!(unframe(&[0x0B, b'A', 0x1C]).is_err());
    }
}
