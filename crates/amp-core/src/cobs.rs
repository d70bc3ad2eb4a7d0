//! Consistent Overhead Byte Stuffing and the custom serial audio frame header.
//!
//! Grounded in `original_source/src/tests/cobs-test-1.cpp` and
//! `original_source/src/tests/sdrc-msg-test-1.cpp`: a standard COBS codec plus
//! a 3-byte wire header `{0x00, 0x01, classTag}` where `classTag` selects a
//! short vs. long framing class (spec §4.3/§6).

use crate::error::NodeError;

/// Short-COBS class tag: payload known not to exceed a short bound.
pub const CLASS_TAG_SHORT: u8 = 1;
/// Long-COBS class tag.
pub const CLASS_TAG_LONG: u8 = 2;

/// Message type byte following the leading `0x00` in the wire header.
const MESSAGE_TYPE_AUDIO: u8 = 0x01;

/// Encodes `input` using Consistent Overhead Byte Stuffing.
///
/// The returned buffer never contains a `0x00` byte and is always
/// `input.len() + ceil(input.len() / 254) + 1` bytes or fewer... in practice
/// exactly `input.len() + 1` for any input shorter than 254 bytes without an
/// internal run of 254 non-zero bytes, matching the reference test vectors
/// (320 bytes of `0x18` encodes to exactly 322 bytes).
#[must_use]
pub fn cobs_encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 254 + 2);
    let mut code_index = 0usize;
    out.push(0); // placeholder for first code byte
    let mut code = 1u8;

    for &byte in input {
        if byte == 0 {
            out[code_index] = code;
            code_index = out.len();
            out.push(0); // placeholder
            code = 1;
        } else {
            out.push(byte);
            code += 1;
            if code == 0xFF {
                out[code_index] = code;
                code_index = out.len();
                out.push(0); // placeholder
                code = 1;
            }
        }
    }
    out[code_index] = code;
    out
}

/// Decodes a COBS-encoded buffer (without the trailing `0x00` delimiter) back
/// into the original bytes.
///
/// # Errors
/// Returns [`NodeError::DecodeFailure`] if `input` is truncated or malformed
/// (a code byte points past the end of the buffer).
pub fn cobs_decode(input: &[u8]) -> Result<Vec<u8>, NodeError> {
    if input.is_empty() {
        return Err(NodeError::DecodeFailure("empty COBS input".into()));
    }
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0usize;
    while i < input.len() {
        let code = input[i] as usize;
        if code == 0 {
            return Err(NodeError::DecodeFailure("zero code byte in COBS stream".into()));
        }
        let data_start = i + 1;
        let data_end = data_start + (code - 1);
        if data_end > input.len() {
            return Err(NodeError::DecodeFailure("truncated COBS block".into()));
        }
        out.extend_from_slice(&input[data_start..data_end]);
        i = data_end;
        if code < 0xFF && i < input.len() {
            out.push(0);
        }
    }
    Ok(out)
}

/// Builds the 3-byte-header wire frame for a payload: `[0x00][0x01][classTag]`
/// followed by the COBS-encoded payload.
///
/// `short_bound` is the maximum payload length (exclusive of header) eligible
/// for [`CLASS_TAG_SHORT`]; above it, [`CLASS_TAG_LONG`] is used. Both tags
/// decode identically - the distinction exists for the sender's buffer sizing.
#[must_use]
pub fn encode_frame(payload: &[u8], short_bound: usize) -> Vec<u8> {
    let class_tag = if payload.len() <= short_bound {
        CLASS_TAG_SHORT
    } else {
        CLASS_TAG_LONG
    };
    let encoded = cobs_encode(payload);
    let mut frame = Vec::with_capacity(3 + encoded.len());
    frame.push(0x00);
    frame.push(MESSAGE_TYPE_AUDIO);
    frame.push(class_tag);
    frame.extend_from_slice(&encoded);
    frame
}

/// Parses a wire frame produced by [`encode_frame`], returning the decoded
/// payload.
///
/// # Errors
/// Returns [`NodeError::DecodeFailure`] if the header is malformed or the
/// COBS body fails to decode, and [`NodeError::ProtocolError`] for an
/// unrecognized `classTag`.
pub fn decode_frame(frame: &[u8]) -> Result<Vec<u8>, NodeError> {
    if frame.len() < 3 {
        return Err(NodeError::DecodeFailure("frame shorter than header".into()));
    }
    if frame[0] != 0x00 || frame[1] != MESSAGE_TYPE_AUDIO {
        return Err(NodeError::DecodeFailure("bad wire frame header".into()));
    }
    match frame[2] {
        CLASS_TAG_SHORT | CLASS_TAG_LONG => cobs_decode(&frame[3..]),
        other => Err(NodeError::ProtocolError(format!(
            "unrecognized classTag {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_320_bytes_of_0x18() {
        let input = vec![0x18u8; 320];
        let encoded = cobs_encode(&input);
        assert_eq!(encoded.len(), 322);
        assert!(!encoded.contains(&0));
        let decoded = cobs_decode(&encoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trips_ramp_of_300_bytes() {
        let input: Vec<u8> = (0..300u32).map(|i| (i % 256) as u8).collect();
        let encoded = cobs_encode(&input);
        let decoded = cobs_decode(&encoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trips_small_sequential_block() {
        let input = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let encoded = cobs_encode(&input);
        assert_eq!(encoded.len(), 9);
        let decoded = cobs_decode(&encoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trips_buffers_with_internal_zeros() {
        let cases: &[&[u8]] = &[
            &[0, 2, 3, 0xff, 5, 6, 7, 0],
            &[0, 2, 3, 0xff, 5, 6, 7, 0xff],
            &[1, 2, 3, 0xff, 5, 6, 7, 1],
            &[0, 0, 0, 0, 0, 0, 0, 0],
        ];
        for case in cases {
            let encoded = cobs_encode(case);
            assert!(!encoded.contains(&0));
            let decoded = cobs_decode(&encoded).unwrap();
            assert_eq!(decoded.as_slice(), *case);
        }
    }

    #[test]
    fn alternating_322_byte_input_encodes_to_323() {
        let input: Vec<u8> = (0..322).map(|i| if i % 2 == 0 { 0x18 } else { 0x00 }).collect();
        let encoded = cobs_encode(&input);
        assert_eq!(encoded.len(), 323);
    }

    #[test]
    fn decode_reports_error_on_truncated_input() {
        let input = vec![0x18u8; 320];
        let encoded = cobs_encode(&input);
        // Truncate the stream so the final code byte overruns the buffer.
        let truncated = &encoded[..encoded.len() - 1];
        assert!(cobs_decode(truncated).is_err());
    }

    #[test]
    fn wire_frame_selects_class_tag_by_bound() {
        let short_payload = vec![0x18u8; 8];
        let frame = encode_frame(&short_payload, 160);
        assert_eq!(frame[0], 0x00);
        assert_eq!(frame[1], 0x01);
        assert_eq!(frame[2], CLASS_TAG_SHORT);
        assert_eq!(decode_frame(&frame).unwrap(), short_payload);

        let long_payload = vec![0x18u8; 320];
        let frame = encode_frame(&long_payload, 160);
        assert_eq!(frame[2], CLASS_TAG_LONG);
        assert_eq!(decode_frame(&frame).unwrap(), long_payload);
    }

    #[test]
    fn decode_frame_rejects_bad_header() {
        let mut frame = encode_frame(&[1, 2, 3], 160);
        frame[1] = 0x02;
        assert!(decode_frame(&frame).is_err());
    }
}
