// Frame layout: [type u8][seq u32 BE][msgpack payload]

use crate::comm::error::{Result, TransportError};
use crate::comm::types::{MsgType, RequestPayload, ResponsePayload};
use serde::Serialize;

/// Header length: type (1) + seq (4)
pub const HEADER_LEN: usize = 5;

/// Largest UDP payload that fits in a single IPv4 datagram
pub const MAX_DATAGRAM_BYTES: usize = 65_507;

fn frame(msg_type: MsgType, seq: u32, payload: Option<&impl Serialize>) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&seq.to_be_bytes());

    if let Some(payload) = payload {
        // Named fields, so either side can add optional ones later
        let mut ser = rmp_serde::Serializer::new(&mut buf).with_struct_map();
        payload.serialize(&mut ser)?;
    }
    Ok(buf)
}

/// Read the type and sequence number from the front of a frame
pub fn decode_header(data: &[u8]) -> Result<(MsgType, u32)> {
    let Some(header) = data.get(..HEADER_LEN) else {
        return Err(TransportError::Malformed(format!(
            "frame of {} bytes is shorter than the header",
            data.len()
        )));
    };

    let msg_type = MsgType::try_from(header[0])
        .map_err(|b| TransportError::Malformed(format!("unknown message type 0x{:02x}", b)))?;
    let seq = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    Ok((msg_type, seq))
}

pub fn decode_request_payload(data: &[u8]) -> Result<RequestPayload> {
    Ok(rmp_serde::from_slice(data)?)
}

pub fn decode_response_payload(data: &[u8]) -> Result<ResponsePayload> {
    Ok(rmp_serde::from_slice(data)?)
}

pub fn encode_request(seq: u32, content: &str) -> Result<Vec<u8>> {
    let payload = RequestPayload {
        content: content.to_string(),
    };
    frame(MsgType::Request, seq, Some(&payload))
}

pub fn encode_request_ack(seq: u32) -> Result<Vec<u8>> {
    frame(MsgType::RequestAck, seq, None::<&()>)
}

pub fn encode_response(seq: u32, payload: &ResponsePayload) -> Result<Vec<u8>> {
    frame(MsgType::Response, seq, Some(payload))
}

/// Encode a response, swapping in a 413 error when it cannot fit one datagram
pub fn encode_response_bounded(seq: u32, payload: &ResponsePayload) -> Result<Vec<u8>> {
    let bytes = encode_response(seq, payload)?;
    if bytes.len() <= MAX_DATAGRAM_BYTES {
        return Ok(bytes);
    }

    let message = format!(
        "Response too large for a single datagram ({} bytes); narrow the command output",
        bytes.len()
    );
    encode_response(seq, &ResponsePayload::failure(413, &message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame() {
        let packet = encode_request(1, r#"{"op":"list_commands"}"#).unwrap();
        let (msg_type, seq) = decode_header(&packet).unwrap();

        assert_eq!(msg_type, MsgType::Request);
        assert_eq!(seq, 1);

        let payload = decode_request_payload(&packet[HEADER_LEN..]).unwrap();
        assert_eq!(payload.content, r#"{"op":"list_commands"}"#);
    }

    #[test]
    fn test_ack_is_header_only() {
        let packet = encode_request_ack(42).unwrap();

        assert_eq!(packet.len(), HEADER_LEN);
        let (msg_type, seq) = decode_header(&packet).unwrap();
        assert_eq!(msg_type, MsgType::RequestAck);
        assert_eq!(seq, 42);
    }

    #[test]
    fn test_response_carries_status() {
        let payload = ResponsePayload {
            status: 404,
            content: r#"{"status":"error","message":"Command not found"}"#.to_string(),
            is_error: true,
        };

        let packet = encode_response(9, &payload).unwrap();
        let (msg_type, seq) = decode_header(&packet).unwrap();
        assert_eq!(msg_type, MsgType::Response);
        assert_eq!(seq, 9);

        let decoded = decode_response_payload(&packet[HEADER_LEN..]).unwrap();
        assert_eq!(decoded.status, 404);
        assert!(decoded.is_error);
        assert!(decoded.content.contains("Command not found"));
    }

    #[test]
    fn test_unknown_type() {
        let mut packet = vec![0xFFu8];
        packet.extend_from_slice(&1u32.to_be_bytes());

        let err = decode_header(&packet).unwrap_err();
        assert!(matches!(err, TransportError::Malformed(ref m) if m.contains("0xff")));
    }

    #[test]
    fn test_short_frame() {
        assert!(decode_header(&[0x01, 0x00, 0x00]).is_err());
        assert!(decode_header(&[]).is_err());
        assert!(decode_header(&[0x01, 0x00, 0x00, 0x00, 0x01]).is_ok());
    }

    #[test]
    fn test_seq_big_endian() {
        let packet = encode_request_ack(256).unwrap();
        assert_eq!(packet[1..HEADER_LEN], [0x00, 0x00, 0x01, 0x00]);

        let packet = encode_request_ack(u32::MAX).unwrap();
        let (_, seq) = decode_header(&packet).unwrap();
        assert_eq!(seq, u32::MAX);
    }

    #[test]
    fn test_oversized_response_becomes_413() {
        let payload = ResponsePayload {
            status: 200,
            content: "x".repeat(MAX_DATAGRAM_BYTES),
            is_error: false,
        };

        let packet = encode_response_bounded(3, &payload).unwrap();
        assert!(packet.len() <= MAX_DATAGRAM_BYTES);

        let decoded = decode_response_payload(&packet[HEADER_LEN..]).unwrap();
        assert_eq!(decoded.status, 413);
        assert!(decoded.is_error);
        assert!(decoded.content.contains("too large"));
    }

    #[test]
    fn test_small_response_unchanged() {
        let payload = ResponsePayload {
            status: 200,
            content: "{}".to_string(),
            is_error: false,
        };
        assert_eq!(
            encode_response_bounded(4, &payload).unwrap(),
            encode_response(4, &payload).unwrap()
        );
    }

    #[test]
    fn test_garbage_payload() {
        assert!(matches!(
            decode_request_payload(&[0xc1, 0x00]),
            Err(TransportError::Malformed(_))
        ));
    }
}
