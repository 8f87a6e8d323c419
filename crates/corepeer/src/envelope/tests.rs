use super::*;

#[test]
fn round_trips_request_frame() {
    let body = b"hello world";
    let frame = encode(MessageType::Request, 7, 42, body);
    let env = decode(&frame).unwrap();

    assert_eq!(env.kind, MessageType::Request);
    assert_eq!(env.id, 7);
    assert_eq!(env.method, 42);
    assert_eq!(env.body, body);
}

#[test]
fn round_trips_zero_length_body() {
    let frame = encode(MessageType::Response, 1, 3, &[]);
    let env = decode(&frame).unwrap();
    assert_eq!(env.body.len(), 0);
}

#[test]
fn method_id_boundary_values_round_trip() {
    for method in [0u16, 65535u16] {
        let frame = encode(MessageType::Request, 1, method, b"x");
        let env = decode(&frame).unwrap();
        assert_eq!(env.method, method);
    }
}

#[test]
fn correlation_id_round_trips_at_max() {
    let frame = encode(MessageType::Notification, u32::MAX, 0, &[]);
    let env = decode(&frame).unwrap();
    assert_eq!(env.id, u32::MAX);
}

#[test]
fn reserved_byte_is_zero_on_write() {
    let frame = encode(MessageType::Request, 0, 0, &[]);
    assert_eq!(frame[1], 0);
}

#[test]
fn decode_ignores_nonzero_reserved_byte() {
    let mut frame = encode(MessageType::Request, 5, 1, b"abc");
    frame[1] = 0xFF;
    let env = decode(&frame).unwrap();
    assert_eq!(env.id, 5);
    assert_eq!(env.body, b"abc");
}

#[test]
fn decode_rejects_frames_shorter_than_header() {
    let short = vec![0u8; HEADER_LEN - 1];
    assert_eq!(decode(&short).unwrap_err(), ParseError::TooShort);
}

#[test]
fn decode_rejects_body_length_exceeding_buffer() {
    let mut frame = encode(MessageType::Request, 1, 1, b"abc");
    // Claim a body length far larger than what's actually present.
    frame[8..12].copy_from_slice(&100u32.to_le_bytes());
    assert_eq!(decode(&frame).unwrap_err(), ParseError::Incomplete);
}

#[test]
fn decode_rejects_unknown_message_type() {
    let mut frame = encode(MessageType::Request, 1, 1, &[]);
    frame[0] = 9;
    assert_eq!(decode(&frame).unwrap_err(), ParseError::InvalidMessageType(9));
}

#[test]
fn encode_error_round_trips_code_and_message() {
    let frame = encode_error(11, -5, "boom");
    let env = decode(&frame).unwrap();
    assert_eq!(env.kind, MessageType::ErrorResponse);
    assert_eq!(env.method, 0, "error responses always carry method 0");
    assert_eq!(env.id, 11);

    let (code, message) = decode_error(env.body).unwrap();
    assert_eq!(code, -5);
    assert_eq!(message, "boom");
}

#[test]
fn error_code_is_signed() {
    let frame = encode_error(1, -1, "");
    let env = decode(&frame).unwrap();
    let (code, message) = decode_error(env.body).unwrap();
    assert_eq!(code, -1);
    assert_eq!(message, "");
}

#[test]
fn decode_error_rejects_body_shorter_than_code() {
    assert_eq!(decode_error(&[0, 1, 2]).unwrap_err(), ParseError::TooShort);
}

#[test]
fn decode_error_rejects_invalid_utf8() {
    let mut body = (-1i32).to_le_bytes().to_vec();
    body.extend_from_slice(&[0xFF, 0xFE]);
    assert_eq!(decode_error(&body).unwrap_err(), ParseError::InvalidUtf8);
}

#[test]
fn round_trips_random_frames() {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let kind = match rng.gen_range(0..4) {
            0 => MessageType::Request,
            1 => MessageType::Notification,
            2 => MessageType::Response,
            _ => MessageType::ErrorResponse,
        };
        let id: u32 = rng.gen();
        let method: u16 = rng.gen();
        let body_len = rng.gen_range(0..64);
        let body: Vec<u8> = (0..body_len).map(|_| rng.gen()).collect();

        let frame = encode(kind, id, method, &body);
        let env = decode(&frame).unwrap();

        assert_eq!(env.kind, kind);
        assert_eq!(env.id, id);
        assert_eq!(env.method, method);
        assert_eq!(env.body, body.as_slice());
    }
}

#[test]
fn encode_produces_exact_body_length_no_padding() {
    let body = b"exact";
    let frame = encode(MessageType::Request, 1, 1, body);
    assert_eq!(frame.len(), HEADER_LEN + body.len());
    let body_len = u32::from_le_bytes([frame[8], frame[9], frame[10], frame[11]]);
    assert_eq!(body_len as usize, body.len());
}
