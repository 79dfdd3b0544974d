//! Frame grammar (spec.md §6): ASCII, CR-LF terminated, half-duplex
//! request/response plus asynchronous unsolicited notifications.
//!
//! ```text
//! frame          = ( request | response | notification ), CRLF ;
//! request        = "[", object, identifier, [ subobject-sel ], operation, "]" ;
//! response       = "(", object, identifier, property-value, ")" ;
//! notification   = response ;                  (* identical syntax *)
//! ```

pub const CRLF: &[u8] = b"\r\n";

/// Scans `buf` for the next CR-LF terminated frame starting at offset 0.
/// Returns the frame body (without the CR-LF) and the total number of
/// bytes consumed including the terminator, or `None` if no complete
/// frame is present yet.
pub fn next_frame(buf: &[u8]) -> Option<(&[u8], usize)> {
    let pos = find_crlf(buf)?;
    Some((&buf[..pos], pos + CRLF.len()))
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Builds a bracket-delimited request frame: `[<body>]\r\n`.
pub fn build_request(body: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 3);
    out.push(b'[');
    out.extend_from_slice(body.as_bytes());
    out.push(b']');
    out.extend_from_slice(CRLF);
    out
}

/// Builds a paren-delimited response/notification frame: `(<body>)\r\n`.
pub fn build_response(body: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 3);
    out.push(b'(');
    out.extend_from_slice(body.as_bytes());
    out.push(b')');
    out.extend_from_slice(CRLF);
    out
}

/// The literal server generic error reply (spec.md §6).
pub const ERROR_FRAME: &[u8] = b"(ERROR)\r\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_frame_finds_first_line_only() {
        let buf = b"(ZName1\"Kitchen\")\r\n(QX)\r\n";
        let (frame, consumed) = next_frame(buf).unwrap();
        assert_eq!(frame, b"(ZName1\"Kitchen\")");
        assert_eq!(consumed, frame.len() + 2);
        let (frame2, _) = next_frame(&buf[consumed..]).unwrap();
        assert_eq!(frame2, b"(QX)");
    }

    #[test]
    fn next_frame_is_none_on_partial_frame() {
        assert!(next_frame(b"(ZName1\"Kitche").is_none());
    }

    #[test]
    fn build_request_and_response_round_trip_framing() {
        assert_eq!(build_request("Z1VUL-20"), b"[Z1VUL-20]\r\n");
        assert_eq!(build_response("Z1VUL-20"), b"(Z1VUL-20)\r\n");
    }
}
