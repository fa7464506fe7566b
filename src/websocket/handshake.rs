/*
 * websocket/handshake.rs
 * Copyright (C) 2026 corewire contributors
 *
 * This file is part of corewire, a client-side HTTP/WebSocket/SSE networking stack.
 *
 * corewire is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * corewire is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with corewire.  If not, see <http://www.gnu.org/licenses/>.
 */

//! RFC 6455 opening handshake (spec §4.6): build the upgrade request, then drive the HTTP/1.1
//! parser far enough to read the `101 Switching Protocols` response and verify `Sec-WebSocket-Accept`.

use crate::crypto::ws_accept_key;
use crate::error::WsError;
use crate::http::parser::{FeedOutcome, ResponseParser};
use crate::url::ParsedUrl;

/// Build the GET /path HTTP/1.1 upgrade request carrying `key` as `Sec-WebSocket-Key`.
pub fn build_handshake_request(url: &ParsedUrl, key: &str) -> Vec<u8> {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        path = url.request_path(),
        host = url.host_header(),
        key = key,
    )
    .into_bytes()
}

/// `true` iff `accept` is the value the server must send back for `client_key`.
pub fn verify_accept(client_key: &str, accept: &str) -> bool {
    ws_accept_key(client_key) == accept
}

/// Feed response bytes to `parser` until the status line and headers are available, then check
/// for `101` plus a correct `Sec-WebSocket-Accept`. Returns any leftover bytes the caller already
/// read past the header block (frame data may arrive in the same TCP segment as the handshake
/// response).
pub fn finish_handshake(
    parser: &mut ResponseParser,
    client_key: &str,
) -> Result<(), WsError> {
    loop {
        match parser.feed(&[]) {
            FeedOutcome::NeedMore => return Err(WsError::Handshake("incomplete response".to_string())),
            FeedOutcome::HeadersDone => break,
            FeedOutcome::ChunkReady => {
                let _ = parser.take_chunk();
            }
            FeedOutcome::Done => break,
            FeedOutcome::Error(msg) => return Err(WsError::Handshake(msg)),
        }
    }

    if parser.status_code() != 101 {
        return Err(WsError::Handshake(format!(
            "expected 101 Switching Protocols, got {}",
            parser.status_code()
        )));
    }

    let upgrade_ok = parser
        .header("upgrade")
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    if !upgrade_ok {
        return Err(WsError::Handshake("missing Upgrade: websocket".to_string()));
    }

    let accept = parser
        .header("sec-websocket-accept")
        .ok_or_else(|| WsError::Handshake("missing Sec-WebSocket-Accept".to_string()))?;
    if !verify_accept(client_key, accept) {
        return Err(WsError::Handshake("Sec-WebSocket-Accept mismatch".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::parse;

    #[test]
    fn builds_expected_request_lines() {
        let url = parse("ws://example.com/chat").unwrap();
        let req = build_handshake_request(&url, "dGhlIHNhbXBsZSBub25jZQ==");
        let text = String::from_utf8(req).unwrap();
        assert!(text.starts_with("GET /chat HTTP/1.1\r\n"));
        assert!(text.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n"));
        assert!(text.contains("Upgrade: websocket\r\n"));
    }

    #[test]
    fn finishes_handshake_on_valid_101_response() {
        let mut parser = ResponseParser::new();
        parser.feed(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
              \r\n",
        );
        let result = finish_handshake(&mut parser, "dGhlIHNhbXBsZSBub25jZQ==");
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_wrong_accept_key() {
        let mut parser = ResponseParser::new();
        parser.feed(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Upgrade: websocket\r\n\
              Sec-WebSocket-Accept: wrongvalue==\r\n\
              \r\n",
        );
        let result = finish_handshake(&mut parser, "dGhlIHNhbXBsZSBub25jZQ==");
        assert!(result.is_err());
    }
}
