/*
 * http/parser.rs
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

//! Incremental HTTP/1.1 response parser (spec §4.4): a pure state machine fed arbitrary byte
//! slices via `feed`, generalized from the teacher's `ResponseParser` (which pushes callbacks
//! into an `H1ResponseHandler`) into an explicit outcome-enum shape.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};

use crate::config::{MAX_HEADER_COUNT, MAX_STATUS_TEXT_BYTES};

/// One step of progress reported by `feed`. A single `feed` call may make several steps of
/// progress at once; callers should keep calling `feed(&[])` until `NeedMore` to drain all of
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// No further progress possible without more input.
    NeedMore,
    /// Status line and headers are fully parsed; use the accessors to read them.
    HeadersDone,
    /// A body chunk is available via `take_chunk`.
    ChunkReady,
    /// The response (including any trailers) is fully parsed.
    Done,
    /// The response is malformed; the parser will not make further progress.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    ContentLength(u64),
    Chunked,
    UntilClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StatusLine,
    Headers,
    Body,
    ChunkSize,
    ChunkData,
    ChunkTrailer,
    Done,
    Error,
}

pub struct ResponseParser {
    buf: BytesMut,
    state: State,
    status_code: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    body_mode: Option<BodyMode>,
    remaining: u64,
    events: VecDeque<FeedOutcome>,
    chunks: VecDeque<Vec<u8>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            state: State::StatusLine,
            status_code: 0,
            status_text: String::new(),
            headers: Vec::new(),
            body_mode: None,
            remaining: 0,
            events: VecDeque::new(),
            chunks: VecDeque::new(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Pop the next ready body chunk, if any (spec §4.4: body surfaced incrementally, not
    /// batched into one buffer).
    pub fn take_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.pop_front()
    }

    /// `true` once no more body data will arrive and the transport may be reused or closed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Drain and return any buffered bytes not yet consumed by the state machine. Used by the
    /// WebSocket handshake, where frame data can legitimately arrive in the same read as the
    /// `101` response's trailing CRLF.
    pub fn take_unconsumed(&mut self) -> Vec<u8> {
        self.buf.split().to_vec()
    }

    /// Feed newly received bytes (or an empty slice to continue draining queued events) and
    /// return the next outcome.
    pub fn feed(&mut self, data: &[u8]) -> FeedOutcome {
        if !data.is_empty() {
            self.buf.extend_from_slice(data);
            self.run();
        }
        self.events.pop_front().unwrap_or(FeedOutcome::NeedMore)
    }

    /// Signal that the transport reached EOF. Only meaningful while reading an
    /// until-close body, where EOF itself marks the end of the message.
    pub fn feed_eof(&mut self) -> FeedOutcome {
        if self.state == State::Body && self.body_mode == Some(BodyMode::UntilClose) {
            if !self.buf.is_empty() {
                self.chunks.push_back(self.buf.split().to_vec());
                self.events.push_back(FeedOutcome::ChunkReady);
            }
            self.state = State::Done;
            self.events.push_back(FeedOutcome::Done);
        } else if self.state != State::Done && self.state != State::Error {
            self.fail("connection closed before response was complete");
        }
        self.events.pop_front().unwrap_or(FeedOutcome::NeedMore)
    }

    fn fail(&mut self, msg: &str) {
        self.state = State::Error;
        self.events.push_back(FeedOutcome::Error(msg.to_string()));
    }

    fn run(&mut self) {
        loop {
            match self.state {
                State::StatusLine => {
                    if !self.parse_status_line() {
                        break;
                    }
                }
                State::Headers => {
                    if !self.parse_header_line() {
                        break;
                    }
                }
                State::Body => {
                    if !self.consume_body() {
                        break;
                    }
                }
                State::ChunkSize => {
                    if !self.parse_chunk_size() {
                        break;
                    }
                }
                State::ChunkData => {
                    if !self.consume_chunk_data() {
                        break;
                    }
                }
                State::ChunkTrailer => {
                    if !self.parse_trailer_line() {
                        break;
                    }
                }
                State::Done | State::Error => break,
            }
        }
    }

    fn find_crlf(&self) -> Option<usize> {
        self.buf.windows(2).position(|w| w == b"\r\n")
    }

    fn parse_status_line(&mut self) -> bool {
        let Some(pos) = self.find_crlf() else {
            return false;
        };
        let line = self.buf.split_to(pos + 2);
        let line = &line[..pos];
        let text = match std::str::from_utf8(line) {
            Ok(t) => t,
            Err(_) => {
                self.fail("status line is not valid UTF-8");
                return false;
            }
        };
        if !text.starts_with("HTTP/1.") {
            self.fail("missing HTTP/1.x status line");
            return false;
        }
        let mut parts = text.splitn(3, ' ');
        let _version = parts.next();
        let code = match parts.next().and_then(|c| c.parse::<u16>().ok()) {
            Some(c) => c,
            None => {
                self.fail("invalid status code");
                return false;
            }
        };
        let reason = parts.next().unwrap_or("");
        self.status_code = code;
        self.status_text = reason.chars().take(MAX_STATUS_TEXT_BYTES).collect();
        self.state = State::Headers;
        true
    }

    fn parse_header_line(&mut self) -> bool {
        let Some(pos) = self.find_crlf() else {
            return false;
        };
        let line = self.buf.split_to(pos + 2);
        let line = &line[..pos];
        if line.is_empty() {
            self.on_headers_done();
            return self.state != State::Error;
        }
        if self.headers.len() >= MAX_HEADER_COUNT {
            self.fail("too many response headers");
            return false;
        }
        let text = match std::str::from_utf8(line) {
            Ok(t) => t,
            Err(_) => {
                self.fail("header line is not valid UTF-8");
                return false;
            }
        };
        let Some((name, value)) = text.split_once(':') else {
            self.fail("malformed header line");
            return false;
        };
        self.headers
            .push((name.trim().to_string(), value.trim().to_string()));
        true
    }

    fn on_headers_done(&mut self) {
        let transfer_chunked = self
            .header("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false);
        let content_length = self.header("content-length").and_then(|v| v.trim().parse::<u64>().ok());

        self.body_mode = Some(if transfer_chunked {
            BodyMode::Chunked
        } else if let Some(len) = content_length {
            BodyMode::ContentLength(len)
        } else {
            BodyMode::UntilClose
        });

        self.events.push_back(FeedOutcome::HeadersDone);

        match self.body_mode {
            Some(BodyMode::ContentLength(0)) => {
                self.state = State::Done;
                self.events.push_back(FeedOutcome::Done);
            }
            Some(BodyMode::ContentLength(len)) => {
                self.remaining = len;
                self.state = State::Body;
            }
            Some(BodyMode::Chunked) => {
                self.state = State::ChunkSize;
            }
            Some(BodyMode::UntilClose) => {
                self.state = State::Body;
            }
            None => unreachable!(),
        }
    }

    fn consume_body(&mut self) -> bool {
        match self.body_mode {
            Some(BodyMode::ContentLength(_)) => {
                if self.buf.is_empty() {
                    return false;
                }
                let take = self.remaining.min(self.buf.len() as u64) as usize;
                if take == 0 {
                    return false;
                }
                let chunk = self.buf.split_to(take);
                self.remaining -= take as u64;
                self.chunks.push_back(chunk.to_vec());
                self.events.push_back(FeedOutcome::ChunkReady);
                if self.remaining == 0 {
                    self.state = State::Done;
                    self.events.push_back(FeedOutcome::Done);
                }
                true
            }
            Some(BodyMode::UntilClose) => {
                if self.buf.is_empty() {
                    return false;
                }
                let chunk = self.buf.split();
                self.chunks.push_back(chunk.to_vec());
                self.events.push_back(FeedOutcome::ChunkReady);
                false
            }
            _ => false,
        }
    }

    fn parse_chunk_size(&mut self) -> bool {
        let Some(pos) = self.find_crlf() else {
            return false;
        };
        let line = self.buf.split_to(pos + 2);
        let mut line = &line[..pos];
        // Ignore chunk extensions after ';'.
        if let Some(semi) = line.iter().position(|&b| b == b';') {
            line = &line[..semi];
        }
        let text = match std::str::from_utf8(line) {
            Ok(t) => t.trim(),
            Err(_) => {
                self.fail("chunk size is not valid UTF-8");
                return false;
            }
        };
        let size = match u64::from_str_radix(text, 16) {
            Ok(s) => s,
            Err(_) => {
                self.fail("invalid chunk size");
                return false;
            }
        };
        if size == 0 {
            self.state = State::ChunkTrailer;
        } else {
            self.remaining = size;
            self.state = State::ChunkData;
        }
        true
    }

    fn consume_chunk_data(&mut self) -> bool {
        if self.remaining > 0 {
            if self.buf.is_empty() {
                return false;
            }
            let take = self.remaining.min(self.buf.len() as u64) as usize;
            if take == 0 {
                return false;
            }
            let chunk = self.buf.split_to(take);
            self.remaining -= take as u64;
            self.chunks.push_back(chunk.to_vec());
            self.events.push_back(FeedOutcome::ChunkReady);
            return true;
        }
        // Consume the trailing CRLF after chunk data.
        if self.buf.len() < 2 {
            return false;
        }
        if &self.buf[..2] != b"\r\n" {
            self.fail("malformed chunk terminator");
            return false;
        }
        self.buf.advance(2);
        self.state = State::ChunkSize;
        true
    }

    fn parse_trailer_line(&mut self) -> bool {
        let Some(pos) = self.find_crlf() else {
            return false;
        };
        let line = self.buf.split_to(pos + 2);
        if line.len() == 2 {
            // Bare CRLF: end of trailers, end of message. Trailer fields themselves are
            // accepted but not surfaced (spec §4.4).
            self.state = State::Done;
            self.events.push_back(FeedOutcome::Done);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_content_length_response() {
        let mut p = ResponseParser::new();
        let outcome = p.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
        assert_eq!(outcome, FeedOutcome::HeadersDone);
        assert_eq!(p.status_code(), 200);
        assert_eq!(p.status_text(), "OK");
        assert_eq!(p.feed(&[]), FeedOutcome::ChunkReady);
        assert_eq!(p.take_chunk(), Some(b"hello".to_vec()));
        assert_eq!(p.feed(&[]), FeedOutcome::Done);
        assert!(p.is_done());
    }

    #[test]
    fn parses_chunked_response_across_feeds() {
        let mut p = ResponseParser::new();
        assert_eq!(
            p.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"),
            FeedOutcome::HeadersDone
        );
        assert_eq!(p.feed(b"4\r\nWiki\r\n"), FeedOutcome::ChunkReady);
        assert_eq!(p.take_chunk(), Some(b"Wiki".to_vec()));
        assert_eq!(p.feed(b"0\r\n\r\n"), FeedOutcome::Done);
    }

    #[test]
    fn rejects_missing_status_line() {
        let mut p = ResponseParser::new();
        let outcome = p.feed(b"NOT HTTP\r\n\r\n");
        assert!(matches!(outcome, FeedOutcome::Error(_)));
    }

    #[test]
    fn too_many_headers_is_an_error() {
        let mut p = ResponseParser::new();
        let mut req = String::from("HTTP/1.1 200 OK\r\n");
        for i in 0..100 {
            req.push_str(&format!("X-H{}: v\r\n", i));
        }
        req.push_str("\r\n");
        let mut outcome = p.feed(req.as_bytes());
        while outcome == FeedOutcome::NeedMore {
            outcome = p.feed(&[]);
        }
        assert!(matches!(outcome, FeedOutcome::Error(_)));
    }

    #[test]
    fn until_close_body_completes_on_eof() {
        let mut p = ResponseParser::new();
        assert_eq!(
            p.feed(b"HTTP/1.1 200 OK\r\n\r\nhello world"),
            FeedOutcome::HeadersDone
        );
        assert_eq!(p.feed(&[]), FeedOutcome::ChunkReady);
        assert_eq!(p.take_chunk(), Some(b"hello world".to_vec()));
        assert_eq!(p.feed_eof(), FeedOutcome::Done);
    }
}
