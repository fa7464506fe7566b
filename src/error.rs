/*
 * error.rs
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

//! Error taxonomy, one enum per layer. `OK` from the spec's taxonomy is the `Ok` side of
//! `Result`, not a variant here. Manual `Display`/`Error` impls (no `thiserror`), matching
//! the style of `StoreError` in the teacher repo.

use std::fmt;
use std::io;

/// Stream socket errors (spec §7: `{RESOLVE, CONNECT, TIMEOUT, CLOSED, IO, MEMORY}`).
#[derive(Debug)]
pub enum StreamError {
    /// DNS resolution failed.
    Resolve(String),
    /// Every resolved address failed to connect.
    Connect(String),
    /// Connect or I/O readiness wait expired.
    Timeout,
    /// Peer closed the connection (orderly EOF on read).
    Closed,
    /// Any other I/O failure.
    Io(String),
    /// Allocation failure (surfaced when the OS CSPRNG or a buffer grow fails).
    Memory,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Resolve(msg) => write!(f, "resolve failed: {}", msg),
            StreamError::Connect(msg) => write!(f, "connect failed: {}", msg),
            StreamError::Timeout => write!(f, "operation timed out"),
            StreamError::Closed => write!(f, "connection closed"),
            StreamError::Io(msg) => write!(f, "i/o error: {}", msg),
            StreamError::Memory => write!(f, "allocation failure"),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => StreamError::Timeout,
            io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset => StreamError::Closed,
            io::ErrorKind::BrokenPipe => StreamError::Io("broken pipe".to_string()),
            _ => StreamError::Io(e.to_string()),
        }
    }
}

/// TLS errors (spec §7: `{HANDSHAKE, CERTIFICATE, HOSTNAME, IO, CLOSED, MEMORY, CONNECT, TIMEOUT}`).
#[derive(Debug)]
pub enum TlsError {
    /// Handshake failed for a reason other than certificate validation.
    Handshake(String),
    /// The peer's certificate chain failed validation.
    Certificate(String),
    /// The hostname could not be used as an SNI/`ServerName`.
    Hostname(String),
    /// I/O failure on the underlying stream socket.
    Io(String),
    /// Connection closed (by us or the peer).
    Closed,
    /// Allocation failure.
    Memory,
    /// Underlying stream socket failed to connect.
    Connect(String),
    /// Handshake or I/O timed out.
    Timeout,
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsError::Handshake(msg) => write!(f, "tls handshake failed: {}", msg),
            TlsError::Certificate(msg) => write!(f, "certificate validation failed: {}", msg),
            TlsError::Hostname(msg) => write!(f, "invalid hostname: {}", msg),
            TlsError::Io(msg) => write!(f, "tls i/o error: {}", msg),
            TlsError::Closed => write!(f, "tls connection closed"),
            TlsError::Memory => write!(f, "allocation failure"),
            TlsError::Connect(msg) => write!(f, "connect failed: {}", msg),
            TlsError::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for TlsError {}

impl From<StreamError> for TlsError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Resolve(msg) | StreamError::Connect(msg) => TlsError::Connect(msg),
            StreamError::Timeout => TlsError::Timeout,
            StreamError::Closed => TlsError::Closed,
            StreamError::Io(msg) => TlsError::Io(msg),
            StreamError::Memory => TlsError::Memory,
        }
    }
}

impl From<io::Error> for TlsError {
    fn from(e: io::Error) -> Self {
        StreamError::from(e).into()
    }
}

/// WebSocket errors (spec §7: `{URL, CONNECT, HANDSHAKE, PROTOCOL, CLOSED, IO, MEMORY, TIMEOUT}`).
#[derive(Debug)]
pub enum WsError {
    /// URL was not a valid/allowed `ws://`/`wss://` URL.
    Url(String),
    /// Underlying transport failed to connect.
    Connect(String),
    /// Opening handshake failed (bad status, missing/incorrect accept key).
    Handshake(String),
    /// Frame-level protocol violation (oversized frame, bad opcode sequence).
    Protocol(String),
    /// Connection is closed; operation refused.
    Closed,
    /// I/O failure on the underlying transport.
    Io(String),
    /// Allocation failure.
    Memory,
    /// `recv` timed out waiting for a frame.
    Timeout,
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsError::Url(msg) => write!(f, "invalid websocket url: {}", msg),
            WsError::Connect(msg) => write!(f, "connect failed: {}", msg),
            WsError::Handshake(msg) => write!(f, "handshake failed: {}", msg),
            WsError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            WsError::Closed => write!(f, "connection closed"),
            WsError::Io(msg) => write!(f, "i/o error: {}", msg),
            WsError::Memory => write!(f, "allocation failure"),
            WsError::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for WsError {}

impl From<StreamError> for WsError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Resolve(msg) | StreamError::Connect(msg) => WsError::Connect(msg),
            StreamError::Timeout => WsError::Timeout,
            StreamError::Closed => WsError::Closed,
            StreamError::Io(msg) => WsError::Io(msg),
            StreamError::Memory => WsError::Memory,
        }
    }
}

impl From<TlsError> for WsError {
    fn from(e: TlsError) -> Self {
        match e {
            TlsError::Handshake(msg) => WsError::Handshake(msg),
            TlsError::Certificate(msg) => WsError::Handshake(msg),
            TlsError::Hostname(msg) => WsError::Connect(msg),
            TlsError::Io(msg) => WsError::Io(msg),
            TlsError::Closed => WsError::Closed,
            TlsError::Memory => WsError::Memory,
            TlsError::Connect(msg) => WsError::Connect(msg),
            TlsError::Timeout => WsError::Timeout,
        }
    }
}

impl From<io::Error> for WsError {
    fn from(e: io::Error) -> Self {
        StreamError::from(e).into()
    }
}
