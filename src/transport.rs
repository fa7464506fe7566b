/*
 * transport.rs
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

//! Polymorphic byte stream shared by the HTTP client and the WebSocket client (spec §9
//! "Polymorphism over transports"), generalizing the teacher's async `HttpStream` enum to a
//! blocking `Read + Write` enum over plaintext or TLS.

use std::io::{self, Read, Write};
use std::time::Duration;

use rustls::StreamOwned;

use crate::error::{StreamError, TlsError};
use crate::stream::StreamSocket;

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, RawSocket};

pub enum Transport {
    Plain(StreamSocket),
    Tls(StreamOwned<rustls::ClientConnection, StreamSocket>),
}

impl Transport {
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), StreamError> {
        match self {
            Transport::Plain(s) => s.set_timeout(timeout),
            Transport::Tls(s) => s.get_mut().set_timeout(timeout),
        }
    }

    pub fn close(self) {
        match self {
            Transport::Plain(s) => s.close(),
            Transport::Tls(s) => s.sock.close(),
        }
    }

    /// Whether the connection is carried over TLS (spec §4.3 data model).
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.flush(),
        }
    }
}

#[cfg(unix)]
impl AsRawFd for Transport {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Transport::Plain(s) => s.as_raw_fd(),
            Transport::Tls(s) => s.sock.as_raw_fd(),
        }
    }
}

#[cfg(windows)]
impl AsRawSocket for Transport {
    fn as_raw_socket(&self) -> RawSocket {
        match self {
            Transport::Plain(s) => s.as_raw_socket(),
            Transport::Tls(s) => s.sock.as_raw_socket(),
        }
    }
}

impl From<TlsError> for StreamError {
    fn from(e: TlsError) -> Self {
        match e {
            TlsError::Connect(msg) => StreamError::Connect(msg),
            TlsError::Timeout => StreamError::Timeout,
            TlsError::Closed => StreamError::Closed,
            TlsError::Memory => StreamError::Memory,
            TlsError::Handshake(msg)
            | TlsError::Certificate(msg)
            | TlsError::Hostname(msg)
            | TlsError::Io(msg) => StreamError::Io(msg),
        }
    }
}
