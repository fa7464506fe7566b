/*
 * stream.rs
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

//! Cross-platform TCP stream socket (spec §4.2): connect with DNS + timeout, read/write with
//! per-call timeout, a sticky last error, and a raw descriptor for the TLS adapter's readiness
//! contract.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, RawSocket};

use crate::error::StreamError;

/// One TCP connection plus a sticky last error (spec §3 "Stream socket handle").
pub struct StreamSocket {
    inner: TcpStream,
    last_error: Option<StreamError>,
}

impl StreamSocket {
    /// Resolve `host:port` to one or more addresses (both families) and try each in order,
    /// bounding each attempt by `timeout`. Disables Nagle and applies `timeout` to I/O on
    /// success (spec §4.2).
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, StreamError> {
        let addrs: Vec<_> = (host, port)
            .to_socket_addrs()
            .map_err(|e| StreamError::Resolve(e.to_string()))?
            .collect();
        if addrs.is_empty() {
            return Err(StreamError::Resolve(format!("no addresses for {}", host)));
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true).map_err(StreamError::from)?;
                    stream
                        .set_read_timeout(Some(timeout))
                        .map_err(StreamError::from)?;
                    stream
                        .set_write_timeout(Some(timeout))
                        .map_err(StreamError::from)?;
                    return Ok(Self {
                        inner: stream,
                        last_error: None,
                    });
                }
                Err(e) => {
                    last_err = Some(if e.kind() == io::ErrorKind::TimedOut {
                        StreamError::Timeout
                    } else {
                        StreamError::Connect(e.to_string())
                    });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| StreamError::Connect("no addresses tried".to_string())))
    }

    /// Apply `timeout` to both read and write directions (spec §4.2).
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), StreamError> {
        self.inner.set_read_timeout(Some(timeout))?;
        self.inner.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Toggle non-blocking mode (spec §4.2 data model — exposed for callers layering their own
    /// readiness polling; this crate's own WebSocket `recv` timeout uses the read-timeout
    /// technique instead, see DESIGN.md).
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), StreamError> {
        self.inner.set_nonblocking(nonblocking)?;
        Ok(())
    }

    /// Write up to `buf.len()` bytes; may return short (spec §4.2).
    pub fn write_some(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        match self.inner.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                let err = StreamError::from(e);
                self.last_error = Some(match &err {
                    StreamError::Timeout => StreamError::Timeout,
                    _ => StreamError::Io(err.to_string()),
                });
                Err(err)
            }
        }
    }

    /// Loop `write_some` until all of `buf` is sent or an error occurs (spec §4.2).
    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        let mut off = 0;
        while off < buf.len() {
            let n = self.write_some(&buf[off..])?;
            if n == 0 {
                let err = StreamError::Io("zero-length write".to_string());
                self.last_error = Some(StreamError::Io(err.to_string()));
                return Err(err);
            }
            off += n;
        }
        Ok(())
    }

    /// Read into `buf`. `Ok(0)` means orderly shutdown, also recorded as a sticky `Closed`
    /// error (spec §4.2).
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        match self.inner.read(buf) {
            Ok(0) => {
                self.last_error = Some(StreamError::Closed);
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                let err = StreamError::from(e);
                self.last_error = Some(match &err {
                    StreamError::Timeout => StreamError::Timeout,
                    other => StreamError::Io(other.to_string()),
                });
                Err(err)
            }
        }
    }

    /// The last error recorded by a failing operation on this handle (spec §3, §4.2).
    pub fn last_error(&self) -> Option<&StreamError> {
        self.last_error.as_ref()
    }

    pub fn close(self) {
        // Dropping `self.inner` shuts down the socket. Idempotent by construction: a
        // `StreamSocket` can only be closed once since `close` consumes it.
    }
}

impl Read for StreamSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for StreamSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(unix)]
impl AsRawFd for StreamSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

#[cfg(windows)]
impl AsRawSocket for StreamSocket {
    fn as_raw_socket(&self) -> RawSocket {
        self.inner.as_raw_socket()
    }
}

impl StreamSocket {
    /// Access the raw `TcpStream`, e.g. to hand ownership to the TLS adapter (spec §9
    /// "polymorphism over transports").
    pub fn into_inner(self) -> TcpStream {
        self.inner
    }

    pub(crate) fn inner_ref(&self) -> &TcpStream {
        &self.inner
    }

    /// Raw descriptor for callers layering their own readiness poll (spec §9). This crate's own
    /// blocking operations use read/write timeouts instead; see DESIGN.md.
    #[cfg(unix)]
    pub fn fd_for_poll(&self) -> RawFd {
        self.inner.as_raw_fd()
    }

    #[cfg(windows)]
    pub fn fd_for_poll(&self) -> RawSocket {
        self.inner.as_raw_socket()
    }
}
