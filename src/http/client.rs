/*
 * http/client.rs
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

//! HTTP/1.1 client (spec §4.5): a one-shot request/response call, and a streaming mode that
//! hands body chunks to the caller as they arrive over a background thread, generalizing the
//! teacher's `send_http1`/`write_http1_request` from async to a blocking producer thread.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::config::{ClientConfig, MAX_RESPONSE_BODY_BYTES};
use crate::error::{StreamError, TlsError};
use crate::http::parser::{FeedOutcome, ResponseParser};
use crate::stream::StreamSocket;
use crate::tls;
use crate::transport::Transport;
use crate::url::{self, ParsedUrl, Scheme};

/// Request method and body (spec §3 "HTTP request").
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

/// Result of a one-shot call (spec §4.5: errors are reported on the value, not as exceptions).
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub error: Option<String>,
}

impl HttpResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            status_text: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct HttpClient {
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Issue `request` and buffer the whole response in memory, capped at
    /// `MAX_RESPONSE_BODY_BYTES` (spec §4.5).
    pub fn send(&self, request: &HttpRequest) -> HttpResponse {
        match self.send_inner(request) {
            Ok(resp) => resp,
            Err(e) => HttpResponse::error(e),
        }
    }

    fn send_inner(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let parsed = url::validate(&request.url, self.config.allow_private)
            .map_err(|e| e.to_string())?;
        let mut transport = connect(&parsed, self.config.timeout())
            .map_err(|e| e.to_string())?;
        write_request(&mut transport, &parsed, request).map_err(|e| e.to_string())?;

        let mut parser = ResponseParser::new();
        let mut body = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let outcome = parser.feed(&[]);
            match outcome {
                FeedOutcome::NeedMore => {
                    let n = transport.read(&mut buf).map_err(|e| e.to_string())?;
                    if n == 0 {
                        let outcome = parser.feed_eof();
                        if let FeedOutcome::Error(msg) = outcome {
                            return Err(msg);
                        }
                        continue;
                    }
                    let outcome = parser.feed(&buf[..n]);
                    if let FeedOutcome::Error(msg) = outcome {
                        return Err(msg);
                    }
                }
                FeedOutcome::HeadersDone => {}
                FeedOutcome::ChunkReady => {
                    if let Some(chunk) = parser.take_chunk() {
                        if body.len() + chunk.len() > MAX_RESPONSE_BODY_BYTES {
                            return Err("response body exceeded the maximum size".to_string());
                        }
                        body.extend_from_slice(&chunk);
                    }
                }
                FeedOutcome::Done => break,
                FeedOutcome::Error(msg) => return Err(msg),
            }
        }

        Ok(HttpResponse {
            status_code: parser.status_code(),
            status_text: parser.status_text().to_string(),
            headers: parser.headers().to_vec(),
            body,
            error: None,
        })
    }

    /// Issue `request` and return a handle that yields body chunks as they arrive, read from a
    /// background producer thread (spec §4.5, §9).
    pub fn send_streaming(&self, request: &HttpRequest) -> Result<StreamingResponse, String> {
        let parsed =
            url::validate(&request.url, self.config.allow_private).map_err(|e| e.to_string())?;
        let mut transport = connect(&parsed, self.config.timeout()).map_err(|e| e.to_string())?;
        write_request(&mut transport, &parsed, request).map_err(|e| e.to_string())?;

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            done: AtomicBool::new(false),
            error: Mutex::new(None),
            status_code: AtomicU16::new(0),
            headers_ready: AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || run_producer(transport, worker_shared));

        Ok(StreamingResponse {
            shared,
            handle: Some(handle),
        })
    }
}

struct Shared {
    queue: Mutex<VecDeque<Vec<u8>>>,
    condvar: Condvar,
    done: AtomicBool,
    error: Mutex<Option<String>>,
    status_code: AtomicU16,
    headers_ready: AtomicBool,
}

fn run_producer(mut transport: Transport, shared: Arc<Shared>) {
    let mut parser = ResponseParser::new();
    let mut buf = [0u8; 8192];
    loop {
        let outcome = parser.feed(&[]);
        match outcome {
            FeedOutcome::NeedMore => match transport.read(&mut buf) {
                Ok(0) => {
                    let outcome = parser.feed_eof();
                    if let FeedOutcome::Error(msg) = outcome {
                        *shared.error.lock().unwrap() = Some(msg);
                        break;
                    }
                }
                Ok(n) => {
                    if let FeedOutcome::Error(msg) = parser.feed(&buf[..n]) {
                        *shared.error.lock().unwrap() = Some(msg);
                        break;
                    }
                }
                Err(e) => {
                    *shared.error.lock().unwrap() = Some(e.to_string());
                    break;
                }
            },
            FeedOutcome::HeadersDone => {
                shared
                    .status_code
                    .store(parser.status_code(), Ordering::SeqCst);
                shared.headers_ready.store(true, Ordering::SeqCst);
                shared.condvar.notify_all();
            }
            FeedOutcome::ChunkReady => {
                if let Some(chunk) = parser.take_chunk() {
                    let mut q = shared.queue.lock().unwrap();
                    q.push_back(chunk);
                    shared.condvar.notify_all();
                }
            }
            FeedOutcome::Done => break,
            FeedOutcome::Error(msg) => {
                *shared.error.lock().unwrap() = Some(msg);
                break;
            }
        }
    }
    shared.done.store(true, Ordering::SeqCst);
    shared.condvar.notify_all();
    eprintln!("[http] streaming producer thread exiting");
}

/// Handle to an in-flight streaming response (spec §4.5, §9: producer/consumer over a bounded
/// queue guarded by a mutex and condition variable).
pub struct StreamingResponse {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl StreamingResponse {
    pub fn status_code(&self) -> Option<u16> {
        if self.shared.headers_ready.load(Ordering::SeqCst) {
            Some(self.shared.status_code.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Block until a chunk is available, the stream finishes, or an error occurs.
    pub fn recv_chunk(&self) -> Option<Vec<u8>> {
        let mut q = self.shared.queue.lock().unwrap();
        loop {
            if let Some(chunk) = q.pop_front() {
                return Some(chunk);
            }
            if self.shared.done.load(Ordering::SeqCst) {
                return None;
            }
            q = self.shared.condvar.wait(q).unwrap();
        }
    }

    pub fn error(&self) -> Option<String> {
        self.shared.error.lock().unwrap().clone()
    }

    pub fn is_done(&self) -> bool {
        self.shared.done.load(Ordering::SeqCst)
    }

    /// Stop the producer and drain the queue. The producer is signalled to stop and joined
    /// *before* the queue is drained, so no chunk it was in the middle of enqueueing is lost or
    /// silently dropped (spec §4.5, §9).
    pub fn close(mut self) {
        self.shared.done.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.shared.queue.lock().unwrap().clear();
    }
}

impl Drop for StreamingResponse {
    fn drop(&mut self) {
        self.shared.done.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn connect(parsed: &ParsedUrl, timeout: std::time::Duration) -> Result<Transport, TlsError> {
    match parsed.scheme {
        Scheme::Https => tls::connect(&parsed.host, parsed.port, timeout),
        Scheme::Http => {
            let socket = StreamSocket::connect(&parsed.host, parsed.port, timeout)
                .map_err(StreamError::from)
                .map_err(TlsError::from)?;
            Ok(Transport::Plain(socket))
        }
    }
}

/// Fixed string identifying this stack to servers (spec §4.5).
const USER_AGENT: &str = concat!("corewire/", env!("CARGO_PKG_VERSION"));

/// Serialize and send the request line, headers, and body (spec §4.5): `Host`, `User-Agent`, and
/// `Connection: close` are always supplied, `Content-Length` is added when the caller did not
/// already set one and the body is non-empty.
fn write_request(
    transport: &mut Transport,
    parsed: &ParsedUrl,
    request: &HttpRequest,
) -> Result<(), StreamError> {
    let mut out = Vec::with_capacity(256 + request.body.len());
    out.extend_from_slice(
        format!(
            "{} {} HTTP/1.1\r\n",
            request.method,
            parsed.request_path()
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("Host: {}\r\n", parsed.host_header()).as_bytes());
    out.extend_from_slice(format!("User-Agent: {}\r\n", USER_AGENT).as_bytes());

    let has_content_length = request
        .headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("content-length"));
    let has_connection = request
        .headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("connection"));

    for (name, value) in &request.headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    if !has_content_length && !request.body.is_empty() {
        out.extend_from_slice(format!("Content-Length: {}\r\n", request.body.len()).as_bytes());
    }
    if !has_connection {
        out.extend_from_slice(b"Connection: close\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&request.body);

    transport.write_all(&out).map_err(StreamError::from)
}
