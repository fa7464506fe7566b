/*
 * lib.rs
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

//! Client-side HTTP/1.1, WebSocket, and Server-Sent Events networking over plaintext and TLS.
//!
//! [`http`] is the one-shot and streaming HTTP/1.1 client, [`websocket`] the RFC 6455 client,
//! and [`sse`] the `text/event-stream` parser. [`url`] carries the URL parser and SSRF-defensive
//! host validation shared by both clients. [`init`] must run once per process before any TLS
//! connection is made.

pub mod config;
pub mod crypto;
pub mod error;
pub mod http;
pub mod sse;
pub mod stream;
pub mod tls;
pub mod transport;
pub mod url;
pub mod websocket;

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the process-wide default `rustls` crypto provider. Safe to call more than once;
/// only the first call has any effect. Must run before the first TLS connection.
pub fn init() {
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// No-op kept for symmetry with `init`'s process-lifecycle contract; this crate holds no
/// process-wide resources that need releasing.
pub fn cleanup() {}
