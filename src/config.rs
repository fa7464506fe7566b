/*
 * config.rs
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

//! Runtime-configurable knobs (spec §6) plus the fixed constants the spec pins as constants.

use std::time::Duration;

/// Response body cap for the one-shot HTTP client (10 MiB, spec §4.5/§6).
pub const MAX_RESPONSE_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Incoming WebSocket frame payload cap (100 MiB, spec §1/§6).
pub const MAX_WS_FRAME_BYTES: u64 = 100 * 1024 * 1024;

/// SSE completed-event ring capacity (spec §3/§9).
pub const SSE_RING_CAPACITY: usize = 16;

/// Maximum header count the HTTP parser accepts before failing (spec §3/§4.4).
pub const MAX_HEADER_COUNT: usize = 64;

/// Maximum status-text length the HTTP parser retains (spec §3/§4.4).
pub const MAX_STATUS_TEXT_BYTES: usize = 127;

/// Connect and per-operation I/O timeout, and the SSRF bypass switch (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    /// Connect and read/write timeout in milliseconds. Default 30000.
    pub timeout_ms: u64,
    /// When true, the URL validator permits loopback/private/link-local hosts. Default false.
    pub allow_private: bool,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            allow_private: false,
        }
    }
}
