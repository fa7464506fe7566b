/*
 * sse.rs
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

//! Server-Sent Events parser (spec §4.7): line-framing tolerant of CR, LF, and CRLF, field
//! dispatch per the `text/event-stream` grammar, and a small ring buffer of completed events,
//! generalizing the line-buffering technique used for streamed LLM output elsewhere in the pack.

use std::collections::VecDeque;

use crate::config::SSE_RING_CAPACITY;

/// One dispatched event (spec §3 "SSE event"): `event` defaults to `"message"` and `id` falls
/// back to the last seen id when the field is absent from this event; `retry` defaults to `-1`
/// when no `retry:` field has been seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry: i64,
}

/// Incremental SSE parser. Completed events are pushed into a ring buffer of capacity
/// `SSE_RING_CAPACITY`; once full, the oldest event is silently dropped to make room for the
/// newest (spec §9 — a documented limitation, not a bug: this client does not pace consumption
/// against the stream).
pub struct SseParser {
    line_buf: String,
    event_type: Option<String>,
    data_lines: Vec<String>,
    event_id: Option<String>,
    last_id: Option<String>,
    retry_ms: Option<u64>,
    ready: VecDeque<SseEvent>,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            line_buf: String::new(),
            event_type: None,
            data_lines: Vec::new(),
            event_id: None,
            last_id: None,
            retry_ms: None,
            ready: VecDeque::new(),
        }
    }

    /// The last non-empty `id:` field seen, persisted across events for reconnect support
    /// (spec §4.7).
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// The most recently announced `retry:` value in milliseconds, if any.
    pub fn retry_ms(&self) -> Option<u64> {
        self.retry_ms
    }

    /// Feed a chunk of raw bytes (assumed UTF-8, as `text/event-stream` requires). Invalid UTF-8
    /// bytes are replaced rather than rejected, since a dropped connection should not lose
    /// already-dispatched events.
    pub fn feed(&mut self, data: &[u8]) {
        let text = String::from_utf8_lossy(data);
        for ch in text.chars() {
            match ch {
                '\n' => self.end_line(),
                '\r' => {
                    // A lone CR or the CR of a CRLF pair both terminate the line; the LF that
                    // may follow a CR produces an empty extra line, which is harmless since
                    // blank lines only matter for dispatch and an extra blank line before a
                    // real one is a no-op.
                    self.end_line();
                }
                _ => self.line_buf.push(ch),
            }
        }
    }

    fn end_line(&mut self) {
        let line = std::mem::take(&mut self.line_buf);
        if line.is_empty() {
            self.dispatch();
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line.as_str(), ""),
        };
        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            "id" => {
                if !value.contains('\0') {
                    self.event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry_ms = Some(ms);
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) {
        if let Some(id) = &self.event_id {
            self.last_id = Some(id.clone());
        }
        if self.data_lines.is_empty() {
            // No `data:` field was set since the last dispatch; nothing to emit (spec §4.7).
            self.event_id = None;
            return;
        }
        let event = SseEvent {
            event: Some(self.event_type.take().unwrap_or_else(|| "message".to_string())),
            data: self.data_lines.join("\n"),
            id: self.event_id.take().or_else(|| self.last_id.clone()),
            retry: self.retry_ms.map(|ms| ms as i64).unwrap_or(-1),
        };
        self.data_lines.clear();
        if self.ready.len() == SSE_RING_CAPACITY {
            self.ready.pop_front();
        }
        self.ready.push_back(event);
    }

    /// Pop the oldest completed event, if any.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        self.ready.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_blank_line() {
        let mut p = SseParser::new();
        p.feed(b"data: hello\n\n");
        let ev = p.next_event().unwrap();
        assert_eq!(ev.data, "hello");
        assert_eq!(ev.event.as_deref(), Some("message"));
    }

    #[test]
    fn joins_multiple_data_lines_with_newline() {
        let mut p = SseParser::new();
        p.feed(b"data: line1\ndata: line2\n\n");
        let ev = p.next_event().unwrap();
        assert_eq!(ev.data, "line1\nline2");
    }

    #[test]
    fn tracks_event_type_and_id() {
        let mut p = SseParser::new();
        p.feed(b"event: update\nid: 42\ndata: x\n\n");
        let ev = p.next_event().unwrap();
        assert_eq!(ev.event.as_deref(), Some("update"));
        assert_eq!(ev.id.as_deref(), Some("42"));
        assert_eq!(p.last_event_id(), Some("42"));
    }

    #[test]
    fn handles_bare_cr_line_endings() {
        let mut p = SseParser::new();
        p.feed(b"data: a\r\r");
        let ev = p.next_event().unwrap();
        assert_eq!(ev.data, "a");
    }

    #[test]
    fn ring_buffer_drops_oldest_when_full() {
        let mut p = SseParser::new();
        for i in 0..(SSE_RING_CAPACITY + 2) {
            p.feed(format!("data: {}\n\n", i).as_bytes());
        }
        assert_eq!(p.next_event().unwrap().data, "2");
    }

    #[test]
    fn retry_field_updates_retry_ms() {
        let mut p = SseParser::new();
        p.feed(b"retry: 5000\ndata: x\n\n");
        assert_eq!(p.retry_ms(), Some(5000));
    }

    #[test]
    fn comment_lines_are_ignored() {
        let mut p = SseParser::new();
        p.feed(b": this is a comment\ndata: x\n\n");
        let ev = p.next_event().unwrap();
        assert_eq!(ev.data, "x");
    }

    #[test]
    fn blank_line_with_no_data_field_dispatches_nothing() {
        let mut p = SseParser::new();
        p.feed(b"event: ping\n\n");
        assert!(p.next_event().is_none());
    }

    #[test]
    fn id_falls_back_to_last_seen_id_when_absent() {
        let mut p = SseParser::new();
        p.feed(b"id: 7\ndata: a\n\n");
        p.feed(b"data: b\n\n");
        let first = p.next_event().unwrap();
        assert_eq!(first.id.as_deref(), Some("7"));
        let second = p.next_event().unwrap();
        assert_eq!(second.id.as_deref(), Some("7"));
    }

    #[test]
    fn retry_defaults_to_negative_one_when_unset() {
        let mut p = SseParser::new();
        p.feed(b"data: x\n\n");
        let ev = p.next_event().unwrap();
        assert_eq!(ev.retry, -1);
    }
}
