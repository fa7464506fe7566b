/*
 * url.rs
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

//! URL parsing and SSRF-defensive host validation (spec §4.1). `ws`/`wss` are folded onto
//! `http`/`https` before parsing; validation inspects the literal host only, never resolves
//! DNS (see the open issue this implies, noted at `validate`).

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Everything outside `[A-Za-z0-9-_.~]` gets percent-encoded (spec §4.1).
const UNRESERVED_COMPLEMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode `s`, leaving `[A-Za-z0-9-_.~]` untouched, `%HH` uppercase hex (spec §4.1, §8).
pub fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, UNRESERVED_COMPLEMENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// A parsed URL (spec §3). `host` has any IPv6 brackets stripped; `query` is `None` when absent
/// (not empty); `path` always begins with `/`.
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug)]
pub enum UrlError {
    UnsupportedScheme,
    EmptyHost,
    BadPort,
    UnterminatedIpv6,
    Private(String),
}

impl std::fmt::Display for UrlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlError::UnsupportedScheme => write!(f, "unsupported URL scheme"),
            UrlError::EmptyHost => write!(f, "URL has no host"),
            UrlError::BadPort => write!(f, "invalid port"),
            UrlError::UnterminatedIpv6 => write!(f, "unterminated IPv6 literal"),
            UrlError::Private(reason) => write!(f, "host rejected: {}", reason),
        }
    }
}

impl std::error::Error for UrlError {}

/// Fold `ws`/`wss` onto `http`/`https` (spec §4.1, §4.6), then parse.
pub fn parse(url: &str) -> Result<ParsedUrl, UrlError> {
    let rewritten;
    let url = if let Some(rest) = url.strip_prefix("wss://") {
        rewritten = format!("https://{}", rest);
        rewritten.as_str()
    } else if let Some(rest) = url.strip_prefix("ws://") {
        rewritten = format!("http://{}", rest);
        rewritten.as_str()
    } else {
        url
    };

    let (scheme, rest) = if let Some(rest) = url.strip_prefix("https://") {
        (Scheme::Https, rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        (Scheme::Http, rest)
    } else {
        return Err(UrlError::UnsupportedScheme);
    };

    // Host is everything up to the next `:`, `/`, `?`, or end of string, unless bracketed IPv6.
    let (authority, after_authority) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };

    let (host, port_str) = if authority.starts_with('[') {
        let end = authority
            .find(']')
            .ok_or(UrlError::UnterminatedIpv6)?;
        let host = &authority[1..end];
        let after = &authority[end + 1..];
        let port_str = after.strip_prefix(':');
        (host, port_str)
    } else {
        match authority.find(':') {
            Some(i) => (&authority[..i], Some(&authority[i + 1..])),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    let port = match port_str {
        None | Some("") => scheme.default_port(),
        Some(s) => {
            let p: u32 = s.parse().map_err(|_| UrlError::BadPort)?;
            if p == 0 || p > 65535 {
                return Err(UrlError::BadPort);
            }
            p as u16
        }
    };

    let (path_part, query) = match after_authority.find('?') {
        Some(i) => (&after_authority[..i], Some(after_authority[i + 1..].to_string())),
        None => (after_authority, None),
    };
    let path = if path_part.is_empty() {
        "/".to_string()
    } else {
        path_part.to_string()
    };

    Ok(ParsedUrl {
        scheme,
        host: host.to_string(),
        port,
        path,
        query,
    })
}

impl ParsedUrl {
    /// `host` alone if `port` is the scheme default, else `host:port` (spec §4.1).
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// `path` optionally followed by `?query` (spec §4.1).
    pub fn request_path(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

/// Validate a URL for SSRF-sensitive use (spec §4.1, §8): only `http`/`https` schemes are
/// accepted, and unless `allow_private` the host may not be loopback, link-local, RFC1918,
/// broadcast, or an IPv6-mapped-IPv4 embedding of one of those.
///
/// This inspects the literal host only — it performs no DNS resolution, so a hostname that
/// *resolves* to a private address is not caught here (spec §9 open issue).
pub fn validate(url: &str, allow_private: bool) -> Result<ParsedUrl, UrlError> {
    let parsed = parse(url)?;
    if !allow_private {
        check_host_not_private(&parsed.host)?;
    }
    Ok(parsed)
}

/// `true` iff `validate(url, false)` would succeed, i.e. the host is not private/loopback/etc.
pub fn is_valid(url: &str, allow_private: bool) -> bool {
    validate(url, allow_private).is_ok()
}

fn check_host_not_private(host: &str) -> Result<(), UrlError> {
    let lower = host.to_ascii_lowercase();
    if lower == "localhost" || lower == "localhost.localdomain" {
        return Err(UrlError::Private("localhost".to_string()));
    }
    if lower == "::1" || lower == "0:0:0:0:0:0:0:1" {
        return Err(UrlError::Private("IPv6 loopback".to_string()));
    }

    if let Some(embedded) = strip_ipv6_mapped_ipv4(&lower) {
        if let Some(v4) = parse_ipv4_literal(&embedded) {
            if is_private_ipv4(v4) {
                return Err(UrlError::Private("IPv6-mapped private IPv4".to_string()));
            }
        }
        return Ok(());
    }

    if let Some(v4) = parse_ipv4_literal(&lower) {
        if is_private_ipv4(v4) {
            return Err(UrlError::Private("private/loopback/link-local IPv4".to_string()));
        }
    }

    Ok(())
}

/// Strip a `::ffff:` or `0:0:0:0:0:ffff:` IPv6-mapped-IPv4 prefix, returning the embedded
/// dotted-quad text (spec §4.1).
fn strip_ipv6_mapped_ipv4(host: &str) -> Option<String> {
    for prefix in ["::ffff:", "0:0:0:0:0:ffff:"] {
        if let Some(rest) = host.strip_prefix(prefix) {
            if rest.contains('.') {
                return Some(rest.to_string());
            }
        }
    }
    None
}

/// Parse an IPv4 literal in decimal, octal (`0…`), hex (`0x…`), or single-integer form into its
/// 32-bit value (spec §4.1). Accepts 1-to-4 dotted components, matching common libc `inet_aton`
/// laxness, since SSRF bypasses frequently rely on exactly that laxness.
fn parse_ipv4_literal(s: &str) -> Option<u32> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }
    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        values.push(parse_ipv4_component(part)?);
    }
    match values.len() {
        1 => Some(values[0]),
        2 => {
            if values[0] > 0xFF || values[1] > 0x00FF_FFFF {
                return None;
            }
            Some((values[0] << 24) | values[1])
        }
        3 => {
            if values[0] > 0xFF || values[1] > 0xFF || values[2] > 0xFFFF {
                return None;
            }
            Some((values[0] << 24) | (values[1] << 16) | values[2])
        }
        4 => {
            if values.iter().any(|v| *v > 0xFF) {
                return None;
            }
            Some((values[0] << 24) | (values[1] << 16) | (values[2] << 8) | values[3])
        }
        _ => None,
    }
}

fn parse_ipv4_component(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if s.len() > 1 && s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit()) {
        return u32::from_str_radix(s, 8).ok();
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    None
}

fn is_private_ipv4(addr: u32) -> bool {
    let octets = addr.to_be_bytes();
    let in_range = |base: [u8; 4], mask_bits: u32| -> bool {
        let mask = if mask_bits == 0 { 0 } else { u32::MAX << (32 - mask_bits) };
        (addr & mask) == (u32::from_be_bytes(base) & mask)
    };
    in_range([10, 0, 0, 0], 8)
        || in_range([172, 16, 0, 0], 12)
        || in_range([192, 168, 0, 0], 16)
        || in_range([127, 0, 0, 0], 8)
        || in_range([169, 254, 0, 0], 16)
        || in_range([0, 0, 0, 0], 8)
        || octets == [255, 255, 255, 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_http_url() {
        let u = parse("http://example.com/foo?bar=1").unwrap();
        assert_eq!(u.host, "example.com");
        assert_eq!(u.port, 80);
        assert_eq!(u.path, "/foo");
        assert_eq!(u.query.as_deref(), Some("bar=1"));
    }

    #[test]
    fn defaults_path_to_slash_and_query_to_none() {
        let u = parse("https://example.com").unwrap();
        assert_eq!(u.path, "/");
        assert_eq!(u.query, None);
    }

    #[test]
    fn parses_bracketed_ipv6_host() {
        let u = parse("http://[::1]:8080/x").unwrap();
        assert_eq!(u.host, "::1");
        assert_eq!(u.port, 8080);
    }

    #[test]
    fn folds_ws_scheme_onto_http() {
        let u = parse("ws://example.com/chat").unwrap();
        assert_eq!(u.scheme, Scheme::Http);
        let u2 = parse("wss://example.com/chat").unwrap();
        assert_eq!(u2.scheme, Scheme::Https);
    }

    #[test]
    fn host_header_omits_default_port() {
        let u = parse("http://example.com:80/").unwrap();
        assert_eq!(u.host_header(), "example.com");
        let u2 = parse("http://example.com:8080/").unwrap();
        assert_eq!(u2.host_header(), "example.com:8080");
    }

    #[test]
    fn url_encode_is_identity_for_unreserved() {
        let s = "abcXYZ09-_.~";
        assert_eq!(url_encode(s), s);
    }

    #[test]
    fn url_encode_uses_uppercase_hex() {
        assert_eq!(url_encode(" "), "%20");
    }

    #[test]
    fn rejects_loopback_literal() {
        assert!(!is_valid("http://127.0.0.1/", false));
        assert!(is_valid("http://127.0.0.1/", true));
    }

    #[test]
    fn rejects_hex_encoded_loopback() {
        assert!(!is_valid("http://0x7f000001/", false));
    }

    #[test]
    fn rejects_octal_encoded_private() {
        assert!(!is_valid("http://0177.0.0.1/", false));
    }

    #[test]
    fn rejects_rfc1918_ranges() {
        assert!(!is_valid("http://10.1.2.3/", false));
        assert!(!is_valid("http://172.16.0.5/", false));
        assert!(!is_valid("http://192.168.1.1/", false));
    }

    #[test]
    fn rejects_localhost_and_ipv6_loopback() {
        assert!(!is_valid("http://localhost/", false));
        assert!(!is_valid("http://[::1]/", false));
    }

    #[test]
    fn rejects_ipv6_mapped_private_ipv4() {
        assert!(!is_valid("http://[::ffff:10.0.0.1]/", false));
    }

    #[test]
    fn rejects_broadcast() {
        assert!(!is_valid("http://255.255.255.255/", false));
    }

    #[test]
    fn accepts_public_host() {
        assert!(is_valid("https://example.com/", false));
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(parse("file:///etc/passwd").is_err());
    }
}
