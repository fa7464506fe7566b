/*
 * crypto.rs
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

//! RNG, SHA-1, and base64 wrappers used by the WebSocket handshake and frame masking (spec §4.6,
//! §9). The RNG is always OS-sourced via `getrandom`; a failure here aborts the calling
//! operation rather than falling back to a weaker source, per spec §9.

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::error::StreamError;

/// Fill `buf` with cryptographically strong OS-sourced random bytes.
pub fn fill_random(buf: &mut [u8]) -> Result<(), StreamError> {
    getrandom::getrandom(buf).map_err(|_| StreamError::Memory)
}

/// 4 random bytes for a frame's mask key (spec §4.6).
pub fn random_mask_key() -> Result<[u8; 4], StreamError> {
    let mut key = [0u8; 4];
    fill_random(&mut key)?;
    Ok(key)
}

/// 16 random bytes, base64-encoded, for `Sec-WebSocket-Key` (spec §4.6).
pub fn random_ws_key() -> Result<String, StreamError> {
    let mut raw = [0u8; 16];
    fill_random(&mut raw)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(raw))
}

/// RFC 6455 §1.3 magic GUID appended to the client key before hashing.
const WS_ACCEPT_MAGIC: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `BASE64(SHA1(client_key_base64 || GUID))` (spec §4.6, §8 scenario 6).
pub fn ws_accept_key(client_key_base64: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key_base64.as_bytes());
    hasher.update(WS_ACCEPT_MAGIC);
    let digest = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_key_matches_rfc6455_example() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        assert_eq!(ws_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn random_mask_key_is_not_all_zero_almost_always() {
        let a = random_mask_key().unwrap();
        let b = random_mask_key().unwrap();
        assert_ne!(a, b);
    }
}
