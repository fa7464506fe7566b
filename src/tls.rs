/*
 * tls.rs
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

//! TLS adapter (spec §4.3): wraps a connected `StreamSocket` in a `rustls` client connection and
//! drives the handshake synchronously through `rustls::StreamOwned`.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use rustls_pki_types::ServerName;

use crate::error::TlsError;
use crate::stream::StreamSocket;
use crate::transport::Transport;

/// Built once and shared by every connection; native roots with a Mozilla-root fallback,
/// mirroring the teacher's `build_root_store` (spec §4.3).
static ROOT_STORE: OnceLock<Arc<RootCertStore>> = OnceLock::new();

fn root_store() -> Arc<RootCertStore> {
    ROOT_STORE
        .get_or_init(|| {
            let mut store = RootCertStore::empty();
            match rustls_native_certs::load_native_certs() {
                Ok(certs) => {
                    for cert in certs {
                        let _ = store.add(cert);
                    }
                }
                Err(e) => {
                    eprintln!("[tls] native root store unavailable ({}), using webpki-roots", e);
                    store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                }
            }
            if store.is_empty() {
                eprintln!("[tls] native root store was empty, using webpki-roots");
                store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            }
            Arc::new(store)
        })
        .clone()
}

fn client_config() -> Arc<ClientConfig> {
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates((*root_store()).clone())
            .with_no_client_auth(),
    )
}

/// Connect a plaintext `StreamSocket` to `host:port` then perform a TLS handshake with SNI set
/// to `host` (spec §4.3).
pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Transport, TlsError> {
    let socket = StreamSocket::connect(host, port, timeout)?;
    wrap(socket, host)
}

/// Perform the TLS handshake over an already-connected socket (spec §4.3: the TLS adapter is
/// layered on top of the stream socket, not a replacement for it).
pub fn wrap(socket: StreamSocket, host: &str) -> Result<Transport, TlsError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| TlsError::Hostname(e.to_string()))?;
    let conn = ClientConnection::new(client_config(), server_name)
        .map_err(|e| classify_rustls_error(&e))?;
    let mut stream = StreamOwned::new(conn, socket);
    // `StreamOwned` drives the handshake lazily on first I/O; force it now so connect errors
    // (certificate failures in particular) surface from `connect`/`wrap` rather than the first
    // caller read.
    use std::io::Write;
    stream.flush().map_err(|e| io_error_to_tls(e))?;
    Ok(Transport::Tls(stream))
}

fn classify_rustls_error(e: &rustls::Error) -> TlsError {
    match e {
        rustls::Error::InvalidCertificate(_) | rustls::Error::UnsupportedNameType => {
            TlsError::Certificate(e.to_string())
        }
        other => TlsError::Handshake(other.to_string()),
    }
}

fn io_error_to_tls(e: std::io::Error) -> TlsError {
    if let Some(inner) = e.get_ref() {
        if let Some(rustls_err) = inner.downcast_ref::<rustls::Error>() {
            return classify_rustls_error(rustls_err);
        }
    }
    TlsError::from(e)
}
