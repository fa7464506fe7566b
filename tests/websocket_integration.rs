//! Drives `WebSocketClient` against a minimal hand-rolled server over a real loopback socket
//! (spec §8): no external network dependency, but real TCP I/O and a real opening handshake.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::time::Duration;

use corewire::config::ClientConfig;
use corewire::crypto::ws_accept_key;
use corewire::websocket::client::{Message, WebSocketClient};

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn extract_key(request: &str) -> String {
    for line in request.split("\r\n") {
        let lower = line.to_ascii_lowercase();
        if let Some(pos) = lower.find("sec-websocket-key:") {
            return line[pos + "sec-websocket-key:".len()..].trim().to_string();
        }
    }
    panic!("no Sec-WebSocket-Key header in request: {}", request);
}

#[test]
fn connect_receive_and_send_against_a_loopback_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut buf = vec![0u8; 4096];
        let mut total = 0usize;
        let header_end = loop {
            let n = stream.read(&mut buf[total..]).unwrap();
            assert!(n > 0, "server EOF before handshake completed");
            total += n;
            if let Some(end) = find_header_end(&buf[..total]) {
                break end;
            }
        };
        let request = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let client_key = extract_key(&request);
        let accept = ws_accept_key(&client_key);

        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             \r\n",
            accept
        );
        stream.write_all(response.as_bytes()).unwrap();

        // Send one unmasked text frame ("hello"), as a compliant server would.
        let mut frame = vec![0x81u8, 5];
        frame.extend_from_slice(b"hello");
        stream.write_all(&frame).unwrap();

        // Read the client's masked reply frame and unmask it.
        let mut header = [0u8; 2];
        stream.read_exact(&mut header).unwrap();
        let len = (header[1] & 0x7F) as usize;
        let mut mask = [0u8; 4];
        stream.read_exact(&mut mask).unwrap();
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).unwrap();
        for (i, b) in payload.iter_mut().enumerate() {
            *b ^= mask[i % 4];
        }
        tx.send(payload).unwrap();
    });

    let config = ClientConfig {
        timeout_ms: 5_000,
        allow_private: true,
    };
    let url = format!("ws://127.0.0.1:{}/chat", port);
    let mut client = WebSocketClient::connect(&url, config).expect("handshake should succeed");

    let message = client.recv(Duration::from_secs(5)).expect("recv should yield a message");
    match message {
        Message::Text(text) => assert_eq!(text, "hello"),
        other => panic!("expected Text message, got {:?}", other),
    }

    client.send_text("hi").expect("send_text should succeed");

    let echoed = rx.recv_timeout(Duration::from_secs(5)).expect("server should report the client frame");
    assert_eq!(echoed, b"hi");

    server.join().unwrap();
}
