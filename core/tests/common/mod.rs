//! Shared harness: run the mock server on a random port in a background
//! thread so the blocking client can talk to it over real HTTP.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use fetch_core::FetchClient;

/// Start a fresh mock server and return its base URL.
pub fn spawn_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// Per-path request counts recorded by the server.
#[allow(dead_code)]
pub fn hits(base: &str) -> HashMap<String, u64> {
    let text = FetchClient::new().fetch_text(&format!("{base}/hits"), None);
    serde_json::from_str(&text).unwrap()
}

/// A port with nothing listening on it.
#[allow(dead_code)]
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// A one-shot raw HTTP server that sends a `count`-byte body of `x`, one
/// byte every `gap`.
#[allow(dead_code)]
pub fn trickle_server(count: usize, gap: Duration) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 4096];
        let _ = stream.read(&mut request);

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {count}\r\nConnection: close\r\n\r\n"
        );
        if stream.write_all(head.as_bytes()).is_err() {
            return;
        }
        for _ in 0..count {
            std::thread::sleep(gap);
            // the client may hang up once its deadline passes
            if stream.write_all(b"x").and_then(|_| stream.flush()).is_err() {
                return;
            }
        }
    });

    format!("http://{addr}/trickle")
}
