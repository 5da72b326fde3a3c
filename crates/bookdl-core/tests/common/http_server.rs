//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `/missing` answers 404 with a short body.
//! - `/named` adds `Content-Disposition: attachment; filename="Named Book.epub"`.
//! - `/slow/...` trickles the body in 1 KiB chunks every 10 ms.
//! - anything else serves the body, honouring `Range: bytes=N-` with 206.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Starts a server in a background thread serving `body`. Returns the base
/// URL without trailing slash (e.g. "http://127.0.0.1:12345"). The server
/// runs until the process exits.
pub fn start(body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            thread::spawn(move || handle(stream, &body));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, body: &[u8]) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (path, range_start) = parse_request(request);

    if path == "/missing" {
        let page = b"not found";
        let head = format!(
            "HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            page.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(page);
        return;
    }

    let total = body.len() as u64;
    let (status, slice, content_range) = match range_start {
        Some(start) if start < total => (
            "206 Partial Content",
            &body[start as usize..],
            format!("Content-Range: bytes {}-{}/{}\r\n", start, total - 1, total),
        ),
        _ => ("200 OK", body, String::new()),
    };
    let disposition = if path == "/named" {
        "Content-Disposition: attachment; filename=\"Named Book.epub\"\r\n"
    } else {
        ""
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}Accept-Ranges: bytes\r\nConnection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        disposition
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }

    if path.starts_with("/slow/") {
        for chunk in slice.chunks(1024) {
            if stream.write_all(chunk).is_err() {
                return;
            }
            let _ = stream.flush();
            thread::sleep(Duration::from_millis(10));
        }
    } else {
        let _ = stream.write_all(slice);
    }
}

/// Returns (path, optional start of `Range: bytes=N-`).
fn parse_request(request: &str) -> (&str, Option<u64>) {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = value
                    .trim()
                    .strip_prefix("bytes=")
                    .and_then(|v| v.split('-').next())
                    .and_then(|start| start.trim().parse::<u64>().ok());
            }
        }
    }
    (path, range)
}
