//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body over GET, honoring `Range: bytes=N-` with 206
//! Partial Content. Every handled request's first line and Range header are
//! recorded so tests can assert what the client actually sent.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Respond to every request with this status line (e.g. "404 Not Found").
    pub force_status: Option<&'static str>,
    /// Omit the Content-Length header to simulate unknown-size resources.
    pub send_content_length: bool,
    /// Pause between body slices, keeping transfers alive long enough for
    /// cancellation and admission tests.
    pub write_delay: Option<Duration>,
    /// Size of each body slice written when a delay is configured.
    pub slice_size: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            force_status: None,
            send_content_length: true,
            write_delay: None,
            slice_size: 16 * 1024,
        }
    }
}

/// Log of requests seen by the server: `(request line, Range header value)`.
pub type RequestLog = Arc<Mutex<Vec<(String, Option<String>)>>>;

/// Starts a server in a background thread serving `body` and returns its base
/// URL plus the request log. The server runs until the process exits.
pub fn start(body: Vec<u8>, opts: ServerOptions) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let port = listener.local_addr().expect("local addr").port();
    let body = Arc::new(body);
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let thread_log = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let log = Arc::clone(&thread_log);
            thread::spawn(move || handle(stream, &body, opts, &log));
        }
    });
    (format!("http://127.0.0.1:{}/file.bin", port), log)
}

fn handle(mut stream: TcpStream, body: &[u8], opts: ServerOptions, log: &RequestLog) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };

    let request_line = request.lines().next().unwrap_or("").to_string();
    let range_start = parse_range_start(request);
    log.lock().unwrap().push((
        request_line,
        range_start.map(|s| format!("bytes={}-", s)),
    ));

    if let Some(status) = opts.force_status {
        let _ = stream.write_all(format!("HTTP/1.1 {}\r\nConnection: close\r\n\r\n", status).as_bytes());
        return;
    }

    let total = body.len() as u64;
    let (status, slice) = match range_start {
        Some(start) if start > 0 && start < total => {
            ("206 Partial Content", &body[start as usize..])
        }
        _ => ("200 OK", body),
    };

    let mut headers = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    if opts.send_content_length {
        headers.push_str(&format!("Content-Length: {}\r\n", slice.len()));
    }
    if status.starts_with("206") {
        let start = total - slice.len() as u64;
        headers.push_str(&format!(
            "Content-Range: bytes {}-{}/{}\r\n",
            start,
            total.saturating_sub(1),
            total
        ));
    }
    headers.push_str("\r\n");
    if stream.write_all(headers.as_bytes()).is_err() {
        return;
    }

    match opts.write_delay {
        None => {
            let _ = stream.write_all(slice);
        }
        Some(delay) => {
            for piece in slice.chunks(opts.slice_size.max(1)) {
                if stream.write_all(piece).is_err() || stream.flush().is_err() {
                    return;
                }
                thread::sleep(delay);
            }
        }
    }
}

/// Start offset of a `Range: bytes=N-` header, if present.
fn parse_range_start(request: &str) -> Option<u64> {
    for line in request.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("range") {
            continue;
        }
        let value = value.trim().to_ascii_lowercase();
        let rest = value.strip_prefix("bytes=")?;
        let (start, _) = rest.split_once('-')?;
        return start.trim().parse().ok();
    }
    None
}
