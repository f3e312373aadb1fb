#![allow(dead_code)]

use compact_jose::Key;
use rand::thread_rng;
use rsa::RsaPrivateKey;
use std::io::{Read, Write};
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const MAX_READ_DURATION: Duration = Duration::from_secs(6);
const MAX_HEADER_BYTES: usize = 64 * 1024;

pub const NOW: i64 = 1_700_000_000;

pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl CapturedRequest {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn rsa_key() -> Key {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    Key::RsaPrivate(
        KEY.get_or_init(|| RsaPrivateKey::new(&mut thread_rng(), 2048).expect("private key"))
            .clone(),
    )
}

pub fn jwks_body(keys: &[(&Key, &str)]) -> String {
    let keys: Vec<_> = keys
        .iter()
        .map(|(key, kid)| key.to_jwk(Some(kid)).expect("jwk"))
        .collect();
    serde_json::to_string(&serde_json::json!({ "keys": keys })).expect("jwks json")
}

pub fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Answers one connection per entry of `responses` on a plain thread, for
/// blocking clients. Returns the base URL and a request counter.
pub fn serve_blocking(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let count = Arc::new(AtomicUsize::new(0));
    let count_thread = Arc::clone(&count);
    thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                break;
            };
            count_thread.fetch_add(1, Ordering::SeqCst);
            let _ = stream.set_read_timeout(Some(READ_TIMEOUT));
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    (format!("http://{}", addr), count)
}

pub async fn serve_once(
    response: impl AsRef<[u8]>,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel();
    let response = response.as_ref().to_vec();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let req = read_request(&mut stream).await;
            let _ = tx.send(req);
            let _ = stream.write_all(&response).await;
        }
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let deadline = Instant::now() + MAX_READ_DURATION;
    let header_end = loop {
        if buf.len() >= MAX_HEADER_BYTES {
            panic!("request headers too large");
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            panic!("timed out reading request headers");
        }
        let read = match timeout(remaining.min(READ_TIMEOUT), stream.read(&mut chunk)).await {
            Ok(Ok(read)) => read,
            Ok(Err(e)) => panic!("read_request I/O error: {e}"),
            Err(_) => continue,
        };
        if read == 0 {
            break None;
        }
        buf.extend_from_slice(&chunk[..read]);
        if let Some(pos) = find_header_end(&buf) {
            break Some(pos);
        }
    };

    let Some(header_end) = header_end else {
        return CapturedRequest {
            method: "<incomplete>".to_string(),
            path: "<eof>".to_string(),
            headers: Vec::new(),
        };
    };
    let header_str = String::from_utf8_lossy(&buf[..header_end]);
    let mut lines = header_str.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts
        .next()
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("")
        .to_string();

    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();
    CapturedRequest {
        method,
        path,
        headers,
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}
