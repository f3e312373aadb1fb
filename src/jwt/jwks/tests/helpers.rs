use super::super::sanitize::sanitize_jwks;
use super::super::JwksFetcher;
use crate::error::Error;
use jsonwebtoken::jwk::JwkSet;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use url::Url;

/// Serves `sets` in order, repeating the last one, and counts calls.
pub(super) struct SequenceFetcher {
    sets: Mutex<Vec<JwkSet>>,
    delay: Duration,
    pub(super) calls: Arc<AtomicUsize>,
}

impl SequenceFetcher {
    pub(super) fn new(sets: Vec<JwkSet>) -> Self {
        Self {
            sets: Mutex::new(sets),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl JwksFetcher for SequenceFetcher {
    fn fetch(&self, _url: &Url, _timeout: Option<Duration>) -> Result<JwkSet, Error> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let sets = self.sets.lock().unwrap();
        sets.get(idx)
            .or_else(|| sets.last())
            .cloned()
            .ok_or_else(|| Error::Crypto("no jwks configured".to_string()))
    }
}

pub(super) fn jwks_with_kids(kids: &[&str]) -> JwkSet {
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "kid": kid,
                "alg": "RS256",
                "n": "sXchbWFrZV9tb2R1bHVz",
                "e": "AQAB",
            })
        })
        .collect();
    jwks_from_value(json!({ "keys": keys })).expect("jwks")
}

pub(super) fn jwks_from_value(value: Value) -> Result<JwkSet, Error> {
    let mut value = value;
    sanitize_jwks(&mut value);
    serde_json::from_value(value).map_err(Error::from)
}

pub(super) fn serve_responses(
    responses: Vec<String>,
) -> (String, Arc<AtomicUsize>, Sender<()>, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("nonblocking");
    let addr = listener.local_addr().expect("addr");
    let count = Arc::new(AtomicUsize::new(0));
    let count_thread = Arc::clone(&count);
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        while count_thread.load(Ordering::SeqCst) < responses.len() {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            match listener.accept() {
                Ok((mut stream, _)) => {
                    let idx = count_thread.fetch_add(1, Ordering::SeqCst);
                    let response = &responses[idx];
                    let _ = stream.set_nonblocking(false);
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf);
                    let _ = stream.write_all(response.as_bytes());
                    let _ = stream.flush();
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });
    (format!("http://{}", addr), count, shutdown_tx, handle)
}

pub(super) fn ok_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

pub(super) fn status_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}
