//! In-process mock of a Redis-compatible REST endpoint.
//!
//! Understands the handful of commands the csvchat backends send:
//! `SET`, `GET`, `DEL`, `EXISTS`, `INCRBY`, `PEXPIRE` and an `EVAL` of the
//! fixed-window counter script. Every connection is answered with
//! `Connection: close`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::config::RedisRestConfig;

const DEFAULT_TOKEN: &str = "test-token";

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

#[derive(Debug, Default)]
struct MockState {
    data: Mutex<HashMap<String, Entry>>,
    commands: Mutex<Vec<Vec<String>>>,
}

/// Mock REST key-value server bound to an ephemeral local port.
///
/// The accept loop is aborted when the server is dropped.
pub struct MockRestServer {
    base_url: String,
    token: String,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockRestServer {
    /// Start a server expecting the default bearer token.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        Self::start_with_token(DEFAULT_TOKEN).await
    }

    /// Start a server expecting the given bearer token.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start_with_token(token: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener
            .local_addr()
            .expect("mock server has no local address")
            .port();
        let state = Arc::new(MockState::default());
        let handle = tokio::spawn(accept_loop(listener, token.to_owned(), Arc::clone(&state)));

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            token: token.to_owned(),
            state,
            handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> RedisRestConfig {
        RedisRestConfig::new(&self.base_url, &self.token)
    }

    /// Every authorized command received so far, in arrival order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read a stored value directly, bypassing HTTP.
    pub fn raw_get(&self, key: &str) -> Option<String> {
        let data = self.state.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.get(key).filter(|e| e.live()).map(|e| e.value.clone())
    }

    /// Remaining time to live of a key, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let data = self.state.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

impl Drop for MockRestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn accept_loop(listener: TcpListener, token: String, state: Arc<MockState>) {
    while let Ok((stream, _)) = listener.accept().await {
        let token = token.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let _ = handle_connection(stream, &token, &state).await;
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    token: &str,
    state: &MockState,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = header(&head, "content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = &buf[header_end..body_end];

    let expected = format!("Bearer {token}");
    let (status, payload) = if header(&head, "authorization") != Some(expected.as_str()) {
        (401, json!({ "error": "Unauthorized" }))
    } else {
        match serde_json::from_slice::<Vec<Value>>(body) {
            Ok(raw) => {
                let args: Vec<String> = raw.iter().map(arg_to_string).collect();
                state
                    .commands
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(args.clone());
                match execute(state, &args) {
                    Ok(result) => (200, json!({ "result": result })),
                    Err(message) => (400, json!({ "error": message })),
                }
            }
            Err(e) => (400, json!({ "error": format!("ERR failed to parse command: {e}") })),
        }
    };

    let body = payload.to_string();
    let response = format!(
        "HTTP/1.1 {status} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        if status == 200 { "OK" } else { "Error" },
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then_some(value.trim())
    })
}

fn arg_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn execute(state: &MockState, args: &[String]) -> Result<Value, String> {
    let mut data = state.data.lock().unwrap_or_else(PoisonError::into_inner);
    data.retain(|_, entry| entry.live());

    let name = args.first().map(|s| s.to_ascii_uppercase()).unwrap_or_default();
    let arg = |i: usize| {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| format!("ERR wrong number of arguments for '{name}' command"))
    };

    match name.as_str() {
        "SET" => {
            data.insert(
                arg(1)?.to_owned(),
                Entry {
                    value: arg(2)?.to_owned(),
                    expires_at: None,
                },
            );
            Ok(json!("OK"))
        }
        "GET" => Ok(data
            .get(arg(1)?)
            .map_or(Value::Null, |e| json!(e.value))),
        "DEL" => {
            let removed = args[1..].iter().filter(|k| data.remove(*k).is_some()).count();
            Ok(json!(removed))
        }
        "EXISTS" => {
            let found = args[1..].iter().filter(|k| data.contains_key(*k)).count();
            Ok(json!(found))
        }
        "INCRBY" => {
            let by = parse_int(arg(2)?)?;
            Ok(json!(incr_by(&mut data, arg(1)?, by)?))
        }
        "PEXPIRE" => {
            let ms = parse_int(arg(2)?)?;
            Ok(json!(i64::from(pexpire(&mut data, arg(1)?, ms))))
        }
        "EVAL" => {
            let script = arg(1)?;
            if !script.contains("INCRBY") {
                return Err("ERR unsupported script".into());
            }
            // KEYS[1], ARGV[1] = window ms, ARGV[2] = increment
            let key = arg(3)?;
            let window = parse_int(arg(4)?)?;
            let by = parse_int(arg(5)?)?;
            let used = incr_by(&mut data, key, by)?;
            if used == by {
                pexpire(&mut data, key, window);
            }
            Ok(json!(used))
        }
        _ => Err(format!("ERR unknown command '{name}'")),
    }
}

fn parse_int(raw: &str) -> Result<i64, String> {
    raw.parse()
        .map_err(|_| "ERR value is not an integer or out of range".to_owned())
}

fn incr_by(data: &mut HashMap<String, Entry>, key: &str, by: i64) -> Result<i64, String> {
    let entry = data.entry(key.to_owned()).or_insert_with(|| Entry {
        value: "0".into(),
        expires_at: None,
    });
    let next = parse_int(&entry.value)? + by;
    entry.value = next.to_string();
    Ok(next)
}

fn pexpire(data: &mut HashMap<String, Entry>, key: &str, ms: i64) -> bool {
    let Some(entry) = data.get_mut(key) else {
        return false;
    };
    let ms = u64::try_from(ms).unwrap_or(0);
    entry.expires_at = Some(Instant::now() + Duration::from_millis(ms));
    true
}
