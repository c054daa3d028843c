//! A tiny scripted HTTP server for integration tests.
//!
//! Each accepted connection consumes one scripted response (in order) and
//! is closed afterwards. Raw request bytes are captured so tests can assert
//! on methods, paths and headers exactly as they went over the wire.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct MockServer {
    addr: SocketAddr,
    listener: Option<TcpListener>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    /// Bind to an ephemeral local port. Call [`MockServer::serve`] with the
    /// scripted responses once their bodies are known (e.g. redirect
    /// locations that embed this server's address).
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self {
            addr,
            listener: Some(listener),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Start serving: one connection per scripted response, then stop.
    pub fn serve(&mut self, responses: Vec<String>) {
        let listener = self
            .listener
            .take()
            .expect("MockServer::serve called twice");
        let requests = self.requests.clone();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                match read_request(&mut socket).await {
                    Ok(raw) => requests.lock().unwrap().push(raw),
                    Err(_) => break,
                }
                if socket.write_all(response.as_bytes()).await.is_err() {
                    break;
                }
                let _ = socket.shutdown().await;
            }
        });
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Host part only (no port) — the domain key workers report.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Raw requests captured so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Build a minimal HTTP/1.1 response with `Content-Length` and
/// `Connection: close` added automatically.
pub fn http_response(status: u16, reason: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!("content-length: {}\r\n", body.len()));
    response.push_str("connection: close\r\n\r\n");
    response.push_str(body);
    response
}

/// Read one HTTP request: headers up to the blank line, then
/// `Content-Length` bytes of body.
async fn read_request(socket: &mut TcpStream) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(String::from_utf8_lossy(&buf).into_owned());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_blank_line(&buf) {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = parse_content_length(&headers);
    let total = header_end + content_length;
    while buf.len() < total {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = total.min(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_content_length(headers: &str) -> usize {
    headers
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
