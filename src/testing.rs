//! Test doubles shared by the module tests.

use crate::daemon::Launcher;
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Records every command line instead of running it.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    commands: Arc<Mutex<Vec<String>>>,
    fail_spawn: bool,
    fail_run: bool,
}

impl RecordingLauncher {
    pub fn failing_spawn() -> Self {
        Self {
            fail_spawn: true,
            ..Self::default()
        }
    }

    pub fn failing_run() -> Self {
        Self {
            fail_run: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, program: &str, args: &[&str]) {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.commands.lock().unwrap().push(line);
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()> {
        self.record(program, args);
        if self.fail_spawn {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        Ok(())
    }

    async fn run(&self, program: &str, args: &[&str]) -> io::Result<bool> {
        self.record(program, args);
        if self.fail_run {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        Ok(true)
    }
}

/// A request as the fake daemon saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Minimal HTTP/1.1 server that answers every request with the same canned
/// reply, sent with chunked transfer encoding one part per chunk.
pub struct FakeDaemon {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl FakeDaemon {
    pub async fn start(status: u16, parts: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();

        let captured = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                captured.lock().unwrap().push(request);
                write_reply(&mut stream, status, &parts).await;
            }
        });

        Self {
            url: format!("http://{}/api/generate", addr),
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// URL of a local port with nothing listening on it.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/generate", addr)
}

async fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before request headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        body: buf[header_end..].to_vec(),
    }
}

async fn write_reply(stream: &mut TcpStream, status: u16, parts: &[String]) {
    let head = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        status
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        let frame = format!("{:x}\r\n{}\r\n", part.len(), part);
        // The client may hang up early once it has seen `done`.
        if stream.write_all(frame.as_bytes()).await.is_err() {
            return;
        }
        let _ = stream.flush().await;
    }
    let _ = stream.write_all(b"0\r\n\r\n").await;
    let _ = stream.shutdown().await;
}
