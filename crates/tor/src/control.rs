// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Bootstrap Poller (spec §4.7) and `NEWNYM` identity rotation, both driven
//! over Tor's control-port protocol. Every connection is short-lived:
//! connect, authenticate, issue one command, read the reply, disconnect.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::TorError;
use crate::supervisor::TorSupervisor;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(2);

/// A short-lived client for the namespace-resident Tor control port.
pub struct ControlClient {
    addr: SocketAddr,
    cookie_path: std::path::PathBuf,
}

impl ControlClient {
    pub fn new(addr: SocketAddr, data_dir: &Path) -> Self {
        Self { addr, cookie_path: data_dir.join("control_auth_cookie") }
    }

    async fn connect_authenticated(&self) -> Result<TcpStream, TorError> {
        let cookie = tokio::fs::read(&self.cookie_path).await.map_err(TorError::from)?;
        let hex_cookie = hex::encode(cookie);

        let mut stream = tokio::time::timeout(CONTROL_TIMEOUT, TcpStream::connect(self.addr))
            .await
            .map_err(|_| TorError::Control("connect timed out".to_string()))?
            .map_err(TorError::from)?;

        let auth_cmd = format!("AUTHENTICATE {hex_cookie}\r\n");
        stream.write_all(auth_cmd.as_bytes()).await.map_err(TorError::from)?;
        let reply = read_reply(&mut stream).await?;
        if !reply.starts_with("250") {
            return Err(TorError::Control(format!("authentication rejected: {reply}")));
        }
        Ok(stream)
    }

    /// Issue `GETINFO status/bootstrap-phase` and parse the progress.
    pub async fn progress(&self) -> Result<(u8, String), TorError> {
        let mut stream = self.connect_authenticated().await?;
        stream
            .write_all(b"GETINFO status/bootstrap-phase\r\n")
            .await
            .map_err(TorError::from)?;
        let reply = read_reply(&mut stream).await?;
        let _ = stream.write_all(b"QUIT\r\n").await;
        parse_bootstrap_reply(&reply)
    }

    /// Issue `SIGNAL NEWNYM` to request a fresh Tor identity.
    pub async fn new_identity(&self) -> Result<(), TorError> {
        let mut stream = self.connect_authenticated().await?;
        stream.write_all(b"SIGNAL NEWNYM\r\n").await.map_err(TorError::from)?;
        let reply = read_reply(&mut stream).await?;
        let _ = stream.write_all(b"QUIT\r\n").await;
        if !reply.starts_with("250") {
            return Err(TorError::Control(format!("NEWNYM rejected: {reply}")));
        }
        Ok(())
    }

    /// Poll every 2s until bootstrap reaches 100%, the supervised Tor
    /// process dies, or `timeout` elapses (spec §4.7).
    pub async fn wait_until_done(
        &self,
        supervisor: &TorSupervisor,
        timeout: Duration,
    ) -> Result<(), TorError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !supervisor.is_running().await {
                return Err(TorError::Step {
                    step: "bootstrap_wait",
                    reason: "tor process is no longer alive".to_string(),
                });
            }
            if let Ok((percent, _phase)) = self.progress().await {
                if percent >= 100 {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(TorError::BootstrapTimeout { timeout_secs: timeout.as_secs() });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

async fn read_reply(stream: &mut TcpStream) -> Result<String, TorError> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    tokio::time::timeout(CONTROL_TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| TorError::Control("reply timed out".to_string()))?
        .map_err(TorError::from)?;
    Ok(line.trim().to_string())
}

/// Parse `250-status/bootstrap-phase=... PROGRESS=NN TAG=phase_tag ...`.
fn parse_bootstrap_reply(reply: &str) -> Result<(u8, String), TorError> {
    let percent = reply
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix("PROGRESS="))
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(|| TorError::Control(format!("no PROGRESS field in reply: {reply}")))?;
    let tag = reply
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix("TAG="))
        .unwrap_or("unknown")
        .trim_matches('"')
        .to_string();
    Ok((percent, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_and_tag() {
        let reply = r#"250-status/bootstrap-phase=NOTICE BOOTSTRAP PROGRESS=45 TAG="conn_done" SUMMARY="Connected""#;
        let (percent, tag) = parse_bootstrap_reply(reply).expect("parse");
        assert_eq!(percent, 45);
        assert_eq!(tag, "conn_done");
    }

    #[test]
    fn missing_progress_field_is_an_error() {
        assert!(parse_bootstrap_reply("250 OK").is_err());
    }

    #[test]
    fn full_bootstrap_is_recognized() {
        let reply = r#"250-status/bootstrap-phase=NOTICE BOOTSTRAP PROGRESS=100 TAG="done" SUMMARY="Done""#;
        let (percent, _) = parse_bootstrap_reply(reply).expect("parse");
        assert_eq!(percent, 100);
    }
}
