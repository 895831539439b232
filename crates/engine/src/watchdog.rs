// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Watchdog (spec §4.6): a timer-driven task that asserts invariants every
//! 30s while the system is active, never repairs anything, and never
//! blocks on its alert channel (spec §5, "writer drops alerts if no reader
//! is attached").

use anon_core::{AlertCategory, WatchdogAlert};
use anon_net::NamespaceManager;
use anon_tor::TorSupervisor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, warn};

const TICK_PERIOD: Duration = Duration::from_secs(30);
const IPV6_DISABLE_FLAG: &str = "/proc/sys/net/ipv6/conf/all/disable_ipv6";

/// Everything the watchdog needs read-only access to (spec §3:
/// "the Watchdog holds read-only references to all of the above and never
/// mutates except to emit alerts").
pub struct WatchdogContext {
    pub namespace: NamespaceManager,
    pub tor: TorSupervisor,
    pub firewall: anon_net::FirewallEngine,
    pub resolv_path: PathBuf,
    pub alert_fifo: PathBuf,
    pub ns_name: &'static str,
}

pub struct Watchdog {
    stop: Arc<Notify>,
}

impl Watchdog {
    /// Spawn the supervised tick loop. Returns a handle whose `stop()`
    /// cancels it; teardown always calls this before firewall teardown
    /// (spec §5 ordering guarantee (b)).
    pub fn spawn(ctx: WatchdogContext) -> (Self, tokio::task::JoinHandle<()>) {
        let stop = Arc::new(Notify::new());
        let stop_clone = stop.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_PERIOD);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tick(&ctx).await;
                    }
                    _ = stop_clone.notified() => {
                        break;
                    }
                }
            }
        });
        (Self { stop }, handle)
    }

    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

async fn tick(ctx: &WatchdogContext) {
    if !ctx.tor.is_running().await {
        emit(ctx, AlertCategory::Tor, "tor process is not alive").await;
    }
    if !ctx.firewall.is_active().await {
        emit(ctx, AlertCategory::Firewall, "anonmanager firewall table/chain is absent").await;
    }
    if !anon_net::dns::points_at_loopback(&ctx.resolv_path).await {
        emit(ctx, AlertCategory::Dns, "resolver config no longer points at loopback").await;
    }
    if !ipv6_still_disabled().await {
        emit(ctx, AlertCategory::Ipv6, "IPv6 disable flag is no longer set").await;
    }
    if !namespace_exists(ctx.ns_name).await {
        emit(ctx, AlertCategory::Namespace, "namespace no longer exists").await;
    }
}

async fn ipv6_still_disabled() -> bool {
    tokio::fs::read_to_string(IPV6_DISABLE_FLAG).await.map(|s| s.trim() == "1").unwrap_or(false)
}

async fn namespace_exists(ns_name: &str) -> bool {
    let Ok(output) = anon_shell::run_checked("ip", &["netns", "list"]).await else {
        return false;
    };
    anon_shell::stdout_string(&output).lines().any(|line| line.split_whitespace().next() == Some(ns_name))
}

async fn emit(ctx: &WatchdogContext, category: AlertCategory, message: &str) {
    let alert = WatchdogAlert { category, message: message.to_string() };
    warn!(category = ?alert.category, message = %alert.message, "watchdog alert");
    if let Err(e) = write_alert_nonblocking(&ctx.alert_fifo, &alert.to_line()).await {
        error!(error = %e, "failed to deliver watchdog alert to out-of-band channel");
    }
}

/// Write one line to the bounded alert channel without blocking; if no
/// reader is attached, the alert is dropped rather than stalling the tick
/// (spec §5, shared resource (4)).
#[cfg(unix)]
async fn write_alert_nonblocking(path: &std::path::Path, line: &str) -> std::io::Result<()> {
    use nix::fcntl::{open, OFlag};
    use nix::sys::stat::Mode;
    use std::io::Write;

    let path = path.to_path_buf();
    let line = line.to_string();
    tokio::task::spawn_blocking(move || {
        let fd = match open(&path, OFlag::O_WRONLY | OFlag::O_NONBLOCK, Mode::empty()) {
            Ok(fd) => fd,
            Err(nix::errno::Errno::ENXIO) => return Ok(()),
            Err(e) => return Err(std::io::Error::from(e)),
        };
        let mut file = std::fs::File::from(fd);
        file.write_all(line.as_bytes())
    })
    .await
    .unwrap_or(Ok(()))
}

#[cfg(not(unix))]
async fn write_alert_nonblocking(_path: &std::path::Path, _line: &str) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writing_to_missing_fifo_does_not_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("no-reader.fifo");
        // No FIFO exists at all: open itself fails, but the caller maps
        // that into a plain io::Error rather than panicking.
        assert!(write_alert_nonblocking(&path, "test\n").await.is_err());
    }
}
