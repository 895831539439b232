// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! `--status`: a read-only dashboard snapshot (spec §6). Never mutates
//! anything; every probe here is best-effort and failures degrade to
//! "not present" rather than aborting the report.

use anon_core::OrchestrationContext;
use anon_engine::StatusReport;

use crate::components;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(ctx: &OrchestrationContext, format: OutputFormat) -> Result<(), ExitError> {
    let report = build_report(ctx).await;

    format_or_json(format, &report, || {
        println!("anonctl status");
        println!("  anonymity active : {}", report.anonymity_active);
        println!("  mode             : {:?}", report.mode);
        println!("  firewall backend : {:?}", report.firewall_backend);
        println!("  tor running      : {}", report.tor_running);
        match report.bootstrap_percent {
            Some(p) => println!("  bootstrap        : {p}%"),
            None => println!("  bootstrap        : unknown"),
        }
        println!("  namespace present: {}", report.namespace_present);
        println!("  dns locked       : {}", report.dns_locked);
        println!("  ipv6 disabled    : {}", report.ipv6_disabled);
        println!("  exit ip          : {}", report.exit_ip.as_deref().unwrap_or("unknown"));
        println!("  healthy          : {}", report.is_healthy());
    })
    .map_err(|e| ExitError::new(1, e.to_string()))
}

async fn build_report(ctx: &OrchestrationContext) -> StatusReport {
    let namespace = components::namespace(ctx);
    let tor = components::tor_supervisor(ctx);
    let control = components::control_client(ctx);

    let tor_running = tor.is_running().await;
    let bootstrap_percent = if tor_running { control.progress().await.ok().map(|(p, _)| p) } else { None };

    let namespace_present = match anon_shell::run_checked("ip", &["netns", "list"]).await {
        Ok(out) => anon_shell::stdout_string(&out)
            .lines()
            .any(|line| line.split_whitespace().next() == Some(ctx.topology.ns_name)),
        Err(_) => false,
    };

    let dns_locked = anon_net::dns::points_at_loopback(std::path::Path::new("/etc/resolv.conf")).await;
    let ipv6_disabled = tokio::fs::read_to_string("/proc/sys/net/ipv6/conf/all/disable_ipv6")
        .await
        .map(|s| s.trim() == "1")
        .unwrap_or(false);

    let exit_ip = if tor_running && bootstrap_percent == Some(100) {
        namespace
            .exec("curl", &["-s", "https://check.torproject.org/api/ip"])
            .await
            .ok()
            .map(|out| anon_shell::stdout_string(&out))
            .and_then(|body| extract_ip_field(&body))
    } else {
        None
    };

    StatusReport {
        anonymity_active: ctx.state.anonymity_active,
        mode: ctx.state.mode,
        firewall_backend: ctx.capabilities.firewall_backend,
        tor_running,
        bootstrap_percent,
        namespace_present,
        dns_locked,
        ipv6_disabled,
        exit_ip,
    }
}

/// Pull `"IP":"<addr>"` out of the Tor Project oracle's JSON body without a
/// JSON dependency for a single scalar field.
fn extract_ip_field(body: &str) -> Option<String> {
    let key = "\"IP\":\"";
    let start = body.find(key)? + key.len();
    let end = body[start..].find('"')? + start;
    Some(body[start..end].to_string())
}
