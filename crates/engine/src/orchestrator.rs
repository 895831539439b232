// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Orchestrator (spec §4.5): the transactional pipeline. `enable_extreme`
//! and `enable_partial` push an inverse onto a [`CompensationStack`] after
//! each successful step and unwind it on the first failure; `disable` is a
//! fixed-order, live-component teardown; `emergency_restore` is brute
//! force and never trusts the compensation stack to still be accurate.

use anon_core::{FaultError, KillswitchRules, Mode, OrchestrationContext};
use anon_net::{FirewallEngine, NamespaceManager};
use anon_storage::{SnapshotCapture, SnapshotStore, StateStore};
use anon_tor::{ControlClient, TorSupervisor};
use std::time::Duration;
use tracing::{info, warn};

use crate::compensation::CompensationStack;
use crate::error::EngineError;
use crate::watchdog::{Watchdog, WatchdogContext};

const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(180);
const RESOLV_PATH: &str = "/etc/resolv.conf";
const MANAGED_SERVICES: &[&str] = &["NetworkManager"];

pub struct Orchestrator {
    pub ctx: OrchestrationContext,
    snapshots: SnapshotStore,
    states: StateStore,
    watchdog: Option<(Watchdog, tokio::task::JoinHandle<()>)>,
}

impl Orchestrator {
    pub fn new(ctx: OrchestrationContext, snapshots: SnapshotStore, states: StateStore) -> Self {
        Self { ctx, snapshots, states, watchdog: None }
    }

    fn namespace(&self) -> NamespaceManager {
        NamespaceManager::new(self.ctx.topology, self.ctx.capabilities.egress_iface.clone())
    }

    fn firewall(&self) -> Result<FirewallEngine, EngineError> {
        Ok(FirewallEngine::new(self.ctx.capabilities.firewall_backend)
            .map_err(anon_core::FaultError::from)?)
    }

    fn killswitch_rules(&self) -> KillswitchRules {
        KillswitchRules::for_topology(
            self.ctx.capabilities.tor_uid,
            &self.ctx.capabilities.egress_iface,
            &self.ctx.topology,
        )
    }

    fn tor_supervisor(&self) -> TorSupervisor {
        TorSupervisor::new(
            self.namespace(),
            self.ctx.capabilities.tor_user.clone(),
            self.ctx.capabilities.tor_data_dir.clone(),
            self.ctx.paths.torrc_path.clone(),
            self.ctx.paths.root.join("tor.pid"),
        )
    }

    #[allow(clippy::expect_used)]
    fn control_client(&self) -> ControlClient {
        let addr = format!(
            "{}:{}",
            self.ctx.topology.tor_ip, self.killswitch_rules().tor_endpoint.control_port
        )
        .parse()
        .expect("fixed topology address/port always parses");
        ControlClient::new(addr, &self.ctx.capabilities.tor_data_dir)
    }

    async fn check_required_tools(&self) -> Result<(), EngineError> {
        let backend_tool = match self.ctx.capabilities.firewall_backend {
            anon_core::FirewallBackend::Modern => "nft",
            anon_core::FirewallBackend::Legacy => "iptables",
            anon_core::FirewallBackend::LegacyAlt => "iptables-legacy",
            anon_core::FirewallBackend::Unknown => {
                return Err(FaultError::UnsupportedHost {
                    reason: "no usable firewall backend".to_string(),
                }
                .into())
            }
        };
        for tool in ["tor", "ip", backend_tool] {
            anon_shell::which(tool).map_err(anon_core::FaultError::from)?;
        }
        Ok(())
    }

    fn snapshot_capture(&self) -> SnapshotCapture {
        SnapshotCapture {
            firewall_backend: self.ctx.capabilities.firewall_backend,
            service_names: MANAGED_SERVICES.iter().map(|s| s.to_string()).collect(),
            iface_name: self.ctx.capabilities.egress_iface.clone(),
        }
    }

    /// The extreme pipeline (spec §4.5): every step engaged.
    pub async fn enable_extreme(&mut self) -> Result<(), EngineError> {
        self.enable(Mode::Extreme, true).await
    }

    /// The partial pipeline: omits firewall killswitch, sysctl hardening,
    /// and MAC randomization, while still engaging DNS through Tor.
    pub async fn enable_partial(&mut self) -> Result<(), EngineError> {
        self.enable(Mode::Partial, false).await
    }

    async fn enable(&mut self, mode: Mode, extreme: bool) -> Result<(), EngineError> {
        let mut stack = CompensationStack::new();

        if let Err(e) = self.check_required_tools().await {
            return Err(e);
        }

        self.snapshots.save("initial", &self.snapshot_capture()).await.map_err(|e| {
            anon_core::FaultError::StepFault { step: "snapshot_save".to_string(), reason: e.to_string() }
        })?;

        if extreme {
            anon_net::sysctl::apply_hardening().await;
            stack.push("sysctl_hardening", || async {
                warn!("compensation for sysctl hardening is the snapshot restore, not reversed here");
            });
        }

        anon_net::sysctl::disable_ipv6().await;
        stack.push("ipv6_disable", || async {
            if let Err(e) = anon_net::sysctl::reenable_ipv6().await {
                warn!(error = %e, "failed to re-enable ipv6 during compensation");
            }
        });

        let namespace = self.namespace();
        if let Err(e) = namespace.create().await {
            stack.unwind().await;
            return Err(anon_core::FaultError::from(e).into());
        }
        let topo = self.ctx.topology;
        let egress_iface = self.ctx.capabilities.egress_iface.clone();
        stack.push("namespace_create", move || async move {
            let namespace = NamespaceManager::new(topo, egress_iface);
            let _ = namespace.destroy().await;
        });

        let rules = self.killswitch_rules();
        let tor = self.tor_supervisor();
        anon_tor::config::write_torrc(&self.ctx.paths, &rules, &self.ctx.capabilities.tor_data_dir)
            .await
            .map_err(EngineError::from)?;

        if let Err(e) = tor.start().await {
            stack.unwind().await;
            return Err(anon_core::FaultError::from(e).into());
        }
        {
            let tor = self.tor_supervisor();
            stack.push("tor_start", move || async move {
                let _ = tor.stop().await;
            });
        }

        let control = self.control_client();
        if let Err(e) = control.wait_until_done(&tor, BOOTSTRAP_TIMEOUT).await {
            stack.unwind().await;
            return Err(anon_core::FaultError::from(e).into());
        }

        if extreme {
            let firewall = self.firewall()?;
            if let Err(e) = firewall.engage(&rules).await {
                stack.unwind().await;
                return Err(anon_core::FaultError::from(e).into());
            }
            let backend_tag = self.ctx.capabilities.firewall_backend;
            stack.push("firewall_engage", move || async move {
                let Ok(firewall) = FirewallEngine::new(backend_tag) else { return };
                let _ = firewall.disengage().await;
            });
        }

        if let Err(e) = anon_net::dns::lock().await {
            stack.unwind().await;
            return Err(anon_core::FaultError::from(e).into());
        }
        stack.push("dns_lock", || async {
            anon_shell::run_best_effort("chattr", &["-i", RESOLV_PATH]).await;
        });

        if extreme {
            let randomized = anon_net::mac::randomize(&self.ctx.capabilities.egress_iface).await;
            if !randomized {
                warn!("MAC randomization did not apply; continuing (non-fatal per spec)");
            }
        }

        anon_tor::config::write_proxychains(&self.ctx.paths, &rules).await.map_err(EngineError::from)?;

        let watchdog_ctx = WatchdogContext {
            namespace: self.namespace(),
            tor: self.tor_supervisor(),
            firewall: self.firewall()?,
            resolv_path: std::path::PathBuf::from(RESOLV_PATH),
            alert_fifo: self.ctx.paths.alert_fifo.clone(),
            ns_name: self.ctx.topology.ns_name,
        };
        let (watchdog, handle) = Watchdog::spawn(watchdog_ctx);
        self.watchdog = Some((watchdog, handle));

        self.ctx.state.anonymity_active = true;
        self.ctx.state.mode = mode;
        self.ctx.state.distro_family = self.ctx.capabilities.distro_family;
        self.ctx.state.firewall_backend = self.ctx.capabilities.firewall_backend;
        self.states.save(&self.ctx.state).map_err(EngineError::from)?;

        stack.commit();
        info!(?mode, "enable pipeline completed");
        Ok(())
    }

    /// Ordered, live-component teardown (spec §4.5): stops the watchdog
    /// first, then firewall, Tor, namespace, MAC (no-op to reverse), sysctl,
    /// IPv6 (only if it was enabled before), DNS, and restarts the
    /// connection manager.
    pub async fn disable(&mut self) -> Result<(), EngineError> {
        if let Some((watchdog, handle)) = self.watchdog.take() {
            watchdog.stop();
            let _ = handle.await;
        }

        if self.ctx.state.mode == Mode::Extreme {
            if let Ok(firewall) = self.firewall() {
                let _ = firewall.disengage().await;
            }
        }

        let tor = self.tor_supervisor();
        let _ = tor.stop().await;

        let namespace = self.namespace();
        let _ = namespace.destroy().await;

        self.snapshots.restore("initial").await.map_err(|e| {
            anon_core::FaultError::StepFault { step: "snapshot_restore".to_string(), reason: e.to_string() }
        })?;

        self.ctx.state.anonymity_active = false;
        self.ctx.state.mode = Mode::None;
        self.states.save(&self.ctx.state).map_err(EngineError::from)?;

        info!("disable completed");
        Ok(())
    }

    /// Brute-force recovery (spec §4.5): assumes arbitrary intermediate
    /// state, tears everything down without checking preconditions, falls
    /// back to safe defaults if no valid initial snapshot exists.
    pub async fn emergency_restore(&mut self) -> Result<(), EngineError> {
        if let Some((watchdog, handle)) = self.watchdog.take() {
            watchdog.stop();
            let _ = handle.await;
        }

        if let Ok(firewall) = self.firewall() {
            let _ = firewall.disengage().await;
        }
        let _ = self.tor_supervisor().stop().await;
        let _ = self.namespace().destroy().await;

        let restore_result = self.snapshots.restore("initial").await;

        self.ctx.state.anonymity_active = false;
        self.ctx.state.mode = Mode::None;
        let _ = self.states.save(&self.ctx.state);

        match restore_result {
            Ok(()) => {
                info!("emergency restore completed from initial snapshot");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "emergency restore fell back to safe defaults");
                Err(anon_core::FaultError::SnapshotInvalid.into())
            }
        }
    }
}
