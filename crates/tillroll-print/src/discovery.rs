// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Discovery coordinator: runs one printer scan at a time against the native
// capabilities, normalizes what they report, and publishes the merged printer
// list plus scan state on a watch channel.
//
// Starting a scan while one is in flight aborts the old task. A generation
// counter, checked under the same lock that publishes, makes sure a
// superseded scan can never overwrite the state of a newer one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use tillroll_bridge::traits::{
    BluetoothScan, DiscoveryFilter, DiscoveryOptions, PlatformBridge, RawDeviceRecord,
};
use tillroll_core::config::DiscoveryConfig;
use tillroll_core::error::{Result, TillrollError, Unavailable};
use tillroll_core::human_errors::humanize_error;
use tillroll_core::types::{
    BLUETOOTH_TARGET_PREFIX, DiscoveryMode, DiscoverySession, PrinterDescriptor,
    PrinterEndpoint, ScanId, ScanStatus, non_empty,
};

use crate::registry::PrinterRegistry;

/// Extra time granted to a capability past its own scan window before the
/// coordinator stops waiting for it.
const CAPABILITY_GRACE: Duration = Duration::from_millis(250);

/// Device type reported for Bluetooth scan results.
const BLUETOOTH_DEVICE_TYPE: &str = "BLUETOOTH_PRINTER";

/// What subscribers see: the merged printer list and the latest scan.
#[derive(Debug, Clone)]
pub struct DiscoverySnapshot {
    pub printers: Vec<PrinterDescriptor>,
    pub session: DiscoverySession,
}

/// Coordinates printer scans. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DiscoveryCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    bridge: Arc<dyn PlatformBridge>,
    config: DiscoveryConfig,
    state: Mutex<ScanState>,
    snapshot: watch::Sender<DiscoverySnapshot>,
}

struct ScanState {
    registry: PrinterRegistry,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Records from one source plus whether its window elapsed.
#[derive(Debug, Default)]
struct SourceScan {
    printers: Vec<PrinterDescriptor>,
    timed_out: bool,
    /// Failure of the other source in an `all` scan.
    notice: Option<TillrollError>,
}

impl DiscoveryCoordinator {
    pub fn new(
        bridge: Arc<dyn PlatformBridge>,
        config: DiscoveryConfig,
        synthetic: Vec<PrinterDescriptor>,
    ) -> Self {
        let registry = PrinterRegistry::new(synthetic);
        let (snapshot, _) = watch::channel(DiscoverySnapshot {
            printers: registry.printers().to_vec(),
            session: DiscoverySession::idle(),
        });
        Self {
            inner: Arc::new(Inner {
                bridge,
                config,
                state: Mutex::new(ScanState {
                    registry,
                    generation: 0,
                    task: None,
                }),
                snapshot,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DiscoverySnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> DiscoverySnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Current merged printer list.
    pub fn printers(&self) -> Vec<PrinterDescriptor> {
        self.inner.lock_state().registry.printers().to_vec()
    }

    /// Look up a printer in the merged list by target (case-insensitive).
    pub fn find(&self, target: &str) -> Option<PrinterDescriptor> {
        self.inner.lock_state().registry.find(target).cloned()
    }

    /// Start a scan in the background and return immediately.
    ///
    /// Must be called from within a Tokio runtime. Progress is observable
    /// through [`subscribe`](Self::subscribe).
    pub fn start_scan(&self, mode: DiscoveryMode) -> ScanId {
        let (generation, session) = self.inner.begin(mode);
        let id = session.id;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.run(generation, session).await });

        let mut state = self.inner.lock_state();
        if state.generation == generation {
            state.task = Some(handle);
        } else {
            handle.abort();
        }
        id
    }

    /// Run a scan to completion and return the resulting snapshot.
    pub async fn scan(&self, mode: DiscoveryMode) -> DiscoverySnapshot {
        let (generation, session) = self.inner.begin(mode);
        self.inner.run(generation, session).await;
        self.snapshot()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Supersede any scan in flight and publish the `scanning` state.
    fn begin(&self, mode: DiscoveryMode) -> (u64, DiscoverySession) {
        let mut state = self.lock_state();
        state.generation += 1;
        if let Some(previous) = state.task.take() {
            debug!(generation = state.generation - 1, "aborting superseded scan");
            previous.abort();
        }

        let session = DiscoverySession::started(mode);
        info!(scan_id = %session.id, %mode, "printer scan started");
        self.snapshot.send_replace(DiscoverySnapshot {
            printers: state.registry.printers().to_vec(),
            session: session.clone(),
        });
        (state.generation, session)
    }

    async fn run(&self, generation: u64, mut session: DiscoverySession) {
        let outcome = match session.mode {
            DiscoveryMode::Network => self.scan_network().await,
            DiscoveryMode::Bluetooth => self.scan_bluetooth().await,
            DiscoveryMode::All => {
                let (bluetooth, network) =
                    tokio::join!(self.scan_bluetooth(), self.scan_network());
                combine(bluetooth, network)
            }
        };

        let mut state = self.lock_state();
        if state.generation != generation {
            debug!(scan_id = %session.id, "discarding superseded scan result");
            return;
        }
        state.task = None;
        session.finished_at = Some(Utc::now());

        match outcome {
            Ok(found) => {
                session.status = ScanStatus::Completed;
                session.timed_out = found.timed_out;
                if let Some(notice) = &found.notice {
                    session.error = Some(humanize_error(notice));
                } else if found.timed_out && found.printers.is_empty() {
                    session.error = Some(humanize_error(&TillrollError::DiscoveryTimeout(
                        self.window(session.mode),
                    )));
                }
                info!(
                    scan_id = %session.id,
                    found = found.printers.len(),
                    timed_out = found.timed_out,
                    "printer scan completed"
                );
                state.registry.apply_scan(&found.printers);
                session.results = found.printers;
            }
            Err(e) => {
                warn!(scan_id = %session.id, error = %e, "printer scan failed");
                session.status = ScanStatus::Failed;
                session.error = Some(humanize_error(&e));
            }
        }

        self.snapshot.send_replace(DiscoverySnapshot {
            printers: state.registry.printers().to_vec(),
            session,
        });
    }

    /// The longest window a scan in `mode` may take.
    fn window(&self, mode: DiscoveryMode) -> Duration {
        match mode {
            DiscoveryMode::Network => self.config.network_timeout(),
            DiscoveryMode::Bluetooth => self.config.bluetooth_timeout(),
            DiscoveryMode::All => self
                .config
                .network_timeout()
                .max(self.config.bluetooth_timeout()),
        }
    }

    async fn scan_network(&self) -> Result<SourceScan> {
        let options = DiscoveryOptions {
            timeout: self.config.network_timeout(),
            filter: DiscoveryFilter::Network,
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = tokio::time::timeout(
            options.timeout + CAPABILITY_GRACE,
            self.bridge.discover(options, tx),
        )
        .await;

        // The sender is gone once the call finished or was dropped, so this
        // drains everything reported so far.
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        let printers: Vec<_> = records.into_iter().filter_map(normalize_record).collect();

        match result {
            Ok(Ok(())) => Ok(SourceScan {
                printers,
                ..Default::default()
            }),
            Ok(Err(e)) => Err(translate_discovery_error(e)),
            Err(_) => {
                warn!(partial = printers.len(), "network discovery timed out");
                Ok(SourceScan {
                    printers,
                    timed_out: true,
                    notice: None,
                })
            }
        }
    }

    async fn scan_bluetooth(&self) -> Result<SourceScan> {
        self.ensure_bluetooth_enabled().await?;

        let window = self.config.bluetooth_timeout();
        match tokio::time::timeout(window, self.bridge.scan()).await {
            Ok(Ok(scan)) => Ok(SourceScan {
                printers: normalize_bluetooth(&scan),
                ..Default::default()
            }),
            Ok(Err(e)) => Err(translate_discovery_error(e)),
            Err(_) => {
                warn!(window_ms = window.as_millis() as u64, "Bluetooth scan timed out");
                Ok(SourceScan {
                    timed_out: true,
                    ..Default::default()
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn ensure_bluetooth_enabled(&self) -> Result<()> {
        let disabled = TillrollError::DiscoveryUnavailable(Unavailable::CapabilityDisabled);

        if self.bridge.is_enabled().await.map_err(translate_discovery_error)? {
            return Ok(());
        }
        if !self.config.request_bluetooth_enable {
            return Err(disabled);
        }

        info!("Bluetooth disabled, requesting enable");
        self.bridge.enable().await.map_err(translate_discovery_error)?;
        if self.bridge.is_enabled().await.map_err(translate_discovery_error)? {
            Ok(())
        } else {
            Err(disabled)
        }
    }
}

/// Outcome of an `all` scan: fails only when both sources fail, reporting
/// the Bluetooth error. A single failed source is kept as a notice.
fn combine(bluetooth: Result<SourceScan>, network: Result<SourceScan>) -> Result<SourceScan> {
    match (bluetooth, network) {
        (Ok(mut bt), Ok(net)) => {
            bt.printers.extend(net.printers);
            bt.timed_out |= net.timed_out;
            Ok(bt)
        }
        (Ok(mut found), Err(e)) => {
            warn!(error = %e, "network discovery failed, keeping Bluetooth results");
            found.notice = Some(e);
            Ok(found)
        }
        (Err(e), Ok(mut found)) => {
            warn!(error = %e, "Bluetooth scan failed, keeping network results");
            found.notice = Some(e);
            Ok(found)
        }
        (Err(bt), Err(net)) => {
            warn!(error = %net, "network discovery failed");
            Err(bt)
        }
    }
}

/// Map a capability error onto the discovery error kinds.
fn translate_discovery_error(err: TillrollError) -> TillrollError {
    match err {
        TillrollError::PlatformUnavailable => {
            TillrollError::DiscoveryUnavailable(Unavailable::CapabilityDisabled)
        }
        TillrollError::PermissionDenied(_) => {
            TillrollError::DiscoveryUnavailable(Unavailable::PermissionDenied)
        }
        e @ (TillrollError::DiscoveryUnavailable(_)
        | TillrollError::Discovery(_)
        | TillrollError::DiscoveryTimeout(_)) => e,
        other => TillrollError::Discovery(other.to_string()),
    }
}

/// Turn a raw SDK record into a descriptor. Records with neither a target
/// nor an IP address are dropped.
pub fn normalize_record(raw: RawDeviceRecord) -> Option<PrinterDescriptor> {
    let target = non_empty(raw.target.as_deref()).or_else(|| non_empty(raw.ip_address.as_deref()))?;
    let bluetooth_address = non_empty(raw.bluetooth_address.as_deref());
    let endpoint =
        PrinterEndpoint::resolve(&target, raw.connection_hint, bluetooth_address.as_deref());

    Some(PrinterDescriptor {
        display_name: non_empty(raw.name.as_deref()).unwrap_or_else(|| target.clone()),
        mac_address: non_empty(raw.mac_address.as_deref()),
        bluetooth_address,
        ip_address: non_empty(raw.ip_address.as_deref()),
        endpoint,
        device_type: non_empty(raw.device_type.as_deref()),
        target,
        pin: None,
        notes: None,
        is_synthetic: false,
    })
}

/// Paired devices first, then found ones; entries without an address are
/// dropped and repeated MAC addresses collapse to the first.
pub fn normalize_bluetooth(scan: &BluetoothScan) -> Vec<PrinterDescriptor> {
    let mut seen = HashSet::new();
    scan.devices()
        .filter_map(|device| {
            let address = non_empty(device.address.as_deref())?;
            if !seen.insert(address.to_ascii_lowercase()) {
                return None;
            }
            let target = format!("{BLUETOOTH_TARGET_PREFIX}{address}");
            let mut printer = PrinterDescriptor::new(
                non_empty(device.name.as_deref()).unwrap_or_else(|| address.clone()),
                target,
            )
            .with_mac_address(address.clone())
            .with_endpoint(PrinterEndpoint::Bluetooth {
                address: address.clone(),
            });
            printer.bluetooth_address = Some(address);
            printer.device_type = Some(BLUETOOTH_DEVICE_TYPE.into());
            Some(printer)
        })
        .collect()
}
