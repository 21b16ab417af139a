// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS browsing for raw-socket receipt printers on the local network.
//
// Network ESC/POS printers advertise `_pdl-datastream._tcp.local.` (port 9100).
// Each resolved service becomes a `RawDeviceRecord` pushed straight into the
// caller's sink, so results found before the window closes are never lost.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use tillroll_core::error::{Result, TillrollError};
use tillroll_core::types::ConnectionKind;

use crate::traits::RawDeviceRecord;

/// mDNS service type for raw (port 9100) printers.
pub const RAW_PRINTER_SERVICE: &str = "_pdl-datastream._tcp.local.";

/// Browses the local network for receipt printers.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
}

impl MdnsBrowser {
    /// Start the mDNS daemon thread. Browsing only happens in [`browse`].
    ///
    /// [`browse`]: MdnsBrowser::browse
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| TillrollError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
        Ok(Self { daemon })
    }

    /// Browse for `window`, forwarding each resolved printer to `sink`.
    #[instrument(skip(self, sink))]
    pub async fn browse(
        &self,
        window: Duration,
        sink: UnboundedSender<RawDeviceRecord>,
    ) -> Result<()> {
        let receiver = self
            .daemon
            .browse(RAW_PRINTER_SERVICE)
            .map_err(|e| TillrollError::Discovery(format!("browse {RAW_PRINTER_SERVICE}: {e}")))?;
        info!(
            service = RAW_PRINTER_SERVICE,
            window_ms = window.as_millis() as u64,
            "mDNS browse started"
        );

        // The receiver is a blocking channel; drain it off the async runtime.
        let drained = tokio::task::spawn_blocking(move || drain_events(receiver, window, sink))
            .await
            .map_err(|e| TillrollError::Bridge(format!("mDNS listener task failed: {e}")));

        if let Err(e) = self.daemon.stop_browse(RAW_PRINTER_SERVICE) {
            warn!(error = %e, "failed to stop mDNS browse");
        }

        let resolved = drained?;
        info!(resolved, "mDNS browse finished");
        Ok(())
    }
}

/// Forward resolved services until the window closes, the search stops, or
/// the receiving side goes away. Returns how many records were forwarded.
fn drain_events(
    receiver: mdns_sd::Receiver<ServiceEvent>,
    window: Duration,
    sink: UnboundedSender<RawDeviceRecord>,
) -> usize {
    let deadline = Instant::now() + window;
    let mut forwarded = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match receiver.recv_timeout(remaining) {
            Ok(ServiceEvent::ServiceResolved(info)) => match service_info_to_record(&info) {
                Some(record) => {
                    debug!(name = ?record.name, ip = ?record.ip_address, "printer resolved");
                    if sink.send(record).is_err() {
                        break;
                    }
                    forwarded += 1;
                }
                None => {
                    warn!(fullname = %info.get_fullname(), "resolved service has no address");
                }
            },
            Ok(ServiceEvent::SearchStopped(stype)) => {
                debug!(service_type = %stype, "mDNS search stopped");
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    forwarded
}

/// Convert a resolved service into a raw device record.
///
/// TXT keys read (case-insensitive): `ty` (make and model), `product`, `mac`.
fn service_info_to_record(info: &ServiceInfo) -> Option<RawDeviceRecord> {
    // Prefer IPv4 for wider printer compatibility.
    let ip: IpAddr = info
        .get_addresses()
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| info.get_addresses().iter().next())
        .copied()?;

    let name = info
        .get_property_val_str("ty")
        .or_else(|| info.get_property_val_str("product"))
        .map(|v| v.trim_matches(|c| c == '(' || c == ')').to_owned())
        .unwrap_or_else(|| instance_name(info.get_fullname()).to_owned());

    Some(RawDeviceRecord {
        name: Some(name),
        target: Some(ip.to_string()),
        mac_address: info.get_property_val_str("mac").map(String::from),
        bluetooth_address: None,
        ip_address: Some(ip.to_string()),
        connection_hint: Some(ConnectionKind::Network),
        device_type: Some("NETWORK_PRINTER".into()),
    })
}

/// `"Kitchen TM-T88._pdl-datastream._tcp.local."` -> `"Kitchen TM-T88"`.
fn instance_name(fullname: &str) -> &str {
    fullname
        .strip_suffix(RAW_PRINTER_SERVICE)
        .map(|n| n.trim_end_matches('.'))
        .filter(|n| !n.is_empty())
        .unwrap_or(fullname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_name_strips_service_suffix() {
        assert_eq!(
            instance_name("Kitchen TM-T88._pdl-datastream._tcp.local."),
            "Kitchen TM-T88"
        );
        assert_eq!(instance_name("odd-name"), "odd-name");
    }
}
