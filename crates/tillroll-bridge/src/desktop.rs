// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop bridge: mDNS network discovery, raw TCP printing to network
// printers, no Bluetooth radio.
//
// Used for desktop development and CI. Everything that needs a Bluetooth
// stack returns `PlatformUnavailable`.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use tillroll_core::error::{Result, TillrollError};
use tillroll_core::types::{PrinterDescriptor, PrinterEndpoint};

use crate::mdns::MdnsBrowser;
use crate::raw_tcp::RawTcpConnection;
use crate::traits::*;

pub struct DesktopBridge {
    mdns: Option<MdnsBrowser>,
}

impl DesktopBridge {
    pub fn new() -> Self {
        let mdns = match MdnsBrowser::new() {
            Ok(browser) => Some(browser),
            Err(e) => {
                warn!(error = %e, "mDNS unavailable, network discovery disabled");
                None
            }
        };
        Self { mdns }
    }
}

impl Default for DesktopBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for DesktopBridge {
    fn platform_name(&self) -> &str {
        "desktop"
    }
}

#[async_trait]
impl NativeDiscovery for DesktopBridge {
    async fn discover(
        &self,
        options: DiscoveryOptions,
        sink: UnboundedSender<RawDeviceRecord>,
    ) -> Result<()> {
        if options.filter == DiscoveryFilter::Bluetooth {
            return Err(TillrollError::PlatformUnavailable);
        }
        match &self.mdns {
            Some(browser) => browser.browse(options.timeout, sink).await,
            None => {
                warn!("network discovery called on desktop without mDNS");
                Err(TillrollError::PlatformUnavailable)
            }
        }
    }
}

#[async_trait]
impl NativeBluetooth for DesktopBridge {
    async fn is_enabled(&self) -> Result<bool> {
        Ok(false)
    }

    async fn enable(&self) -> Result<()> {
        warn!("Bluetooth enable called on desktop");
        Err(TillrollError::PlatformUnavailable)
    }

    async fn scan(&self) -> Result<BluetoothScan> {
        warn!("Bluetooth scan called on desktop");
        Err(TillrollError::PlatformUnavailable)
    }

    async fn connect(&self, _address: &str) -> Result<()> {
        Err(TillrollError::PlatformUnavailable)
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

impl NativePrinter for DesktopBridge {
    fn open(&self, printer: &PrinterDescriptor) -> Result<Box<dyn PrinterConnection>> {
        match &printer.endpoint {
            PrinterEndpoint::Network { address } => Ok(Box::new(RawTcpConnection::new(address))),
            PrinterEndpoint::Bluetooth { .. } => {
                warn!(printer = %printer.target, "Bluetooth printing called on desktop");
                Err(TillrollError::PlatformUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bluetooth_printer_cannot_be_opened() {
        let bridge = DesktopBridge { mdns: None };
        let printer = PrinterDescriptor::new("TM-m30", "BT:00:11:22:33:44:55");
        assert!(matches!(bridge.open(&printer), Err(TillrollError::PlatformUnavailable)));
    }

    #[test]
    fn network_printer_opens_unconnected() {
        let bridge = DesktopBridge { mdns: None };
        let printer = PrinterDescriptor::new("Kitchen", "192.168.1.50");
        assert!(bridge.open(&printer).is_ok());
    }

    #[tokio::test]
    async fn discovery_without_mdns_is_unavailable() {
        let bridge = DesktopBridge { mdns: None };
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let options = DiscoveryOptions {
            timeout: std::time::Duration::from_millis(10),
            filter: DiscoveryFilter::Network,
        };
        let result = bridge.discover(options, tx).await;
        assert!(matches!(result, Err(TillrollError::PlatformUnavailable)));
    }
}
