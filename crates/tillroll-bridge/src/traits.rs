// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.
//
// All calls are async: the native SDKs resolve or reject later, and the
// calling flow suspends until they do. Traits are object safe (`async-trait`)
// so the selected implementation can live behind `Arc<dyn PlatformBridge>`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use tillroll_core::error::Result;
use tillroll_core::types::{ConnectionKind, PrintCommand, PrinterDescriptor};

/// Unified bridge that groups all native capabilities.
pub trait PlatformBridge: NativeDiscovery + NativeBluetooth + NativePrinter {
    /// Human-readable platform name (e.g. "iOS 17", "Android 14").
    fn platform_name(&self) -> &str;
}

/// Vendor printer discovery (network and, depending on the SDK, Bluetooth).
#[async_trait]
pub trait NativeDiscovery: Send + Sync {
    /// Run one discovery window, pushing each device into `sink` as it is
    /// found. Returns once the window is over or the SDK gives up.
    async fn discover(
        &self,
        options: DiscoveryOptions,
        sink: UnboundedSender<RawDeviceRecord>,
    ) -> Result<()>;
}

/// Classic Bluetooth manager.
#[async_trait]
pub trait NativeBluetooth: Send + Sync {
    async fn is_enabled(&self) -> Result<bool>;

    /// Ask the OS to turn Bluetooth on. Platforms that cannot do this
    /// programmatically return `PlatformUnavailable`.
    async fn enable(&self) -> Result<()>;

    /// Inquiry scan returning paired and newly found devices.
    async fn scan(&self) -> Result<BluetoothScan>;

    async fn connect(&self, address: &str) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}

/// Factory for printer SDK handles.
pub trait NativePrinter: Send + Sync {
    /// Create an unconnected handle for `printer`.
    fn open(&self, printer: &PrinterDescriptor) -> Result<Box<dyn PrinterConnection>>;
}

/// One printer SDK handle. Formatting calls are buffered by the SDK until
/// `send_data`.
#[async_trait]
pub trait PrinterConnection: Send {
    async fn connect(&mut self) -> Result<()>;

    /// Current device status, or `None` if the SDK cannot report it.
    async fn status(&mut self) -> Result<Option<PrinterStatus>>;

    async fn queue(&mut self, command: &PrintCommand) -> Result<()>;

    async fn send_data(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Info structs exchanged with the capabilities
// ---------------------------------------------------------------------------

/// Which transports a discovery call should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryFilter {
    All,
    Network,
    Bluetooth,
}

/// Options for [`NativeDiscovery::discover`].
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    /// How long the SDK should keep looking.
    pub timeout: Duration,
    pub filter: DiscoveryFilter,
}

/// A device as reported by a discovery SDK, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDeviceRecord {
    pub name: Option<String>,
    pub target: Option<String>,
    pub mac_address: Option<String>,
    pub bluetooth_address: Option<String>,
    pub ip_address: Option<String>,
    pub connection_hint: Option<ConnectionKind>,
    pub device_type: Option<String>,
}

/// A Bluetooth device from an inquiry scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BluetoothDevice {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Result of a Bluetooth inquiry scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BluetoothScan {
    pub paired: Vec<BluetoothDevice>,
    pub found: Vec<BluetoothDevice>,
}

impl BluetoothScan {
    /// Parse the JSON payload some native Bluetooth managers return.
    /// An unparsable payload is treated as an empty scan.
    pub fn from_json(payload: &str) -> Self {
        if payload.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(payload) {
            Ok(scan) => scan,
            Err(e) => {
                warn!(error = %e, "failed to parse Bluetooth scan result");
                Self::default()
            }
        }
    }

    /// Paired devices first, then newly found ones.
    pub fn devices(&self) -> impl Iterator<Item = &BluetoothDevice> {
        self.paired.iter().chain(self.found.iter())
    }
}

/// Printer status as reported after connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterStatus {
    pub online: bool,
    pub paper_width_mm: Option<u16>,
    pub firmware: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_json_lists_paired_first() {
        let scan = BluetoothScan::from_json(
            r#"{"found":[{"name":"Star TSP100","address":"AA:BB:CC:DD:EE:FF"}],
                "paired":[{"name":"Epson TM-T20III","address":"00:11:22:33:44:55"}]}"#,
        );
        let names: Vec<_> = scan.devices().filter_map(|d| d.name.as_deref()).collect();
        assert_eq!(names, ["Epson TM-T20III", "Star TSP100"]);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let scan = BluetoothScan::from_json(r#"{"paired":[{"address":"00:11:22:33:44:55"}]}"#);
        assert_eq!(scan.paired.len(), 1);
        assert!(scan.found.is_empty());
        assert!(scan.paired[0].name.is_none());
    }

    #[test]
    fn garbage_payload_is_an_empty_scan() {
        assert_eq!(BluetoothScan::from_json("not json"), BluetoothScan::default());
        assert_eq!(BluetoothScan::from_json(""), BluetoothScan::default());
    }
}
