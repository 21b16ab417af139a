// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{
    ConnectionKind, PrinterDescriptor, PrinterEndpoint, has_bluetooth_prefix, non_empty,
};

/// Persistent application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub discovery: DiscoveryConfig,
    pub receipt: ReceiptConfig,
    /// Manually configured printers shown above scan results.
    pub test_printers: Vec<TestPrinterPreset>,
    /// Base URL of the account API (e.g. `https://api.example.com`).
    pub api_base_url: Option<String>,
}

impl AppConfig {
    /// Turn the configured presets into synthetic printer descriptors.
    /// Presets without a usable target are skipped.
    pub fn synthetic_printers(&self) -> Vec<PrinterDescriptor> {
        self.test_printers
            .iter()
            .filter_map(TestPrinterPreset::to_descriptor)
            .collect()
    }
}

/// Scan windows and radio behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Network discovery window in milliseconds.
    pub network_timeout_ms: u64,
    /// Bluetooth scan window in milliseconds. Longer than the network window
    /// because classic Bluetooth inquiry is slow.
    pub bluetooth_timeout_ms: u64,
    /// Ask the OS to switch Bluetooth on when a scan finds it disabled.
    pub request_bluetooth_enable: bool,
}

impl DiscoveryConfig {
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn bluetooth_timeout(&self) -> Duration {
        Duration::from_millis(self.bluetooth_timeout_ms)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            network_timeout_ms: 5_000,
            bluetooth_timeout_ms: 12_000,
            request_bluetooth_enable: true,
        }
    }
}

/// Receipt layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Characters per line at normal text size (48 for 80 mm paper, 32 for 58 mm).
    pub paper_columns: usize,
    pub currency_symbol: String,
    pub default_title: String,
    pub header_lines: Vec<String>,
    pub footer_lines: Vec<String>,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            paper_columns: 48,
            currency_symbol: "$".into(),
            default_title: "My Store".into(),
            header_lines: Vec::new(),
            footer_lines: vec!["Thank you!".into()],
        }
    }
}

/// A hand-entered printer profile, typically copied from the printer's
/// self-test slip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPrinterPreset {
    pub label: String,
    pub target: String,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub bluetooth_address: Option<String>,
    pub pin: Option<String>,
    pub notes: Option<String>,
    pub connection: Option<ConnectionKind>,
}

impl TestPrinterPreset {
    /// Build the synthetic descriptor for this preset.
    ///
    /// All values are trimmed; an empty target yields `None`, an empty label
    /// falls back to the target, and the connection kind is derived from a
    /// `bt:` prefix when not given.
    pub fn to_descriptor(&self) -> Option<PrinterDescriptor> {
        let target = self.target.trim();
        if target.is_empty() {
            return None;
        }

        let connection = self.connection.unwrap_or(if has_bluetooth_prefix(target) {
            ConnectionKind::Bluetooth
        } else {
            ConnectionKind::Network
        });
        let bluetooth_address = non_empty(self.bluetooth_address.as_deref());
        let endpoint =
            PrinterEndpoint::resolve(target, Some(connection), bluetooth_address.as_deref());

        let label = self.label.trim();
        Some(PrinterDescriptor {
            display_name: if label.is_empty() { target.to_owned() } else { label.to_owned() },
            target: target.to_owned(),
            mac_address: non_empty(self.mac_address.as_deref()),
            bluetooth_address,
            ip_address: non_empty(self.ip_address.as_deref()),
            endpoint,
            device_type: match connection {
                ConnectionKind::Bluetooth => Some("BLUETOOTH_PRINTER".into()),
                ConnectionKind::Network => None,
            },
            pin: non_empty(self.pin.as_deref()),
            notes: non_empty(self.notes.as_deref()),
            is_synthetic: true,
        })
    }
}
