// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for printer discovery and receipt printing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::human_errors::HumanError;

/// Target prefix used by the printer SDKs for Bluetooth devices (`BT:<mac>`).
pub const BLUETOOTH_TARGET_PREFIX: &str = "BT:";

/// Unique identifier for one discovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one connect-and-print session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a printer is physically reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Bluetooth,
    Network,
}

impl ConnectionKind {
    /// Derive the connection kind from a target string alone.
    pub fn from_target(target: &str) -> Self {
        if has_bluetooth_prefix(target) {
            Self::Bluetooth
        } else {
            Self::Network
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Network => "network",
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `target` carries the `bt:` prefix (case-insensitive).
pub fn has_bluetooth_prefix(target: &str) -> bool {
    target
        .trim_start()
        .get(..BLUETOOTH_TARGET_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(BLUETOOTH_TARGET_PREFIX))
}

/// Strip a leading `bt:` prefix, if present.
pub fn strip_bluetooth_prefix(target: &str) -> &str {
    let trimmed = target.trim();
    if has_bluetooth_prefix(trimmed) {
        &trimmed[BLUETOOTH_TARGET_PREFIX.len()..]
    } else {
        trimmed
    }
}

/// Trim a string and turn it into `None` when nothing is left.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Resolved connection endpoint of a printer.
///
/// Built once when a descriptor is ingested (from a scan or from a test
/// preset) so that callers never have to re-parse the target string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrinterEndpoint {
    Bluetooth { address: String },
    Network { address: String },
}

impl PrinterEndpoint {
    /// Resolve an endpoint from a target plus optional hints.
    ///
    /// An explicit `hint` wins. Otherwise a `bt:` prefix or a Bluetooth
    /// device address means Bluetooth, and anything else is a network target.
    pub fn resolve(
        target: &str,
        hint: Option<ConnectionKind>,
        bluetooth_address: Option<&str>,
    ) -> Self {
        let bluetooth_address = non_empty(bluetooth_address);
        let kind = hint.unwrap_or(if has_bluetooth_prefix(target) || bluetooth_address.is_some() {
            ConnectionKind::Bluetooth
        } else {
            ConnectionKind::Network
        });

        match kind {
            ConnectionKind::Bluetooth => Self::Bluetooth {
                address: bluetooth_address
                    .unwrap_or_else(|| strip_bluetooth_prefix(target).to_owned()),
            },
            ConnectionKind::Network => Self::Network {
                address: target.trim().to_owned(),
            },
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        match self {
            Self::Bluetooth { .. } => ConnectionKind::Bluetooth,
            Self::Network { .. } => ConnectionKind::Network,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::Bluetooth { address } | Self::Network { address } => address,
        }
    }
}

/// One addressable printer, either discovered or pre-configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDescriptor {
    /// Name shown in printer lists.
    pub display_name: String,
    /// Opaque address handed to the printer SDK (e.g. `BT:AA:BB:..`, `192.168.1.50`).
    pub target: String,
    pub mac_address: Option<String>,
    pub bluetooth_address: Option<String>,
    pub ip_address: Option<String>,
    pub endpoint: PrinterEndpoint,
    /// Vendor device-type string, e.g. `BLUETOOTH_PRINTER`.
    pub device_type: Option<String>,
    /// Pairing credential.
    pub pin: Option<String>,
    pub notes: Option<String>,
    /// True for manually configured test profiles.
    pub is_synthetic: bool,
}

impl PrinterDescriptor {
    /// Create a discovered descriptor, deriving the endpoint from the target.
    pub fn new(display_name: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into().trim().to_owned();
        let endpoint = PrinterEndpoint::resolve(&target, None, None);
        Self {
            display_name: display_name.into(),
            target,
            mac_address: None,
            bluetooth_address: None,
            ip_address: None,
            endpoint,
            device_type: None,
            pin: None,
            notes: None,
            is_synthetic: false,
        }
    }

    pub fn with_mac_address(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = Some(mac.into());
        self
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: PrinterEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Mark this descriptor as a pre-configured test profile.
    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }

    pub fn connection_kind(&self) -> ConnectionKind {
        self.endpoint.kind()
    }
}

/// Which transports a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    #[default]
    All,
    Network,
    Bluetooth,
}

impl DiscoveryMode {
    pub fn includes_network(&self) -> bool {
        matches!(self, Self::All | Self::Network)
    }

    pub fn includes_bluetooth(&self) -> bool {
        matches!(self, Self::All | Self::Bluetooth)
    }
}

impl FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "network" | "net" | "tcp" => Ok(Self::Network),
            "bluetooth" | "bt" => Ok(Self::Bluetooth),
            other => Err(format!(
                "unknown discovery mode '{other}' (expected all, network, bluetooth)"
            )),
        }
    }
}

impl std::fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Network => "network",
            Self::Bluetooth => "bluetooth",
        })
    }
}

/// Lifecycle of one discovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Idle,
    Scanning,
    Completed,
    Failed,
}

/// Transient state of the most recent discovery scan.
#[derive(Debug, Clone)]
pub struct DiscoverySession {
    pub id: ScanId,
    pub mode: DiscoveryMode,
    pub status: ScanStatus,
    /// Descriptors produced by this scan, in result order.
    pub results: Vec<PrinterDescriptor>,
    pub error: Option<HumanError>,
    /// The scan window elapsed before the capability finished.
    pub timed_out: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DiscoverySession {
    /// An idle placeholder used before the first scan.
    pub fn idle() -> Self {
        Self {
            id: ScanId::new(),
            mode: DiscoveryMode::default(),
            status: ScanStatus::Idle,
            results: Vec::new(),
            error: None,
            timed_out: false,
            started_at: None,
            finished_at: None,
        }
    }

    /// A freshly started scan.
    pub fn started(mode: DiscoveryMode) -> Self {
        Self {
            id: ScanId::new(),
            mode,
            status: ScanStatus::Scanning,
            results: Vec::new(),
            error: None,
            timed_out: false,
            started_at: Some(Utc::now()),
            finished_at: None,
        }
    }
}

/// States of a connect-and-print session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Printing,
    Disconnecting,
    Failed,
}

impl SessionState {
    /// Whether an attempt is currently in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle | Self::Failed)
    }

    /// Legal transitions of the session state machine.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle | Failed, Connecting)
                | (Connecting, Connected)
                | (Connected, Printing)
                | (Printing, Disconnecting)
                | (Disconnecting, Idle)
                | (Connecting | Connected | Printing, Failed)
        )
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// One queued formatting/print primitive.
///
/// The printer capability translates these into device commands; the order
/// in which they are queued is the order they hit the paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintCommand {
    Align(Alignment),
    TextSmoothing(bool),
    TextSize { width: u8, height: u8 },
    TextStyle { emphasis: bool },
    Text(String),
    FeedLines(u8),
    Cut,
}
