// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillroll — Native capability bridge.
//
// The printer SDK, the Bluetooth manager, and network discovery are opaque
// collaborators. This crate defines the traits the rest of Tillroll talks to
// and selects exactly one implementation per build.

use std::sync::Arc;

pub mod desktop;
pub mod mdns;
pub mod raw_tcp;
pub mod traits;

pub use traits::*;

/// Return the bridge implementation for the target operating system.
///
/// Desktop and CI builds get [`desktop::DesktopBridge`]: mDNS network
/// discovery and raw TCP printing, no Bluetooth radio.
pub fn platform_bridge() -> Arc<dyn PlatformBridge> {
    Arc::new(desktop::DesktopBridge::new())
}
