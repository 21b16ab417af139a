// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillroll Print — printer registry, discovery coordination, receipt layout,
// and connect-and-print sessions. Everything device-specific goes through the
// capability traits in `tillroll-bridge`.

pub mod discovery;
pub mod layout;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod fakes;

pub use discovery::{DiscoveryCoordinator, DiscoverySnapshot};
pub use layout::ReceiptLayout;
pub use registry::{PrinterRegistry, merge};
pub use session::{PrintOptions, PrintSession, SessionSnapshot};
