// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer registry: merges scan results with pre-configured test printers.
//
// Entries are keyed by their target, compared case-insensitively. Synthetic
// entries are seeded first and own their identity: a matching scan result may
// only fill in connection fields they lack.

use std::collections::HashMap;

use tracing::debug;

use tillroll_core::types::{PrinterDescriptor, PrinterEndpoint, non_empty};

/// Merge `discovered` into `synthetic`, returning the combined list.
///
/// Pure: the result depends only on the two inputs. Order is synthetic
/// entries first, then previously unseen discovered entries in scan order.
pub fn merge(
    discovered: &[PrinterDescriptor],
    synthetic: &[PrinterDescriptor],
) -> Vec<PrinterDescriptor> {
    let mut merged: Vec<PrinterDescriptor> = Vec::with_capacity(synthetic.len() + discovered.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for printer in synthetic.iter().chain(discovered) {
        let Some(addressable) = addressable(printer) else {
            debug!(name = %printer.display_name, "dropping printer without a target");
            continue;
        };
        let key = identity_key(&addressable.target);

        match index.get(&key) {
            Some(&at) => fill_absent(&mut merged[at], &addressable),
            None => {
                index.insert(key, merged.len());
                merged.push(addressable);
            }
        }
    }
    merged
}

/// Case-insensitive identity of a target.
pub fn identity_key(target: &str) -> String {
    target.trim().to_ascii_lowercase()
}

/// Return the descriptor with a usable target, falling back to its IP
/// address. `None` if neither is present; a name alone is not addressable.
fn addressable(printer: &PrinterDescriptor) -> Option<PrinterDescriptor> {
    if !printer.target.trim().is_empty() {
        return Some(printer.clone());
    }
    let ip = non_empty(printer.ip_address.as_deref())?;
    let mut fixed = printer.clone();
    fixed.endpoint = PrinterEndpoint::resolve(
        &ip,
        Some(printer.connection_kind()),
        printer.bluetooth_address.as_deref(),
    );
    if fixed.display_name.trim().is_empty() {
        fixed.display_name = ip.clone();
    }
    fixed.target = ip;
    Some(fixed)
}

/// Copy connection fields from `incoming` that `existing` lacks. Identity,
/// endpoint, credentials and notes stay as they are.
fn fill_absent(existing: &mut PrinterDescriptor, incoming: &PrinterDescriptor) {
    if existing.mac_address.is_none() {
        existing.mac_address.clone_from(&incoming.mac_address);
    }
    if existing.ip_address.is_none() {
        existing.ip_address.clone_from(&incoming.ip_address);
    }
    if existing.bluetooth_address.is_none() {
        existing.bluetooth_address.clone_from(&incoming.bluetooth_address);
    }
}

/// Owns the synthetic printers and the latest merged view.
#[derive(Debug, Clone, Default)]
pub struct PrinterRegistry {
    synthetic: Vec<PrinterDescriptor>,
    printers: Vec<PrinterDescriptor>,
}

impl PrinterRegistry {
    pub fn new(synthetic: Vec<PrinterDescriptor>) -> Self {
        let printers = merge(&[], &synthetic);
        Self {
            synthetic,
            printers,
        }
    }

    /// Replace the merged view with `synthetic + discovered`. The last scan
    /// is authoritative for discovered entries.
    pub fn apply_scan(&mut self, discovered: &[PrinterDescriptor]) -> &[PrinterDescriptor] {
        self.printers = merge(discovered, &self.synthetic);
        &self.printers
    }

    pub fn printers(&self) -> &[PrinterDescriptor] {
        &self.printers
    }

    /// Look up a printer by target, ignoring case and surrounding spaces.
    pub fn find(&self, target: &str) -> Option<&PrinterDescriptor> {
        let key = identity_key(target);
        self.printers.iter().find(|p| identity_key(&p.target) == key)
    }
}
