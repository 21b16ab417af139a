// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text rendering of printer lists, scan outcomes, and errors.

use std::fmt::Write;

use tillroll_core::human_errors::HumanError;
use tillroll_core::types::{PrinterDescriptor, ScanStatus};
use tillroll_print::DiscoverySnapshot;

/// One row per printer: name, target, connection, and a `test` marker for
/// configured profiles.
pub fn printer_table(printers: &[PrinterDescriptor]) -> String {
    if printers.is_empty() {
        return "No printers.\n".into();
    }
    let width = printers
        .iter()
        .map(|p| p.display_name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for printer in printers {
        let marker = if printer.is_synthetic { "  test" } else { "" };
        let _ = writeln!(
            out,
            "{:<width$}  {:<24}  {:<9}{}",
            printer.display_name,
            printer.target,
            printer.connection_kind().as_str(),
            marker,
        );
    }
    out
}

pub fn scan_report(snapshot: &DiscoverySnapshot) -> String {
    let session = &snapshot.session;
    let mut out = match session.status {
        ScanStatus::Completed if session.timed_out => format!(
            "Scan ({}) finished at the time limit: {} found.\n",
            session.mode,
            session.results.len()
        ),
        ScanStatus::Completed => format!(
            "Scan ({}) complete: {} found.\n",
            session.mode,
            session.results.len()
        ),
        ScanStatus::Failed => format!("Scan ({}) failed.\n", session.mode),
        ScanStatus::Idle | ScanStatus::Scanning => {
            format!("Scan ({}) not finished.\n", session.mode)
        }
    };
    if let Some(error) = &session.error {
        out.push_str(&error_report(error));
    }
    out.push('\n');
    out.push_str(&printer_table(&snapshot.printers));
    out
}

pub fn error_report(error: &HumanError) -> String {
    let mut out = format!("{}\n{}\n", error.message, error.suggestion);
    if let Some(diagnostic) = &error.diagnostic {
        let _ = writeln!(out, "({diagnostic})");
    }
    out
}
