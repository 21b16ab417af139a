// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillroll — Core types, receipts, and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod receipt;
pub mod types;

pub use config::AppConfig;
pub use error::TillrollError;
pub use receipt::{LineItem, Receipt};
pub use types::*;
