// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use clap::{Parser, Subcommand, ValueEnum};

use tillroll_core::LineItem;
use tillroll_core::types::DiscoveryMode;

#[derive(Debug, Parser)]
#[command(name = "tillroll")]
#[command(about = "Find thermal receipt printers and print receipts on them.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List configured test printers
    Printers,
    /// Scan for printers and list the merged result
    Scan {
        #[arg(long, value_enum, default_value_t = Mode::All)]
        mode: Mode,
    },
    /// Print a receipt on a printer
    Print {
        /// Printer target, e.g. `BT:DC:1D:30:EC:91:40` or `192.168.1.50`
        #[arg(long)]
        target: String,
        /// Receipt title (defaults to the configured store name)
        #[arg(long)]
        title: Option<String>,
        /// Line item as NAME:PRICE[:QTY]; repeatable
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<LineItem>,
        /// Print the diagnostic page before the receipt
        #[arg(long)]
        test_print: bool,
        /// Scan before printing so discovered details are used
        #[arg(long, value_enum)]
        scan: Option<Mode>,
    },
    /// Print only the diagnostic page
    TestPage {
        #[arg(long)]
        target: String,
    },
    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Account session
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,
    /// Print the config file location
    Path,
    /// Add a hand-entered printer profile
    AddPrinter {
        #[arg(long)]
        label: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        pin: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Set the account API base URL
    SetApi { url: String },
}

#[derive(Debug, Subcommand)]
pub enum AccountAction {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TILLROLL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TILLROLL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the signed-in user
    Whoami,
    Logout,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    All,
    Network,
    Bluetooth,
}

impl From<Mode> for DiscoveryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::All => DiscoveryMode::All,
            Mode::Network => DiscoveryMode::Network,
            Mode::Bluetooth => DiscoveryMode::Bluetooth,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// `NAME:PRICE[:QTY]`. The name may itself contain colons when a quantity
/// is given.
fn parse_item(raw: &str) -> Result<LineItem, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (name, price, quantity) = match parts.as_slice() {
        [name, price] => ((*name).to_owned(), *price, ""),
        [name @ .., price, quantity] => (name.join(":"), *price, *quantity),
        _ => return Err(format!("expected NAME:PRICE[:QTY], got '{raw}'")),
    };
    LineItem::parse(&name, price, quantity).map_err(|e| e.to_string())
}
