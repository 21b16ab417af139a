// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillroll — thermal receipt printing from the command line.
//
// Entry point. Initialises logging and backend services, then runs one
// command.

mod cli;
mod report;
mod services;

use std::process::ExitCode;

use tillroll_core::config::TestPrinterPreset;
use tillroll_core::error::{Result, TillrollError};
use tillroll_core::human_errors::humanize_error;
use tillroll_core::types::DiscoveryMode;
use tillroll_print::PrintOptions;

use cli::{AccountAction, Commands, CommandLine, ConfigAction};
use services::app_services::AppServices;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = CommandLine::parse_args();
    let services = AppServices::init();

    match run(&services, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprint!("{}", report::error_report(&humanize_error(&e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(services: &AppServices, command: Commands) -> Result<()> {
    match command {
        Commands::Printers => {
            print!("{}", report::printer_table(&services.coordinator().printers()));
        }

        Commands::Scan { mode } => {
            let snapshot = services.coordinator().scan(mode.into()).await;
            print!("{}", report::scan_report(&snapshot));
        }

        Commands::Print {
            target,
            title,
            items,
            test_print,
            scan,
        } => {
            if let Some(mode) = scan {
                scan_quietly(services, mode.into()).await;
            }
            let mut receipt = services.draft_receipt(title.as_deref());
            for item in items {
                receipt.add_item(item);
            }
            if receipt.items.is_empty() {
                return Err(TillrollError::InvalidReceipt("add at least one --item".into()));
            }

            let total = receipt.formatted_total()?;

            let mut session = services.print_session(&target)?;
            session
                .print_receipt(&receipt, PrintOptions { test_print })
                .await?;
            println!("Printed on {} (total {total}).", session.printer().display_name);
        }

        Commands::TestPage { target } => {
            let mut session = services.print_session(&target)?;
            session.print_test_page().await?;
            println!("Test page printed on {}.", session.printer().display_name);
        }

        Commands::Config { action } => config(services, action)?,

        Commands::Account { action } => account(services, action).await?,
    }
    Ok(())
}

/// Scan so the registry holds discovered details; a failed scan is not
/// fatal because the target may still be printable as given.
async fn scan_quietly(services: &AppServices, mode: DiscoveryMode) {
    let snapshot = services.coordinator().scan(mode).await;
    if let Some(error) = snapshot.session.error {
        tracing::info!(%mode, error = %error, "scan before print did not succeed");
    }
}

fn config(services: &AppServices, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&services.config())?);
        }
        ConfigAction::Path => {
            println!("{}", services.config_path().display());
        }
        ConfigAction::AddPrinter {
            label,
            target,
            pin,
            notes,
        } => {
            let preset = TestPrinterPreset {
                label,
                target,
                pin,
                notes,
                ..Default::default()
            };
            let printer = preset.to_descriptor().ok_or(TillrollError::NoPrinterSelected)?;
            let mut config = services.config();
            config.test_printers.push(preset);
            services.save_config(&config)?;
            println!("Added {} ({}).", printer.display_name, printer.target);
        }
        ConfigAction::SetApi { url } => {
            let mut config = services.config();
            config.api_base_url = Some(url.trim().to_owned());
            services.save_config(&config)?;
        }
    }
    Ok(())
}

async fn account(services: &AppServices, action: AccountAction) -> Result<()> {
    match action {
        AccountAction::Logout => {
            services.tokens().sign_out();
            println!("Signed out.");
            return Ok(());
        }
        AccountAction::Whoami if !services.tokens().is_signed_in() => {
            println!("Not signed in.");
            return Ok(());
        }
        _ => {}
    }

    let client = services.api_client()?;
    let body = match action {
        AccountAction::Login { email, password } => client.login(&email, &password).await?,
        AccountAction::Register {
            name,
            email,
            password,
        } => client.register(&name, &email, &password).await?,
        AccountAction::Whoami | AccountAction::Logout => client.get_user().await?,
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
