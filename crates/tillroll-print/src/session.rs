// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connect-and-print session for one selected printer.
//
// idle -> connecting -> connected -> printing -> disconnecting -> idle, with
// `failed` reachable from connecting, connected and printing. Whenever a
// printer handle was opened it is disconnected exactly once, on every path.
// There is no cancellation: an attempt runs until the capability resolves.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use tillroll_bridge::traits::{PlatformBridge, PrinterConnection};
use tillroll_core::error::{Result, TillrollError};
use tillroll_core::human_errors::{HumanError, humanize_error};
use tillroll_core::receipt::Receipt;
use tillroll_core::types::{PrintCommand, PrinterDescriptor, SessionId, SessionState};

use crate::layout::ReceiptLayout;

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub last_error: Option<HumanError>,
}

/// Per-attempt options.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOptions {
    /// Print the diagnostic page before the receipt.
    pub test_print: bool,
}

pub struct PrintSession {
    id: SessionId,
    printer: PrinterDescriptor,
    bridge: Arc<dyn PlatformBridge>,
    layout: ReceiptLayout,
    command_queue: Vec<PrintCommand>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl PrintSession {
    pub fn new(
        bridge: Arc<dyn PlatformBridge>,
        printer: PrinterDescriptor,
        layout: ReceiptLayout,
    ) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot {
            state: SessionState::Idle,
            last_error: None,
        });
        Self {
            id: SessionId::new(),
            printer,
            bridge,
            layout,
            command_queue: Vec::new(),
            snapshot,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn printer(&self) -> &PrinterDescriptor {
        &self.printer
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn last_error(&self) -> Option<HumanError> {
        self.snapshot.borrow().last_error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Commands of the most recent attempt, in queue order.
    pub fn command_queue(&self) -> &[PrintCommand] {
        &self.command_queue
    }

    /// Connect, optionally print the diagnostic page, print `receipt`, and
    /// disconnect.
    pub async fn print_receipt(&mut self, receipt: &Receipt, options: PrintOptions) -> Result<()> {
        let receipt_commands = self.layout.render(receipt)?;
        let mut commands = Vec::new();
        if options.test_print {
            commands.extend(self.layout.diagnostic_page(&self.printer, Local::now().naive_local()));
        }
        commands.extend(receipt_commands);
        self.run(commands).await
    }

    /// Connect, print only the diagnostic page, and disconnect.
    pub async fn print_test_page(&mut self) -> Result<()> {
        let commands = self.layout.diagnostic_page(&self.printer, Local::now().naive_local());
        self.run(commands).await
    }

    async fn run(&mut self, commands: Vec<PrintCommand>) -> Result<()> {
        self.command_queue = commands;
        info!(
            session_id = %self.id,
            printer = %self.printer.target,
            connection = %self.printer.connection_kind(),
            commands = self.command_queue.len(),
            "print session started"
        );
        self.publish(SessionState::Connecting, None);

        let mut handle = match self.bridge.open(&self.printer) {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(connection_error(e))),
        };

        match self.drive(handle.as_mut()).await {
            Ok(()) => {
                self.publish(SessionState::Disconnecting, None);
                if let Err(e) = handle.disconnect().await {
                    warn!(session_id = %self.id, error = %e, "disconnect after print failed");
                }
                self.publish(SessionState::Idle, None);
                info!(session_id = %self.id, "receipt printed");
                Ok(())
            }
            Err(e) => {
                let err = self.fail(e);
                if let Err(e) = handle.disconnect().await {
                    warn!(session_id = %self.id, error = %e, "disconnect after failure failed");
                }
                Err(err)
            }
        }
    }

    /// connecting -> connected -> printing, up to and including `send_data`.
    async fn drive(&self, handle: &mut dyn PrinterConnection) -> Result<()> {
        handle.connect().await.map_err(connection_error)?;
        match handle.status().await.map_err(connection_error)? {
            Some(status) if !status.online => return Err(TillrollError::OfflineAfterConnect),
            Some(status) => debug!(paper_width_mm = ?status.paper_width_mm, "printer online"),
            None => debug!("printer does not report status"),
        }
        self.publish(SessionState::Connected, None);

        self.publish(SessionState::Printing, None);
        for command in &self.command_queue {
            handle.queue(command).await.map_err(print_error)?;
        }
        handle.send_data().await.map_err(print_error)
    }

    /// Move to `failed` and record the user-facing error. Returns `err`.
    fn fail(&self, err: TillrollError) -> TillrollError {
        warn!(session_id = %self.id, error = %err, "print session failed");
        self.publish(SessionState::Failed, Some(humanize_error(&err)));
        err
    }

    fn publish(&self, state: SessionState, last_error: Option<HumanError>) {
        self.snapshot.send_modify(|snapshot| {
            debug_assert!(
                snapshot.state == state || snapshot.state.can_transition_to(state),
                "illegal session transition {:?} -> {state:?}",
                snapshot.state
            );
            snapshot.state = state;
            snapshot.last_error = last_error;
        });
    }
}

fn connection_error(err: TillrollError) -> TillrollError {
    match err {
        e @ (TillrollError::ConnectionFailed(_) | TillrollError::OfflineAfterConnect) => e,
        other => TillrollError::ConnectionFailed(other.to_string()),
    }
}

fn print_error(err: TillrollError) -> TillrollError {
    match err {
        e @ TillrollError::PrintFailed(_) => e,
        other => TillrollError::PrintFailed(other.to_string()),
    }
}
