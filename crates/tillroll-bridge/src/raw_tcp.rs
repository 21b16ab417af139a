// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP printer connection (JetDirect, port 9100).
//
// Queued commands are encoded as ESC/POS into a local buffer and written to
// the socket in one go on `send_data`. The port gives no feedback, so
// `status` always reports `None`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use tillroll_core::error::{Result, TillrollError};
use tillroll_core::types::{Alignment, PrintCommand};

use crate::traits::{PrinterConnection, PrinterStatus};

/// Default raw TCP port (HP JetDirect).
pub const RAW_PORT: u16 = 9100;

/// Timeout for connecting and for writing one job.
const RAW_TIMEOUT: Duration = Duration::from_secs(10);

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Epson "WPC1252" code table, matching the encoder used for text.
const CODE_TABLE_WPC1252: u8 = 16;

pub struct RawTcpConnection {
    addr: String,
    timeout: Duration,
    stream: Option<TcpStream>,
    buf: Vec<u8>,
}

impl RawTcpConnection {
    /// `address` is an IP or host name, optionally with a `TCP:` prefix or
    /// an explicit port.
    pub fn new(address: &str) -> Self {
        Self {
            addr: socket_address(address),
            timeout: RAW_TIMEOUT,
            stream: None,
            buf: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PrinterConnection for RawTcpConnection {
    async fn connect(&mut self) -> Result<()> {
        info!(addr = %self.addr, "connecting via raw TCP");
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                TillrollError::ConnectionFailed(format!(
                    "raw TCP connection to {} timed out after {:?}",
                    self.addr, self.timeout
                ))
            })?
            .map_err(|e| {
                TillrollError::ConnectionFailed(format!("raw TCP connect to {}: {e}", self.addr))
            })?;
        self.stream = Some(stream);
        self.buf.clear();
        init_printer(&mut self.buf);
        Ok(())
    }

    async fn status(&mut self) -> Result<Option<PrinterStatus>> {
        Ok(None)
    }

    async fn queue(&mut self, command: &PrintCommand) -> Result<()> {
        encode(command, &mut self.buf);
        Ok(())
    }

    async fn send_data(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TillrollError::PrintFailed("raw TCP socket not connected".into()))?;

        let buf = &self.buf;
        let write = async {
            stream.write_all(buf).await?;
            stream.flush().await
        };
        match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(TillrollError::PrintFailed(format!("raw TCP send: {e}"))),
            Err(_) => {
                return Err(TillrollError::PrintFailed(format!(
                    "raw TCP send to {} timed out",
                    self.addr
                )));
            }
        }

        info!(addr = %self.addr, total = self.buf.len(), "raw TCP job sent");
        self.buf.clear();
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.buf.clear();
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .map_err(|e| TillrollError::Bridge(format!("raw TCP shutdown: {e}")))?;
            debug!(addr = %self.addr, "raw TCP socket closed");
        }
        Ok(())
    }
}

/// `host:port`, defaulting to [`RAW_PORT`].
fn socket_address(address: &str) -> String {
    let address = address.trim();
    let host = match address.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("tcp:") => &address[4..],
        _ => address,
    };
    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(name, port)| !name.contains(':') && port.parse::<u16>().is_ok());
    if has_port {
        host.to_owned()
    } else if host.contains(':') {
        format!("[{host}]:{RAW_PORT}")
    } else {
        format!("{host}:{RAW_PORT}")
    }
}

/// ESC @ then select the code table the text encoder targets.
fn init_printer(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&[ESC, b'@', ESC, b't', CODE_TABLE_WPC1252]);
}

/// Append the ESC/POS bytes for one command.
pub fn encode(command: &PrintCommand, buf: &mut Vec<u8>) {
    match command {
        PrintCommand::Align(alignment) => {
            let n = match alignment {
                Alignment::Left => 0,
                Alignment::Center => 1,
                Alignment::Right => 2,
            };
            buf.extend_from_slice(&[ESC, b'a', n]);
        }
        PrintCommand::TextSmoothing(on) => buf.extend_from_slice(&[GS, b'b', u8::from(*on)]),
        PrintCommand::TextSize { width, height } => {
            let w = (*width).clamp(1, 8) - 1;
            let h = (*height).clamp(1, 8) - 1;
            buf.extend_from_slice(&[GS, b'!', (w << 4) | h]);
        }
        PrintCommand::TextStyle { emphasis } => {
            buf.extend_from_slice(&[ESC, b'E', u8::from(*emphasis)]);
        }
        PrintCommand::Text(text) => {
            let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
            buf.extend_from_slice(&bytes);
        }
        PrintCommand::FeedLines(lines) => buf.extend_from_slice(&[ESC, b'd', *lines]),
        PrintCommand::Cut => buf.extend_from_slice(&[GS, b'V', 0]),
    }
}
