// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scriptable in-memory bridge for coordinator and session tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use tillroll_bridge::traits::*;
use tillroll_core::error::{Result, TillrollError};
use tillroll_core::types::{PrintCommand, PrinterDescriptor};

/// How a scripted call should fail.
#[derive(Debug, Clone, Copy)]
pub enum Fail {
    Unavailable,
    Permission,
    Sdk(&'static str),
}

impl Fail {
    fn error(self) -> TillrollError {
        match self {
            Fail::Unavailable => TillrollError::PlatformUnavailable,
            Fail::Permission => TillrollError::PermissionDenied("BLUETOOTH_SCAN".into()),
            Fail::Sdk(msg) => TillrollError::Bridge(msg.into()),
        }
    }
}

/// One call observed on a printer handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Status,
    Queue(PrintCommand),
    SendData,
    Disconnect,
}

#[derive(Default)]
pub struct FakeBridge {
    // network discovery
    pub network: Vec<RawDeviceRecord>,
    pub network_fail: Option<Fail>,
    /// Keep the discovery call pending after sending records.
    pub network_hang: bool,
    pub network_delay: Duration,
    pub discover_calls: AtomicUsize,

    // bluetooth
    pub bluetooth_on: AtomicBool,
    pub enable_turns_on: bool,
    pub enable_fail: Option<Fail>,
    pub enable_calls: AtomicUsize,
    pub bluetooth: BluetoothScan,
    pub bluetooth_fail: Option<Fail>,
    pub bluetooth_delay: Duration,

    // printer
    pub printer: FakePrinter,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

/// Scripted printer handle behaviour.
#[derive(Debug, Clone, Default)]
pub struct FakePrinter {
    pub open_fail: Option<Fail>,
    pub connect_fail: Option<Fail>,
    /// `None` means the SDK does not report status.
    pub online: Option<bool>,
    /// Fail the queue call with this zero-based index.
    pub queue_fail_at: Option<usize>,
    pub send_fail: Option<Fail>,
    pub disconnect_fail: Option<Fail>,
}

impl FakeBridge {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

impl PlatformBridge for FakeBridge {
    fn platform_name(&self) -> &str {
        "fake"
    }
}

#[async_trait]
impl NativeDiscovery for FakeBridge {
    async fn discover(
        &self,
        _options: DiscoveryOptions,
        sink: UnboundedSender<RawDeviceRecord>,
    ) -> Result<()> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if !self.network_delay.is_zero() {
            tokio::time::sleep(self.network_delay).await;
        }
        if let Some(fail) = self.network_fail {
            return Err(fail.error());
        }
        for record in &self.network {
            let _ = sink.send(record.clone());
        }
        if self.network_hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl NativeBluetooth for FakeBridge {
    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.bluetooth_on.load(Ordering::SeqCst))
    }

    async fn enable(&self) -> Result<()> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fail) = self.enable_fail {
            return Err(fail.error());
        }
        if self.enable_turns_on {
            self.bluetooth_on.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn scan(&self) -> Result<BluetoothScan> {
        if !self.bluetooth_delay.is_zero() {
            tokio::time::sleep(self.bluetooth_delay).await;
        }
        match self.bluetooth_fail {
            Some(fail) => Err(fail.error()),
            None => Ok(self.bluetooth.clone()),
        }
    }

    async fn connect(&self, _address: &str) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

impl NativePrinter for FakeBridge {
    fn open(&self, _printer: &PrinterDescriptor) -> Result<Box<dyn PrinterConnection>> {
        if let Some(fail) = self.printer.open_fail {
            return Err(fail.error());
        }
        Ok(Box::new(FakeConnection {
            script: self.printer.clone(),
            calls: Arc::clone(&self.calls),
            queued: 0,
        }))
    }
}

struct FakeConnection {
    script: FakePrinter,
    calls: Arc<Mutex<Vec<Call>>>,
    queued: usize,
}

impl FakeConnection {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PrinterConnection for FakeConnection {
    async fn connect(&mut self) -> Result<()> {
        self.record(Call::Connect);
        self.script.connect_fail.map_or(Ok(()), |f| Err(f.error()))
    }

    async fn status(&mut self) -> Result<Option<PrinterStatus>> {
        self.record(Call::Status);
        Ok(self.script.online.map(|online| PrinterStatus {
            online,
            ..Default::default()
        }))
    }

    async fn queue(&mut self, command: &PrintCommand) -> Result<()> {
        if self.script.queue_fail_at == Some(self.queued) {
            return Err(TillrollError::Bridge("printer buffer error".into()));
        }
        self.queued += 1;
        self.record(Call::Queue(command.clone()));
        Ok(())
    }

    async fn send_data(&mut self) -> Result<()> {
        self.record(Call::SendData);
        self.script.send_fail.map_or(Ok(()), |f| Err(f.error()))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.record(Call::Disconnect);
        self.script.disconnect_fail.map_or(Ok(()), |f| Err(f.error()))
    }
}

pub fn device(name: &str, address: &str) -> BluetoothDevice {
    BluetoothDevice {
        name: Some(name.into()),
        address: Some(address.into()),
    }
}

pub fn network_record(name: &str, ip: &str) -> RawDeviceRecord {
    RawDeviceRecord {
        name: Some(name.into()),
        target: Some(ip.into()),
        ip_address: Some(ip.into()),
        ..Default::default()
    }
}
