// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service container holding the platform bridge, the discovery
// coordinator, the persisted config, and the account session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use tillroll_auth::{ApiClient, ReqwestTransport, TokenStore};
use tillroll_bridge::{PlatformBridge, platform_bridge};
use tillroll_core::AppConfig;
use tillroll_core::error::{Result, TillrollError};
use tillroll_core::receipt::Receipt;
use tillroll_core::types::PrinterDescriptor;
use tillroll_print::{DiscoveryCoordinator, PrintSession, ReceiptLayout};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

/// All backend services, initialised once at startup.
pub struct AppServices {
    data_dir: PathBuf,
    config: Mutex<AppConfig>,
    bridge: Arc<dyn PlatformBridge>,
    coordinator: DiscoveryCoordinator,
    tokens: Arc<TokenStore>,
}

impl AppServices {
    /// Initialise against the platform bridge and the default data directory.
    pub fn init() -> Self {
        Self::with_bridge(platform_bridge(), data_dir::data_dir())
    }

    pub fn with_bridge(bridge: Arc<dyn PlatformBridge>, data_dir: PathBuf) -> Self {
        let config = load_config(&data_dir);
        let synthetic = config.synthetic_printers();
        let coordinator =
            DiscoveryCoordinator::new(Arc::clone(&bridge), config.discovery.clone(), synthetic);
        let tokens = Arc::new(TokenStore::persistent(data_dir.join(SESSION_FILE)));

        info!(
            platform = bridge.platform_name(),
            data_dir = %data_dir.display(),
            test_printers = config.test_printers.len(),
            "services initialised"
        );

        Self {
            data_dir,
            config: Mutex::new(config),
            bridge,
            coordinator,
            tokens,
        }
    }

    // -- Config Persistence --------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.lock_config().clone()
    }

    /// Update and persist the config. Discovery settings take effect on the
    /// next start.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.lock_config() = config.clone();
        persist_config(&self.data_dir, config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -- Printing ------------------------------------------------------------

    pub fn coordinator(&self) -> &DiscoveryCoordinator {
        &self.coordinator
    }

    pub fn layout(&self) -> ReceiptLayout {
        ReceiptLayout::from_config(&self.lock_config().receipt)
    }

    /// A receipt carrying the configured header and footer lines.
    ///
    /// A blank `title` uses the configured default title.
    pub fn draft_receipt(&self, title: Option<&str>) -> Receipt {
        let config = self.lock_config();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&config.receipt.default_title);
        let mut receipt = Receipt::new(title);
        receipt.header_lines = config.receipt.header_lines.clone();
        receipt.footer_lines = config.receipt.footer_lines.clone();
        receipt
    }

    /// Resolve `target` against the merged printer list.
    ///
    /// Unknown targets are still printable: the user may have copied the
    /// address straight from the printer's self-test slip.
    pub fn resolve_printer(&self, target: &str) -> Result<PrinterDescriptor> {
        let target = target.trim();
        if target.is_empty() {
            return Err(TillrollError::NoPrinterSelected);
        }
        Ok(self.coordinator.find(target).unwrap_or_else(|| {
            info!(printer = target, "printer not in list, using address as given");
            PrinterDescriptor::new(target, target)
        }))
    }

    /// A fresh print session for `target`.
    pub fn print_session(&self, target: &str) -> Result<PrintSession> {
        let printer = self.resolve_printer(target)?;
        Ok(PrintSession::new(Arc::clone(&self.bridge), printer, self.layout()))
    }

    // -- Account -------------------------------------------------------------

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Account API client against the configured base URL.
    pub fn api_client(&self) -> Result<ApiClient> {
        let base_url = self
            .lock_config()
            .api_base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| TillrollError::Api("no api_base_url configured".into()))?;
        let transport = ReqwestTransport::new(base_url)?;
        Ok(ApiClient::new(Arc::new(transport), Arc::clone(&self.tokens)))
    }

    fn lock_config(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// -- Config file persistence -------------------------------------------------

/// Missing file means defaults; an unreadable one is logged and replaced by
/// defaults on the next save.
fn load_config(data_dir: &Path) -> AppConfig {
    let path = data_dir.join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(_) => return AppConfig::default(),
    };
    serde_json::from_str(&data).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring unreadable config");
        AppConfig::default()
    })
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tillroll_core::config::TestPrinterPreset;
    use tillroll_core::error::ErrorCategory;
    use tillroll_core::types::{ConnectionKind, DiscoveryMode, ScanStatus, SessionState};
    use tillroll_print::PrintOptions;

    use super::*;

    fn services(dir: &Path) -> AppServices {
        AppServices::with_bridge(platform_bridge(), dir.to_path_buf())
    }

    fn shop_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.test_printers.push(TestPrinterPreset {
            label: "Shop printer".into(),
            target: "BT:DC:1D:30:EC:91:40".into(),
            ..Default::default()
        });
        config.receipt.header_lines = vec!["12 Market St".into()];
        config
    }

    #[test]
    fn missing_config_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()), AppConfig::default());
    }

    #[test]
    fn corrupt_config_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{{").unwrap();
        assert_eq!(load_config(dir.path()), AppConfig::default());
    }

    #[test]
    fn saved_config_is_loaded_on_next_start() {
        let dir = tempfile::tempdir().unwrap();
        services(dir.path()).save_config(&shop_config()).unwrap();

        let reopened = services(dir.path());
        assert_eq!(reopened.config(), shop_config());
        let printers = reopened.coordinator().printers();
        assert_eq!(printers.len(), 1);
        assert!(printers[0].is_synthetic);
    }

    #[test]
    fn draft_receipt_uses_configured_lines() {
        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        svc.save_config(&shop_config()).unwrap();

        let receipt = svc.draft_receipt(Some("  "));
        assert_eq!(receipt.title, "My Store");
        assert_eq!(receipt.header_lines, vec!["12 Market St".to_string()]);
        assert_eq!(receipt.footer_lines, vec!["Thank you!".to_string()]);
        assert_eq!(svc.draft_receipt(Some("Cafe")).title, "Cafe");
    }

    #[test]
    fn resolve_prefers_registry_entry() {
        let dir = tempfile::tempdir().unwrap();
        services(dir.path()).save_config(&shop_config()).unwrap();
        let svc = services(dir.path());

        let printer = svc.resolve_printer("bt:dc:1d:30:ec:91:40").unwrap();
        assert_eq!(printer.display_name, "Shop printer");
        assert!(printer.is_synthetic);

        let adhoc = svc.resolve_printer("192.168.1.50").unwrap();
        assert!(!adhoc.is_synthetic);
        assert_eq!(adhoc.connection_kind(), ConnectionKind::Network);
    }

    #[test]
    fn blank_target_is_no_printer_selected() {
        let dir = tempfile::tempdir().unwrap();
        let err = services(dir.path()).print_session("   ").err().unwrap();
        assert!(matches!(err, TillrollError::NoPrinterSelected));
    }

    #[test]
    fn api_client_needs_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = services(dir.path()).api_client().err().unwrap();
        assert!(matches!(err, TillrollError::Api(_)));
    }

    #[tokio::test]
    async fn desktop_bluetooth_scan_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        let snapshot = svc.coordinator().scan(DiscoveryMode::Bluetooth).await;
        assert_eq!(snapshot.session.status, ScanStatus::Failed);
        let error = snapshot.session.error.unwrap();
        assert_eq!(error.category, ErrorCategory::DiscoveryUnavailable);
    }

    #[tokio::test]
    async fn desktop_bluetooth_print_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        let mut session = svc.print_session("BT:00:11:22:33:44:55").unwrap();
        let receipt = Receipt::sample("Cafe");

        let err = session.print_receipt(&receipt, PrintOptions::default()).await.unwrap_err();
        assert!(matches!(err, TillrollError::ConnectionFailed(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn desktop_prints_to_raw_tcp_printer() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let printer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        let mut session = svc.print_session(&format!("127.0.0.1:{port}")).unwrap();
        let receipt = Receipt::sample("Cafe");
        session.print_receipt(&receipt, PrintOptions::default()).await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);

        let received = printer.await.unwrap();
        assert!(received.starts_with(&[0x1B, b'@']));
        assert!(received.ends_with(&[0x1D, b'V', 0]));
    }
}
