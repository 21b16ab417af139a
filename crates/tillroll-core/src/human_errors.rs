// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the printer screens.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Raw capability messages never become the headline; at most a short excerpt
// is carried along as `diagnostic`.

use crate::error::{ErrorCategory, TillrollError, Unavailable};

/// Longest capability excerpt kept in `HumanError::diagnostic`.
const DIAGNOSTIC_MAX_CHARS: usize = 120;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying again may work (printer busy, timeout, flaky radio).
    Transient,
    /// User must do something (turn on Bluetooth, grant permission, add paper).
    ActionRequired,
    /// Retrying won't help.
    Permanent,
}

/// What the screen should offer next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Plain "Try again" button.
    Retry,
    /// Deep link to the system settings page.
    OpenSettings,
    /// Back to the sign-in screen.
    SignIn,
    None,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    pub category: ErrorCategory,
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Short technical excerpt for support, if any.
    pub diagnostic: Option<String>,
    pub retriable: bool,
    pub severity: Severity,
    pub recovery: Recovery,
}

impl HumanError {
    fn new(
        category: ErrorCategory,
        message: &str,
        suggestion: &str,
        severity: Severity,
        recovery: Recovery,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            suggestion: suggestion.into(),
            diagnostic: None,
            retriable: recovery == Recovery::Retry,
            severity,
            recovery,
        }
    }

    fn with_diagnostic(mut self, detail: &str) -> Self {
        self.diagnostic = short_diagnostic(detail);
        self
    }
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert a `TillrollError` into a `HumanError`.
pub fn humanize_error(err: &TillrollError) -> HumanError {
    let category = err.category();
    match err {
        // -- Discovery --
        TillrollError::DiscoveryUnavailable(Unavailable::CapabilityDisabled) => HumanError::new(
            category,
            "Bluetooth is turned off.",
            "Turn on Bluetooth in your device settings, then search again.",
            Severity::ActionRequired,
            Recovery::OpenSettings,
        ),

        TillrollError::DiscoveryUnavailable(Unavailable::PermissionDenied)
        | TillrollError::PermissionDenied(_) => HumanError::new(
            category,
            "Tillroll isn't allowed to look for printers.",
            "Allow Bluetooth and nearby-device access for Tillroll in Settings, then search again.",
            Severity::ActionRequired,
            Recovery::OpenSettings,
        ),

        TillrollError::Discovery(detail) => HumanError::new(
            category,
            "We couldn't search for printers.",
            "Make sure Bluetooth or Wi-Fi is on, then try again.",
            Severity::Transient,
            Recovery::Retry,
        )
        .with_diagnostic(detail),

        TillrollError::DiscoveryTimeout(_) => HumanError::new(
            category,
            "No printers found.",
            "Make sure your printer is turned on and close to this device, then search again.",
            Severity::Transient,
            Recovery::Retry,
        ),

        // -- Session --
        TillrollError::ConnectionFailed(detail) => humanize_connection_detail(detail),

        TillrollError::OfflineAfterConnect => HumanError::new(
            category,
            "The printer is connected but not ready.",
            "Check that the printer has paper and its cover is closed, then try again.",
            Severity::ActionRequired,
            Recovery::Retry,
        ),

        TillrollError::PrintFailed(detail) => humanize_print_detail(detail),

        TillrollError::NoPrinterSelected => HumanError::new(
            category,
            "No printer selected.",
            "Choose a printer from the list, then try again.",
            Severity::ActionRequired,
            Recovery::None,
        ),

        TillrollError::InvalidReceipt(detail) => HumanError::new(
            category,
            "Please check the receipt items.",
            "Every item needs a name and a price like 9.99.",
            Severity::ActionRequired,
            Recovery::None,
        )
        .with_diagnostic(detail),

        // -- API --
        TillrollError::AuthExpired => HumanError::new(
            category,
            "You've been signed out.",
            "Please sign in again to continue.",
            Severity::ActionRequired,
            Recovery::SignIn,
        ),

        TillrollError::Api(detail) => HumanError::new(
            category,
            "We couldn't reach the server.",
            "Check your internet connection, then try again.",
            Severity::Transient,
            Recovery::Retry,
        )
        .with_diagnostic(detail),

        // -- Storage / platform --
        TillrollError::Io(io_err) => HumanError::new(
            category,
            "There was a problem reading or writing app data.",
            "Try again. If this keeps happening, your device's storage may be full.",
            Severity::Transient,
            Recovery::Retry,
        )
        .with_diagnostic(&io_err.to_string()),

        TillrollError::Serialization(_) => HumanError::new(
            category,
            "The app had an internal data problem.",
            "Try again. If this keeps happening, please report it.",
            Severity::Transient,
            Recovery::Retry,
        ),

        TillrollError::Bridge(detail) => HumanError::new(
            category,
            "A device feature didn't work.",
            "Try restarting the app. Some features may not be available on all devices.",
            Severity::Transient,
            Recovery::Retry,
        )
        .with_diagnostic(detail),

        TillrollError::PlatformUnavailable => HumanError::new(
            category,
            "This feature isn't available on your device.",
            "Printing needs a phone or tablet with Bluetooth or a network printer.",
            Severity::Permanent,
            Recovery::None,
        ),
    }
}

/// Parse connection failure details into human-readable messages.
fn humanize_connection_detail(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();
    let category = ErrorCategory::ConnectionFailed;

    let human = if lower.contains("timed out") || lower.contains("timeout") {
        HumanError::new(
            category,
            "The printer didn't respond in time.",
            "The printer might be busy or turned off. Check it's on and nearby, then try again.",
            Severity::Transient,
            Recovery::Retry,
        )
    } else if lower.contains("pair") || lower.contains("pin") || lower.contains("bond") {
        HumanError::new(
            category,
            "The printer needs to be paired first.",
            "Pair the printer in your Bluetooth settings using its PIN, then try again.",
            Severity::ActionRequired,
            Recovery::OpenSettings,
        )
    } else if lower.contains("refused") || lower.contains("unreachable") {
        HumanError::new(
            category,
            "We couldn't reach the printer.",
            "Make sure the printer is on the same network as this device, then try again.",
            Severity::Transient,
            Recovery::Retry,
        )
    } else {
        HumanError::new(
            category,
            "Connection failed.",
            "Try turning the printer off and on again, then reconnect.",
            Severity::Transient,
            Recovery::Retry,
        )
    };
    human.with_diagnostic(detail)
}

/// Parse print failure details into human-readable messages.
fn humanize_print_detail(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();
    let category = ErrorCategory::PrintFailed;

    let human = if lower.contains("paper") || lower.contains("media-empty") {
        HumanError::new(
            category,
            "The printer is out of paper.",
            "Load a new paper roll, then tap Retry.",
            Severity::ActionRequired,
            Recovery::Retry,
        )
    } else if lower.contains("cover") {
        HumanError::new(
            category,
            "The printer cover is open.",
            "Close the printer cover, then tap Retry.",
            Severity::ActionRequired,
            Recovery::Retry,
        )
    } else {
        HumanError::new(
            category,
            "Printing failed.",
            "The receipt wasn't printed. Check the printer, then try again.",
            Severity::Transient,
            Recovery::Retry,
        )
    };
    human.with_diagnostic(detail)
}

fn short_diagnostic(detail: &str) -> Option<String> {
    let trimmed = detail.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out: String = trimmed.chars().take(DIAGNOSTIC_MAX_CHARS).collect();
    if trimmed.chars().count() > DIAGNOSTIC_MAX_CHARS {
        out.push('…');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_bluetooth_offers_settings() {
        let human =
            humanize_error(&TillrollError::DiscoveryUnavailable(Unavailable::CapabilityDisabled));
        assert_eq!(human.recovery, Recovery::OpenSettings);
        assert_eq!(human.category, ErrorCategory::DiscoveryUnavailable);
        assert!(!human.retriable);
    }

    #[test]
    fn permission_and_disabled_are_distinct() {
        let disabled =
            humanize_error(&TillrollError::DiscoveryUnavailable(Unavailable::CapabilityDisabled));
        let denied =
            humanize_error(&TillrollError::DiscoveryUnavailable(Unavailable::PermissionDenied));
        assert_ne!(disabled.message, denied.message);
        assert_eq!(denied.recovery, Recovery::OpenSettings);
    }

    #[test]
    fn generic_discovery_failure_is_retriable() {
        let human = humanize_error(&TillrollError::Discovery("SDK error code 5".into()));
        assert_eq!(human.recovery, Recovery::Retry);
        assert!(human.retriable);
        assert_eq!(human.diagnostic.as_deref(), Some("SDK error code 5"));
    }

    #[test]
    fn connection_and_print_failures_read_differently() {
        let conn = humanize_error(&TillrollError::ConnectionFailed("socket closed".into()));
        let print = humanize_error(&TillrollError::PrintFailed("socket closed".into()));
        assert_eq!(conn.category, ErrorCategory::ConnectionFailed);
        assert_eq!(print.category, ErrorCategory::PrintFailed);
        assert_ne!(conn.message, print.message);
        assert!(!conn.message.contains("socket"));
    }

    #[test]
    fn offline_after_connect_is_a_connection_failure() {
        let human = humanize_error(&TillrollError::OfflineAfterConnect);
        assert_eq!(human.category, ErrorCategory::ConnectionFailed);
    }

    #[test]
    fn pairing_failure_points_to_settings() {
        let human = humanize_error(&TillrollError::ConnectionFailed("pairing rejected".into()));
        assert_eq!(human.recovery, Recovery::OpenSettings);
    }

    #[test]
    fn auth_expired_signs_out() {
        let human = humanize_error(&TillrollError::AuthExpired);
        assert_eq!(human.recovery, Recovery::SignIn);
        assert!(!human.retriable);
    }

    #[test]
    fn long_diagnostics_are_truncated() {
        let detail = "x".repeat(500);
        let human = humanize_error(&TillrollError::PrintFailed(detail));
        let diagnostic = human.diagnostic.unwrap_or_default();
        assert_eq!(diagnostic.chars().count(), DIAGNOSTIC_MAX_CHARS + 1);
    }
}
