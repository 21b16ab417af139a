// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Tillroll.

use std::time::Duration;

use thiserror::Error;

/// Why a discovery capability cannot be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// Radio or capability switched off (e.g. Bluetooth disabled).
    CapabilityDisabled,
    /// The OS refused the permission needed to scan.
    PermissionDenied,
}

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CapabilityDisabled => "capability disabled",
            Self::PermissionDenied => "permission denied",
        })
    }
}

/// User-facing error category. Every `TillrollError` maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    DiscoveryUnavailable,
    DiscoveryTimeout,
    DiscoveryFailed,
    ConnectionFailed,
    PrintFailed,
    AuthExpired,
    Api,
    InvalidInput,
    Internal,
}

/// Top-level error type for all Tillroll operations.
#[derive(Debug, Error)]
pub enum TillrollError {
    // -- Discovery errors --
    #[error("printer discovery unavailable: {0}")]
    DiscoveryUnavailable(Unavailable),

    #[error("printer discovery failed: {0}")]
    Discovery(String),

    #[error("printer discovery timed out after {0:?}")]
    DiscoveryTimeout(Duration),

    // -- Session errors --
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("printer reported offline after connect")]
    OfflineAfterConnect,

    #[error("print failed: {0}")]
    PrintFailed(String),

    #[error("no printer selected")]
    NoPrinterSelected,

    #[error("invalid receipt: {0}")]
    InvalidReceipt(String),

    // -- API errors --
    #[error("session expired")]
    AuthExpired,

    #[error("API request failed: {0}")]
    Api(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl TillrollError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DiscoveryUnavailable(_) | Self::PermissionDenied(_) => {
                ErrorCategory::DiscoveryUnavailable
            }
            Self::DiscoveryTimeout(_) => ErrorCategory::DiscoveryTimeout,
            Self::Discovery(_) => ErrorCategory::DiscoveryFailed,
            Self::ConnectionFailed(_) | Self::OfflineAfterConnect => {
                ErrorCategory::ConnectionFailed
            }
            Self::PrintFailed(_) => ErrorCategory::PrintFailed,
            Self::AuthExpired => ErrorCategory::AuthExpired,
            Self::Api(_) => ErrorCategory::Api,
            Self::NoPrinterSelected | Self::InvalidReceipt(_) => ErrorCategory::InvalidInput,
            Self::Io(_) | Self::Serialization(_) | Self::Bridge(_) | Self::PlatformUnavailable => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TillrollError>;
