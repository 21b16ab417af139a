// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tillroll Auth — account API client. Requests carry the current access
// token; an expired token is renewed once, shared by every request that hit
// the expiry, and a failed renewal signs the user out.

pub mod client;
pub mod single_flight;
pub mod tokens;

pub use client::{ApiClient, ApiRequest, ApiResponse, ApiTransport, Method, ReqwestTransport};
pub use single_flight::SingleFlight;
pub use tokens::{AuthTokens, TokenStore};
