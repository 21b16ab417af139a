// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Account API client.
//
// Every request first waits for a token renewal in progress, then goes out
// with `Authorization: Bearer <access token>`. A 401 (HTTP status or a JSON
// body with `statusCode: 401`) triggers one shared renewal through
// `POST /auth/token/refresh` and a single retry. A failed renewal signs out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use tillroll_core::error::{Result, TillrollError};

use crate::single_flight::SingleFlight;
use crate::tokens::TokenStore;

const REFRESH_PATH: &str = "/auth/token/refresh";

/// Per-request timeout of the HTTP transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One API call as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

/// Transport-level response: status plus decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Some backends answer 200 with `{"statusCode": 401}` in the body.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.body.get("statusCode").and_then(Value::as_u64) == Some(401)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the account API.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TillrollError::Api(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TillrollError::Api(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TillrollError::Api(e.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        debug!(%url, status, "API response");
        Ok(ApiResponse::new(status, body))
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

/// Account API client with transparent token renewal.
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    tokens: Arc<TokenStore>,
    renewal: SingleFlight<bool>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn ApiTransport>, tokens: Arc<TokenStore>) -> Self {
        Self {
            transport,
            tokens,
            renewal: SingleFlight::new(),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    // -- Endpoints ----------------------------------------------------------

    /// Sign in and store the returned tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let body = self
            .send_public(Method::Post, "/auth/login", &LoginRequest { email, password })
            .await?;
        self.store_session(&body)?;
        Ok(body)
    }

    /// Create an account. Tokens in the response, if any, sign the user in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Value> {
        let body = self
            .send_public(
                Method::Post,
                "/auth/register",
                &RegisterRequest {
                    name,
                    email,
                    password,
                },
            )
            .await?;
        if extract_tokens(&body).is_some() {
            self.store_session(&body)?;
        }
        Ok(body)
    }

    pub async fn get_user(&self) -> Result<Value> {
        self.request(Method::Get, "/auth", None).await
    }

    pub async fn update_user(&self, changes: Value) -> Result<Value> {
        self.request(Method::Put, "/auth", Some(changes)).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<Value> {
        self.request(Method::Delete, &format!("/auth/delete/{id}"), None)
            .await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<Value> {
        let body = serde_json::to_value(ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        self.request(Method::Put, "/user/change-password", Some(body))
            .await
    }

    pub fn sign_out(&self) {
        self.tokens.sign_out();
    }

    // -- Core request path --------------------------------------------------

    /// Authenticated request with one renewal-and-retry on 401.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        self.renewal.wait().await;

        let response = self.send_authorized(method, path, body.clone()).await?;
        if !response.is_unauthorized() {
            return into_result(response);
        }

        info!(path, "access token rejected, renewing");
        if !self.renew().await {
            return Err(TillrollError::AuthExpired);
        }

        let retried = self.send_authorized(method, path, body).await?;
        if retried.is_unauthorized() {
            warn!(path, "renewed token rejected");
            self.tokens.sign_out();
            return Err(TillrollError::AuthExpired);
        }
        into_result(retried)
    }

    /// Renew the access token, sharing one renewal between concurrent
    /// callers. Returns whether the user is still signed in.
    async fn renew(&self) -> bool {
        let transport = Arc::clone(&self.transport);
        let tokens = Arc::clone(&self.tokens);
        self.renewal
            .run(move || async move { renew_once(transport.as_ref(), &tokens).await })
            .await
    }

    async fn send_authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        self.transport
            .send(ApiRequest {
                method,
                path: path.to_owned(),
                body,
                bearer: self.tokens.access_token(),
            })
            .await
    }

    /// Request that never triggers a renewal (sign-in and sign-up).
    async fn send_public<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value> {
        let response = self
            .transport
            .send(ApiRequest {
                method,
                path: path.to_owned(),
                body: Some(serde_json::to_value(body)?),
                bearer: None,
            })
            .await?;
        into_result(response)
    }

    fn store_session(&self, body: &Value) -> Result<()> {
        let (access, refresh) = extract_tokens(body)
            .ok_or_else(|| TillrollError::Api("sign-in response carried no access token".into()))?;
        self.tokens.set(access, refresh)
    }
}

#[instrument(skip_all)]
async fn renew_once(transport: &dyn ApiTransport, tokens: &TokenStore) -> bool {
    let Some(refresh_token) = tokens.refresh_token() else {
        warn!("no refresh token, signing out");
        tokens.sign_out();
        return false;
    };

    let response = transport
        .send(ApiRequest {
            method: Method::Post,
            path: REFRESH_PATH.into(),
            body: Some(json!({ "refresh_token": refresh_token })),
            bearer: tokens.access_token(),
        })
        .await;

    let renewed = match response {
        Ok(response) if response.is_success() => extract_tokens(&response.body),
        Ok(response) => {
            warn!(status = response.status, "token refresh rejected");
            None
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed");
            None
        }
    };

    match renewed {
        Some((access, refresh)) => match tokens.renew(access, refresh) {
            Ok(()) => true,
            Err(e) => {
                // The new token is in memory; only the session file is stale.
                warn!(error = %e, "failed to persist renewed token");
                true
            }
        },
        None => {
            tokens.sign_out();
            false
        }
    }
}

/// Pull `access_token` (and `refresh_token`, if present) from a response,
/// accepting both top-level and `data`-wrapped shapes.
fn extract_tokens(body: &Value) -> Option<(String, Option<String>)> {
    let source = match body.get("data") {
        Some(data) if data.get("access_token").is_some() => data,
        _ => body,
    };
    let access = source.get("access_token")?.as_str()?.to_owned();
    let refresh = source
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::to_owned);
    Some((access, refresh))
}

fn into_result(response: ApiResponse) -> Result<Value> {
    if response.is_success() {
        return Ok(response.body);
    }
    let detail = response
        .body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| response.body.to_string());
    Err(TillrollError::Api(format!("HTTP {}: {detail}", response.status)))
}
