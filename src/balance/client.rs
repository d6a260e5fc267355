//! HTTP client for the publisher backend's balance endpoint.

use super::response::{BalanceCheck, Offer};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the balance endpoint, relative to the base URL.
const CHECK_BALANCE_PATH: &str = "/check-balance";

const DEFAULT_BASE_URL: &str = "http://localhost:8081";

/// Default request timeout (milliseconds).
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

// ── Configuration ────────────────────────────────────────────────

/// Balance endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Publisher backend base URL (e.g., http://localhost:8081).
    pub base_url: String,
    /// Credential sent verbatim in the `Authorization` header.
    pub auth_token: String,
    /// Upper bound on the whole request, connect through body.
    pub timeout_ms: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BalanceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Errors ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("balance service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("balance service unreachable: {0}")]
    Network(#[source] reqwest::Error),

    #[error("balance service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("balance response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

// ── Client ───────────────────────────────────────────────────────

/// Client for `GET /check-balance?cost=N`.
#[derive(Clone)]
pub struct BalanceClient {
    config: BalanceConfig,
    http: reqwest::Client,
}

impl BalanceClient {
    pub fn new(config: BalanceConfig) -> Result<Self, BalanceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(BalanceError::Client)?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            CHECK_BALANCE_PATH
        )
    }

    fn classify(&self, err: reqwest::Error) -> BalanceError {
        if err.is_timeout() {
            BalanceError::Timeout(self.config.timeout())
        } else {
            BalanceError::Network(err)
        }
    }

    /// Ask whether the balance covers `cost`, surfacing every failure.
    pub async fn try_check_balance(&self, cost: i64) -> Result<BalanceCheck, BalanceError> {
        let mut request = self.http.get(self.endpoint_url()).query(&[("cost", cost)]);
        if !self.config.auth_token.is_empty() {
            request = request.header(AUTHORIZATION, &self.config.auth_token);
        }

        let resp = request.send().await.map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BalanceError::Status { status, body });
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        let check = BalanceCheck::from_slice(&body).map_err(BalanceError::Decode)?;

        tracing::debug!(
            cost,
            tokens = ?check.tokens,
            offers = check.offers.len(),
            "Balance checked"
        );
        Ok(check)
    }

    /// Fail-soft balance check.
    ///
    /// Any failure is logged and reported as [`BalanceCheck::default`]
    /// (balance unknown, no offers).
    pub async fn check_balance(&self, cost: i64) -> BalanceCheck {
        match self.try_check_balance(cost).await {
            Ok(check) => check,
            Err(e) => {
                tracing::warn!(cost, error = %e, "Balance check failed");
                BalanceCheck::default()
            }
        }
    }

    /// Offers to present when the balance does not cover `cost`, or `None`
    /// when it does (or when the service could not be asked).
    pub async fn offers_if_insufficient(&self, cost: i64) -> Option<Vec<Offer>> {
        let check = self.check_balance(cost).await;
        check.is_insufficient().then_some(check.offers)
    }
}

// ── Tests ────────────────────────────────────────────────────────
