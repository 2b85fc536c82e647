//! Per-account state machine.
//!
//! ```text
//! AUTHENTICATING --profile ok--> ACTIVE_POLLING --401--> AUTHENTICATING
//! ```
//!
//! Authentication runs while holding a gate slot; polling never does.

use crate::api::{Balance, BalanceResponse, ServiceEndpoints};
use crate::auth::Authenticator;
use crate::captcha::{ChallengeSolver, TwoCaptchaSolver};
use crate::error::FarmError;
use crate::headers::HeaderSet;
use crate::interception::is_intercepted;
use crate::transport::{HttpRequester, Request, Requester};
use async_trait::async_trait;
use core_logic::{
    AdmissionGate, ConcurrencyGate, MetricsCollector, RetryConfig, Worker, WorkerStats,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub endpoints: ServiceEndpoints,
    pub keep_alive_interval: Duration,
    pub retry: RetryConfig,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            endpoints: ServiceEndpoints::default(),
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            retry: RetryConfig::forever(),
        }
    }
}

/// Bearer token plus the headers it is attached to.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    headers: HeaderSet,
}

impl Session {
    pub fn new(token: impl Into<String>, headers: HeaderSet) -> Self {
        let token = token.into();
        let headers = headers.with_bearer(&token);
        Self { token, headers }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Drops the token and hands back headers fit for a fresh login.
    pub fn expire(self) -> HeaderSet {
        self.headers.without_bearer().without_challenge()
    }
}

#[derive(Debug)]
pub enum KeepAlive {
    Active(Session, Balance),
    /// The server rejected the token (401).
    Expired(HeaderSet),
}

/// Result of one gated authentication phase.
#[derive(Debug)]
pub struct Authenticated {
    pub session: Session,
    pub balance: Balance,
    /// Logins it took to get a session the profile endpoint accepted.
    pub logins: u64,
}

pub struct AccountPoller<R, S, G> {
    label: String,
    requester: R,
    authenticator: Authenticator<S>,
    gate: G,
    settings: SessionSettings,
}

/// The poller wired to real HTTP clients and the process-wide gate.
pub type LiveAccountPoller =
    AccountPoller<HttpRequester, TwoCaptchaSolver<HttpRequester>, ConcurrencyGate>;

impl<R, S, G> AccountPoller<R, S, G>
where
    R: Requester,
    S: ChallengeSolver,
    G: AdmissionGate,
{
    pub fn new(
        label: impl Into<String>,
        requester: R,
        authenticator: Authenticator<S>,
        gate: G,
        settings: SessionSettings,
    ) -> Self {
        let label = label.into();
        Self {
            authenticator: authenticator.with_label(label.clone()),
            label,
            requester,
            gate,
            settings,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn fresh_headers(&self) -> HeaderSet {
        HeaderSet::browser_defaults(&self.settings.endpoints.app_origin)
    }

    /// Logs in and checks the profile until it accepts the token.
    ///
    /// The gate slot is held for the whole phase, including re-logins after a
    /// rejected profile check, and released on every exit path.
    pub async fn authenticate(&self, headers: HeaderSet) -> Result<Authenticated, FarmError> {
        let _permit = self.gate.acquire().await?;
        debug!("{} | Gate slot acquired", self.label);

        let profile_url = self.settings.endpoints.profile();
        let mut headers = headers;
        let mut logins = 0u64;

        loop {
            let (fresh, token) = self.authenticator.login(&self.requester, headers).await?;
            logins += 1;

            match self
                .fetch_balance(Session::new(token, fresh), &profile_url, "profile check")
                .await?
            {
                KeepAlive::Active(session, balance) => {
                    return Ok(Authenticated {
                        session,
                        balance,
                        logins,
                    });
                }
                KeepAlive::Expired(expired) => {
                    MetricsCollector::global().record_reauthentication();
                    warn!(target: "farm_event", "{} | RELOGIN | Unauthorized after login", self.label);
                    headers = expired;
                }
            }
        }
    }

    /// GETs a balance endpoint until it yields a balance or a 401.
    async fn fetch_balance(
        &self,
        mut session: Session,
        url: &str,
        operation: &str,
    ) -> Result<KeepAlive, FarmError> {
        let request = Request::get(url);
        let mut budget = self.settings.retry.budget(operation);
        let metrics = MetricsCollector::global();

        loop {
            match self.requester.send(&request, &session.headers).await {
                Ok(response) if response.is_unauthorized() => {
                    return Ok(KeepAlive::Expired(session.expire()));
                }
                Err(e) => {
                    metrics.record_transient_failure();
                    warn!(target: "farm_event", "{} | Error on {}: {}", self.label, operation, e);
                }
                Ok(response) if is_intercepted(&response.body) => {
                    metrics.record_interception();
                    warn!(target: "farm_event", "{} | CLOUDFLARE on {}", self.label, operation);
                }
                Ok(response) if !response.is_success() => {
                    metrics.record_transient_failure();
                    warn!(
                        target: "farm_event",
                        "{} | Unexpected status on {}: {} | Status Code: {}",
                        self.label,
                        operation,
                        response.snippet(256),
                        response.status
                    );
                }
                Ok(response) => match serde_json::from_slice::<BalanceResponse>(&response.body) {
                    Ok(parsed) => return Ok(KeepAlive::Active(session, parsed.balance())),
                    Err(_) => {
                        metrics.record_decode_failure();
                        warn!(
                            target: "farm_event",
                            "{} | Failed To Parse JSON Response on {}: {} | Status Code: {}",
                            self.label,
                            operation,
                            response.snippet(512),
                            response.status
                        );
                    }
                },
            }

            session.headers.rotate_user_agent();
            budget.backoff().await?;
        }
    }

    /// One `/users/connect` call.
    pub async fn keep_alive(&self, session: Session) -> Result<KeepAlive, FarmError> {
        let url = self.settings.endpoints.connect();
        self.fetch_balance(session, &url, "keep-alive").await
    }

    /// Authenticates once and reports the profile balance.
    pub async fn check_balance(&self) -> Result<Balance, FarmError> {
        let authenticated = self.authenticate(self.fresh_headers()).await?;
        let balance = authenticated.balance;
        info!(
            target: "farm_event",
            "{} | SUCCESS | MGF Balance: {:.6} | USDC Balance: {:.6}",
            self.label,
            balance.mgf,
            balance.usdc
        );
        Ok(balance)
    }

    /// Alternates between authentication and keep-alive polling until
    /// `cancel` fires. Only irrecoverable errors or an exhausted retry
    /// budget end it early.
    pub async fn run(&self, cancel: CancellationToken) -> Result<WorkerStats, FarmError> {
        let mut stats = WorkerStats::default();
        let mut headers = self.fresh_headers();
        let interval = self.settings.keep_alive_interval;

        loop {
            let authenticated = tokio::select! {
                _ = cancel.cancelled() => return Ok(stats),
                res = self.authenticate(headers) => res?,
            };
            stats.logins += authenticated.logins;
            stats.relogins += authenticated.logins.saturating_sub(1);
            info!(
                target: "farm_event",
                "{} | SUCCESS Logged in | MGF Balance: {:.6} | USDC Balance: {:.6}",
                self.label,
                authenticated.balance.mgf,
                authenticated.balance.usdc
            );

            let mut session = authenticated.session;
            headers = loop {
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => return Ok(stats),
                    res = self.keep_alive(session) => res?,
                };

                match outcome {
                    KeepAlive::Active(active, balance) => {
                        stats.polls += 1;
                        MetricsCollector::global().record_keep_alive();
                        info!(
                            target: "farm_event",
                            "{} | MGF Balance: {:.6} | USDC Balance: {:.6} | Sleeping {} secs.",
                            self.label,
                            balance.mgf,
                            balance.usdc,
                            interval.as_secs()
                        );
                        session = active;

                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(stats),
                            _ = tokio::time::sleep(interval) => {}
                        }
                    }
                    KeepAlive::Expired(expired) => {
                        stats.relogins += 1;
                        MetricsCollector::global().record_reauthentication();
                        warn!(target: "farm_event", "{} | RELOGIN | Unauthorized, logging in again", self.label);
                        break expired;
                    }
                }
            };
        }
    }
}

#[async_trait]
impl<R, S, G> Worker for AccountPoller<R, S, G>
where
    R: Requester,
    S: ChallengeSolver,
    G: AdmissionGate,
{
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn start(&self, cancellation_token: CancellationToken) -> anyhow::Result<WorkerStats> {
        Ok(self.run(cancellation_token).await?)
    }
}
