//! Wallet sign-in.
//!
//! Login = challenge token + EIP-191 signature of a fixed message, exchanged
//! at `/auth` for a bearer token.

use crate::api::{LoginPayload, LoginResponse, ServiceEndpoints};
use crate::captcha::ChallengeSolver;
use crate::error::FarmError;
use crate::headers::HeaderSet;
use crate::interception::is_intercepted;
use crate::transport::{Request, Requester};
use core_logic::{MetricsCollector, PrivateKey, RetryConfig};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use ethers::utils::{hash_message, to_checksum};
use tracing::{debug, warn};

pub const SIGN_IN_PREFIX: &str = "megafin.xyz requests you to sign in with your wallet address: ";

/// The account's key pair. Built once per worker; a bad key stops the worker.
#[derive(Clone)]
pub struct AccountIdentity {
    wallet: LocalWallet,
}

impl std::fmt::Debug for AccountIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountIdentity")
            .field("address", &self.address_checksum())
            .finish()
    }
}

impl AccountIdentity {
    pub fn from_private_key(key: &PrivateKey) -> Result<Self, FarmError> {
        let wallet = key
            .expose()
            .parse::<LocalWallet>()
            .map_err(|e| FarmError::InvalidPrivateKey {
                reason: e.to_string(),
            })?;
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// EIP-55 checksummed address, the form the API expects.
    pub fn address_checksum(&self) -> String {
        to_checksum(&self.wallet.address(), None)
    }

    pub fn sign_in_message(&self) -> String {
        format!("{}{}", SIGN_IN_PREFIX, self.address_checksum())
    }

    /// 65-byte personal-message signature with a 27/28 recovery byte.
    pub fn sign_in_signature(&self) -> Result<[u8; 65], FarmError> {
        let digest = hash_message(self.sign_in_message());
        let signature = self
            .wallet
            .sign_hash(digest)
            .map_err(|e| FarmError::Signing {
                reason: e.to_string(),
            })?;

        let bytes: [u8; 65] = signature.into();
        Ok(normalize_recovery_byte(bytes))
    }

    pub fn sign_in_signature_hex(&self) -> Result<String, FarmError> {
        Ok(format!("0x{}", hex::encode(self.sign_in_signature()?)))
    }
}

/// Moves a raw `0/1` recovery id into the `27/28` range. Already-offset
/// values are left alone.
pub fn normalize_recovery_byte(mut signature: [u8; 65]) -> [u8; 65] {
    if signature[64] < 27 {
        signature[64] += 27;
    }
    signature
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub endpoints: ServiceEndpoints,
    pub invite_code: String,
    pub retry: RetryConfig,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            endpoints: ServiceEndpoints::default(),
            invite_code: crate::api::DEFAULT_INVITE_CODE.to_string(),
            retry: RetryConfig::forever(),
        }
    }
}

pub struct Authenticator<S> {
    identity: AccountIdentity,
    solver: S,
    settings: AuthSettings,
    label: String,
}

impl<S: ChallengeSolver> Authenticator<S> {
    pub fn new(identity: AccountIdentity, solver: S, settings: AuthSettings) -> Self {
        let label = identity.address_checksum();
        Self {
            identity,
            solver,
            settings,
            label,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Exchanges a fresh challenge token and the wallet signature for a
    /// session token.
    ///
    /// The challenge header is present on every `/auth` attempt and is gone
    /// from the returned headers.
    pub async fn login<R: Requester>(
        &self,
        requester: &R,
        headers: HeaderSet,
    ) -> Result<(HeaderSet, String), FarmError> {
        let payload = LoginPayload {
            invite_code: self.settings.invite_code.clone(),
            key: self.identity.address_checksum(),
            wallet_hash: self.identity.sign_in_signature_hex()?,
        };
        let request = Request::post_json(self.settings.endpoints.auth(), &payload)?;

        let challenge = self.solver.solve(headers.user_agent()).await?;
        let mut headers = headers.with_challenge(challenge);
        headers.set("accept", "application/json");

        let mut budget = self.settings.retry.budget("login");
        let metrics = MetricsCollector::global();

        loop {
            match requester.send(&request, &headers).await {
                Err(e) => {
                    metrics.record_transient_failure();
                    warn!(target: "farm_event", "{} | Error When Auth: {}", self.label, e);
                }
                Ok(response) if is_intercepted(&response.body) => {
                    metrics.record_interception();
                    warn!(target: "farm_event", "{} | CLOUDFLARE on auth | Status Code: {}", self.label, response.status);
                }
                Ok(response) => match serde_json::from_slice::<LoginResponse>(&response.body) {
                    Err(_) => {
                        metrics.record_decode_failure();
                        warn!(
                            target: "farm_event",
                            "{} | Failed To Parse JSON Response When Logging: {} | Status Code: {}",
                            self.label,
                            response.snippet(512),
                            response.status
                        );
                    }
                    Ok(parsed) if parsed.token().is_empty() => {
                        warn!(
                            target: "farm_event",
                            "{} | Wrong Response When Auth: {} | Status Code: {}",
                            self.label,
                            response.snippet(512),
                            response.status
                        );
                    }
                    Ok(parsed) => {
                        metrics.record_login();
                        debug!("{} | Auth token received", self.label);
                        return Ok((headers.without_challenge(), parsed.token().to_string()));
                    }
                },
            }

            headers.rotate_user_agent();
            budget.backoff().await?;
        }
    }
}
