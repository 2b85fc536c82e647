//! Endpoints and wire types of the Megafin API.

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.megafin.xyz";
pub const DEFAULT_APP_ORIGIN: &str = "https://app.megafin.xyz";
pub const DEFAULT_INVITE_CODE: &str = "133d76e4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub api_base: String,
    pub app_origin: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
        }
    }
}

impl ServiceEndpoints {
    pub fn new(api_base: &str, app_origin: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            app_origin: app_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn auth(&self) -> String {
        format!("{}/auth", self.api_base)
    }

    pub fn profile(&self) -> String {
        format!("{}/users/profile", self.api_base)
    }

    pub fn connect(&self) -> String {
        format!("{}/users/connect", self.api_base)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginPayload {
    pub invite_code: String,
    /// Checksummed wallet address
    pub key: String,
    /// `0x`-prefixed hex signature of the sign-in message
    pub wallet_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub result: Option<LoginResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResult {
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// Empty string when the token is missing.
    pub fn token(&self) -> &str {
        self.result
            .as_ref()
            .and_then(|r| r.token.as_deref())
            .unwrap_or_default()
    }
}

/// Envelope shared by `/users/profile` and `/users/connect`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceResponse {
    #[serde(default)]
    pub result: Option<BalanceResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceResult {
    #[serde(default)]
    pub balance: Balance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(rename = "MGF", default)]
    pub mgf: f64,
    #[serde(rename = "USDC", default)]
    pub usdc: f64,
}

impl BalanceResponse {
    pub fn balance(&self) -> Balance {
        self.result
            .as_ref()
            .map(|r| r.balance)
            .unwrap_or_default()
    }
}

impl std::ops::Add for Balance {
    type Output = Balance;

    fn add(self, other: Balance) -> Balance {
        Balance {
            mgf: self.mgf + other.mgf,
            usdc: self.usdc + other.usdc,
        }
    }
}
