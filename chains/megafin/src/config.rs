use crate::api::{ServiceEndpoints, DEFAULT_API_BASE, DEFAULT_APP_ORIGIN, DEFAULT_INVITE_CODE};
use crate::auth::AuthSettings;
use crate::captcha::ChallengeSettings;
use crate::poller::SessionSettings;
use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use core_logic::{ConfigError, RetryConfig};
use serde::Deserialize;
use std::time::Duration;

pub const ENV_PREFIX: &str = "MEGAFIN";

#[derive(Debug, Deserialize, Clone)]
pub struct MegafinConfig {
    #[serde(default)]
    pub twocaptcha_api_key: String,
    /// Capacity of the login gate
    #[serde(default = "default_max_concurrent_logins")]
    pub max_concurrent_logins: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_keep_alive_interval_secs")]
    pub keep_alive_interval_secs: u64,
    #[serde(default = "default_captcha_poll_interval_secs")]
    pub captcha_poll_interval_secs: u64,
    #[serde(default = "default_invite_code")]
    pub invite_code: String,
    #[serde(default = "default_accounts_file")]
    pub accounts_file: String,
    #[serde(default = "default_proxies_file")]
    pub proxies_file: String,
    pub worker_amount: Option<usize>,
    #[serde(default)]
    pub shuffle_accounts: bool,
    pub api_base: Option<String>,
    pub app_origin: Option<String>,
    pub captcha_provider_base: Option<String>,
    #[serde(default)]
    pub retry: RetrySection,
}

/// `max_retries` unset means retry forever.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub base_delay_ms: u64,
}

fn default_max_concurrent_logins() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_keep_alive_interval_secs() -> u64 {
    120
}

fn default_captcha_poll_interval_secs() -> u64 {
    5
}

fn default_invite_code() -> String {
    DEFAULT_INVITE_CODE.to_string()
}

fn default_accounts_file() -> String {
    core_logic::WalletManager::DEFAULT_ACCOUNTS_FILE.to_string()
}

fn default_proxies_file() -> String {
    core_logic::ProxyManager::DEFAULT_PROXY_FILE.to_string()
}

impl MegafinConfig {
    /// Reads `path` (any format the `config` crate knows, missing file
    /// allowed) and overlays `MEGAFIN_*` environment variables, e.g.
    /// `MEGAFIN_TWOCAPTCHA_API_KEY` or `MEGAFIN_RETRY__MAX_RETRIES`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.twocaptcha_api_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "twocaptcha_api_key".to_string(),
            });
        }
        if self.max_concurrent_logins == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_logins".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.worker_amount == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "worker_amount".to_string(),
                reason: "must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        match self.retry.max_retries {
            Some(max) => RetryConfig::new(max, self.retry.base_delay_ms),
            None => RetryConfig {
                base_delay_ms: self.retry.base_delay_ms,
                ..RetryConfig::forever()
            },
        }
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints::new(
            self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
            self.app_origin.as_deref().unwrap_or(DEFAULT_APP_ORIGIN),
        )
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            endpoints: self.endpoints(),
            keep_alive_interval: Duration::from_secs(self.keep_alive_interval_secs),
            retry: self.retry_config(),
        }
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            endpoints: self.endpoints(),
            invite_code: self.invite_code.clone(),
            retry: self.retry_config(),
        }
    }

    pub fn challenge_settings(&self) -> ChallengeSettings {
        let mut settings = ChallengeSettings {
            poll_interval: Duration::from_secs(self.captcha_poll_interval_secs),
            ..ChallengeSettings::default()
        };
        if let Some(base) = &self.captcha_provider_base {
            settings.provider_base = base.clone();
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = MegafinConfig::from_toml_str(r#"twocaptcha_api_key = "abc""#).unwrap();
        assert_eq!(config.max_concurrent_logins, 5);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.keep_alive_interval_secs, 120);
        assert_eq!(config.invite_code, "133d76e4");
        assert_eq!(config.accounts_file, "accounts.txt");
        assert_eq!(config.proxies_file, "proxies.txt");
        assert!(!config.shuffle_accounts);
        assert!(config.retry_config().is_unbounded());
        assert_eq!(config.endpoints(), ServiceEndpoints::default());
        assert_eq!(
            config.challenge_settings().poll_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let err = MegafinConfig::from_toml_str("max_concurrent_logins = 2").unwrap_err();
        assert!(err.to_string().contains("twocaptcha_api_key"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = MegafinConfig::from_toml_str(
            r#"
            twocaptcha_api_key = "abc"
            max_concurrent_logins = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_concurrent_logins"));
    }

    #[test]
    fn test_overrides() {
        let config = MegafinConfig::from_toml_str(
            r#"
            twocaptcha_api_key = "abc"
            api_base = "http://127.0.0.1:9000/"
            captcha_provider_base = "http://127.0.0.1:9001"
            keep_alive_interval_secs = 10
            worker_amount = 3

            [retry]
            max_retries = 4
            base_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints().auth(), "http://127.0.0.1:9000/auth");
        assert_eq!(
            config.challenge_settings().create_task_url(),
            "http://127.0.0.1:9001/createTask?soft_id=4744"
        );
        assert_eq!(
            config.session_settings().keep_alive_interval,
            Duration::from_secs(10)
        );
        let retry = config.retry_config();
        assert_eq!(retry.max_retries, Some(4));
        assert_eq!(retry.base_delay_ms, 250);
        assert_eq!(config.worker_amount, Some(3));
    }
}
