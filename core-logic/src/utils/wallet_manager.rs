use crate::error::{ConfigError, CoreError, WalletError};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A raw EVM private key, hex encoded without the `0x` prefix.
/// Wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn parse(raw: &str, line: usize) -> Result<Self, WalletError> {
        let trimmed = raw.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != 64 {
            return Err(WalletError::InvalidKeyLength {
                line,
                length: hex_part.len(),
            });
        }
        if hex::decode(hex_part).is_err() {
            return Err(WalletError::InvalidKeyFormat { line });
        }

        Ok(Self(hex_part.to_ascii_lowercase()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(***REDACTED***)")
    }
}

pub struct WalletManager {
    keys: Vec<PrivateKey>,
}

impl WalletManager {
    pub const DEFAULT_ACCOUNTS_FILE: &'static str = "accounts.txt";

    /// Reads one private key per line. Blank lines and `#` comments are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            msg: e.to_string(),
        })?;

        let manager = Self::from_lines(&content)?;
        if manager.keys.is_empty() {
            return Err(WalletError::Empty {
                path: path.display().to_string(),
            }
            .into());
        }

        info!("Loaded {} private keys from {}", manager.count(), path.display());
        Ok(manager)
    }

    pub fn from_lines(content: &str) -> Result<Self, WalletError> {
        let mut keys = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            keys.push(PrivateKey::parse(trimmed, i + 1)?);
        }
        Ok(Self { keys })
    }

    /// Returns the number of available wallets
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[PrivateKey] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_parse_strips_prefix() {
        let key = PrivateKey::parse(&format!("0x{}", KEY), 1).unwrap();
        assert_eq!(key.expose(), KEY);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = PrivateKey::parse(KEY, 1).unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains(KEY));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(
            PrivateKey::parse("abc", 3),
            Err(WalletError::InvalidKeyLength { line: 3, length: 3 })
        ));
        let not_hex = "z".repeat(64);
        assert!(matches!(
            PrivateKey::parse(&not_hex, 7),
            Err(WalletError::InvalidKeyFormat { line: 7 })
        ));
    }

    #[test]
    fn test_from_lines_skips_comments() {
        let content = format!("# accounts\n\n{}\n0x{}\n", KEY, KEY);
        let manager = WalletManager::from_lines(&content).unwrap();
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn test_load_empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            WalletManager::load(file.path()),
            Err(CoreError::Wallet(WalletError::Empty { .. }))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            WalletManager::load(dir.path().join("accounts.txt")),
            Err(CoreError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
