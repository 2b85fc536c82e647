use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct ProxyManager;

impl ProxyManager {
    pub const DEFAULT_PROXY_FILE: &'static str = "proxies.txt";

    /// Loads proxies from a text file, one per line.
    /// A missing file is not an error: accounts then connect directly.
    pub fn load_proxies(path: impl AsRef<Path>) -> Result<Vec<ProxyConfig>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found. Running without proxies.", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let proxies = Self::parse_proxies(&content);

        info!("Loaded {} proxies from {}", proxies.len(), path.display());
        Ok(proxies)
    }

    pub fn parse_proxies(content: &str) -> Vec<ProxyConfig> {
        let mut proxies = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match ProxyConfig::parse(line) {
                Some(proxy) => proxies.push(proxy),
                None => warn!("Skipping invalid proxy line: {}", line),
            }
        }

        proxies
    }

    /// Round-robin assignment: account `index` gets proxy `index % len`.
    pub fn assign(proxies: &[ProxyConfig], index: usize) -> Option<ProxyConfig> {
        if proxies.is_empty() {
            None
        } else {
            Some(proxies[index % proxies.len()].clone())
        }
    }
}
