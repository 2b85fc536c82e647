use serde::{Deserialize, Serialize};
use url::Url;

const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Base URL without credentials, e.g. `http://1.2.3.4:8080`
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Parses one proxy line.
    ///
    /// Accepted shapes:
    /// - `ip:port`
    /// - `ip:port:user:pass`
    /// - `user:pass@ip:port`
    /// - `scheme://[user[:pass]@]host[:port]` (http, https, socks5, socks5h)
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.contains("://") {
            return Self::parse_url(line);
        }

        // Bare lines are plain http proxies
        let scheme = "http";

        if let Some((credentials, host_port)) = line.rsplit_once('@') {
            let (username, password) = credentials.split_once(':')?;
            let (host, port) = split_host_port(host_port)?;
            return Some(Self {
                url: format!("{}://{}:{}", scheme, host, port),
                username: Some(username.to_string()),
                password: Some(password.to_string()),
            });
        }

        let parts: Vec<&str> = line.split(':').collect();
        match parts.as_slice() {
            [host, port] => Some(Self {
                url: format!("{}://{}:{}", scheme, valid_host(host)?, valid_port(port)?),
                username: None,
                password: None,
            }),
            [host, port, user, pass] => Some(Self {
                url: format!("{}://{}:{}", scheme, valid_host(host)?, valid_port(port)?),
                username: Some(user.to_string()),
                password: Some(pass.to_string()),
            }),
            _ => None,
        }
    }

    /// `scheme://[user[:pass]@]host[:port]`. A missing port falls back to the
    /// scheme's default.
    fn parse_url(line: &str) -> Option<Self> {
        let u = Url::parse(line).ok()?;
        let scheme = u.scheme();
        if !SUPPORTED_SCHEMES.contains(&scheme) {
            return None;
        }

        let host = u.host_str().filter(|h| !h.is_empty())?;
        let port = u.port().unwrap_or_else(|| default_port(scheme));
        let username = if u.username().is_empty() {
            None
        } else {
            Some(u.username().to_string())
        };

        Some(Self {
            url: format!("{}://{}:{}", scheme, host, port),
            username,
            password: u.password().map(str::to_string),
        })
    }

    pub fn has_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "https" => 443,
        "socks5" | "socks5h" => 1080,
        _ => 80,
    }
}

fn split_host_port(value: &str) -> Option<(&str, u16)> {
    let (host, port) = value.rsplit_once(':')?;
    Some((valid_host(host)?, valid_port(port)?))
}

fn valid_host(host: &str) -> Option<&str> {
    if host.is_empty() || host.contains('/') {
        None
    } else {
        Some(host)
    }
}

fn valid_port(port: &str) -> Option<u16> {
    port.trim_end_matches('/').parse::<u16>().ok().filter(|p| *p != 0)
}
