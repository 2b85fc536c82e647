//! Per-account request headers.
//!
//! A [`HeaderSet`] belongs to exactly one account and is passed by value
//! through login, probing and keep-alive calls. Names are stored lowercase.

use rand::seq::SliceRandom;
use std::collections::BTreeMap;

pub const USER_AGENT: &str = "user-agent";
pub const AUTHORIZATION: &str = "authorization";
/// Single-use challenge token header, only ever sent with the login request.
pub const CHALLENGE_HEADER: &str = "x-recaptcha-response";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36 OPR/115.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 YaBrowser/24.10.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Picks a user agent different from `current`.
fn next_user_agent(current: &str) -> &'static str {
    let candidates: Vec<&'static str> = USER_AGENTS
        .iter()
        .copied()
        .filter(|ua| *ua != current)
        .collect();
    candidates
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    headers: BTreeMap<String, String>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers of a browser tab on the web app, with a random user agent.
    pub fn browser_defaults(app_origin: &str) -> Self {
        let mut set = Self::new();
        set.set("accept", "*/*");
        set.set("accept-language", "ru,en;q=0.9,vi;q=0.8,es;q=0.7,cy;q=0.6");
        set.set("origin", app_origin);
        set.set("referer", app_origin);
        set.set("connection", "close");
        set.set(USER_AGENT, random_user_agent());
        set
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn user_agent(&self) -> &str {
        self.get(USER_AGENT).unwrap_or_default()
    }

    /// Swaps in a different user agent. Called on every retry-triggering failure.
    pub fn rotate_user_agent(&mut self) {
        let next = next_user_agent(self.user_agent());
        self.set(USER_AGENT, next);
    }

    pub fn with_challenge(mut self, token: impl Into<String>) -> Self {
        self.set(CHALLENGE_HEADER, token);
        self
    }

    pub fn without_challenge(mut self) -> Self {
        self.remove(CHALLENGE_HEADER);
        self
    }

    pub fn has_challenge(&self) -> bool {
        self.contains(CHALLENGE_HEADER)
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.set(AUTHORIZATION, format!("Bearer {}", token));
        self
    }

    pub fn without_bearer(mut self) -> Self {
        self.remove(AUTHORIZATION);
        self
    }
}
