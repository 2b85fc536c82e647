#![allow(dead_code)]

use async_trait::async_trait;
use core_logic::{AdmissionGate, ConcurrencyGate, GateError, GatePermit, NetworkError};
use megafin_farmer::transport::Method;
use megafin_farmer::{ChallengeSolver, FarmError, HeaderSet, RawResponse, Request, Requester};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const TEST_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
pub const TEST_API: &str = "http://api.test";
pub const TEST_APP: &str = "http://app.test";

pub const INTERCEPTED_PAGE: &str =
    "<html><head><title>Just a moment...</title></head><body></body></html>";

pub enum Step {
    Respond(u16, String),
    Fail,
}

pub fn ok(body: &str) -> Step {
    Step::Respond(200, body.to_string())
}

pub fn status(code: u16, body: &str) -> Step {
    Step::Respond(code, body.to_string())
}

pub fn login_ok(token: &str) -> Step {
    ok(&format!(r#"{{"result":{{"token":"{}"}}}}"#, token))
}

pub fn balance_ok(mgf: f64, usdc: f64) -> Step {
    ok(&format!(
        r#"{{"result":{{"balance":{{"MGF":{},"USDC":{}}}}}}}"#,
        mgf, usdc
    ))
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Option<serde_json::Value>,
}

/// Replays a fixed script of responses and records every request.
/// An exhausted script behaves like a dead network.
#[derive(Default)]
pub struct ScriptedRequester {
    script: Mutex<VecDeque<Step>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl ScriptedRequester {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            recorded: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn requests_to(&self, suffix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Requester for ScriptedRequester {
    async fn send(
        &self,
        request: &Request,
        headers: &HeaderSet,
    ) -> Result<RawResponse, NetworkError> {
        self.recorded.lock().unwrap().push(Recorded {
            method: request.method,
            url: request.url.clone(),
            headers: headers.clone(),
            body: request.body.clone(),
        });

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(status, body)) => Ok(RawResponse::new(status, body)),
            Some(Step::Fail) => Err(NetworkError::Connection {
                endpoint: request.url.clone(),
                reason: "scripted failure".to_string(),
            }),
            None => Err(NetworkError::Connection {
                endpoint: request.url.clone(),
                reason: "script exhausted".to_string(),
            }),
        }
    }
}

/// Hands out the same token and counts calls.
#[derive(Default)]
pub struct FixedSolver {
    token: String,
    calls: AtomicUsize,
    user_agents: Mutex<Vec<String>>,
}

impl FixedSolver {
    pub fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeSolver for FixedSolver {
    async fn solve(&self, user_agent: &str) -> Result<String, FarmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.user_agents
            .lock()
            .unwrap()
            .push(user_agent.to_string());
        Ok(self.token.clone())
    }
}

/// Real gate plus acquire/release counters.
#[derive(Clone)]
pub struct CountingGate {
    inner: ConcurrencyGate,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl CountingGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ConcurrencyGate::new(capacity),
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.inner.available()
    }
}

pub struct CountingPermit {
    _permit: GatePermit,
    released: Arc<AtomicUsize>,
}

impl Drop for CountingPermit {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AdmissionGate for CountingGate {
    type Permit = CountingPermit;

    async fn acquire(&self) -> Result<CountingPermit, GateError> {
        let permit = self.inner.acquire().await?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(CountingPermit {
            _permit: permit,
            released: Arc::clone(&self.released),
        })
    }
}
