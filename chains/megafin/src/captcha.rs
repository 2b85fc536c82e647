//! Turnstile solving through the 2captcha task API.
//!
//! `solve` submits a job, polls it until it is ready and returns the token.
//! A failed submission is resubmitted; a failed poll abandons the job and
//! submits a fresh one. With the default retry policy it never gives up.

use crate::error::FarmError;
use crate::headers::HeaderSet;
use crate::transport::{Request, Requester};
use async_trait::async_trait;
use core_logic::{MetricsCollector, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Returns a solved challenge token bound to `user_agent`.
    async fn solve(&self, user_agent: &str) -> Result<String, FarmError>;
}

#[async_trait]
impl<T: ChallengeSolver + ?Sized> ChallengeSolver for Arc<T> {
    async fn solve(&self, user_agent: &str) -> Result<String, FarmError> {
        (**self).solve(user_agent).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeSettings {
    pub provider_base: String,
    pub task_type: String,
    pub website_url: String,
    pub website_key: String,
    pub soft_id: String,
    pub poll_interval: Duration,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            provider_base: "https://api.2captcha.com".to_string(),
            task_type: "TurnstileTaskProxyless".to_string(),
            website_url: "https://app.megafin.xyz/".to_string(),
            website_key: "0x4AAAAAAA0SGzxWuGl6kriB".to_string(),
            soft_id: "4744".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl ChallengeSettings {
    pub fn create_task_url(&self) -> String {
        format!(
            "{}/createTask?soft_id={}",
            self.provider_base.trim_end_matches('/'),
            self.soft_id
        )
    }

    pub fn task_result_url(&self) -> String {
        format!(
            "{}/getTaskResult?soft_id={}",
            self.provider_base.trim_end_matches('/'),
            self.soft_id
        )
    }
}

/// Provider job id; 2captcha returns a number but strings are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Number(u64),
    Text(String),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Number(n) => write!(f, "{}", n),
            JobId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateTaskPayload<'a> {
    #[serde(rename = "clientKey")]
    client_key: &'a str,
    soft_id: &'a str,
    task: TaskSpec<'a>,
}

#[derive(Debug, Serialize)]
struct TaskSpec<'a> {
    #[serde(rename = "type")]
    task_type: &'a str,
    #[serde(rename = "websiteURL")]
    website_url: &'a str,
    #[serde(rename = "websiteKey")]
    website_key: &'a str,
    #[serde(rename = "userAgent")]
    user_agent: &'a str,
    soft_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TaskResultPayload<'a> {
    #[serde(rename = "clientKey")]
    client_key: &'a str,
    soft_id: &'a str,
    #[serde(rename = "taskId")]
    task_id: &'a JobId,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    #[serde(rename = "errorId", default)]
    error_id: i64,
    #[serde(rename = "taskId", default)]
    task_id: Option<JobId>,
}

#[derive(Debug, Deserialize)]
struct TaskResultResponse {
    #[serde(rename = "errorId", default)]
    error_id: i64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    #[serde(default)]
    token: String,
}

enum PollOutcome {
    Ready(String),
    Abandoned,
}

pub struct TwoCaptchaSolver<R> {
    requester: R,
    api_key: String,
    settings: ChallengeSettings,
    retry: RetryConfig,
    label: String,
}

impl<R: Requester> TwoCaptchaSolver<R> {
    pub fn new(
        requester: R,
        api_key: impl Into<String>,
        settings: ChallengeSettings,
        retry: RetryConfig,
    ) -> Self {
        Self {
            requester,
            api_key: api_key.into(),
            settings,
            retry,
            label: String::new(),
        }
    }

    /// Account label prefixed to log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    async fn create_task(&self, user_agent: &str) -> Result<Option<JobId>, FarmError> {
        let payload = CreateTaskPayload {
            client_key: &self.api_key,
            soft_id: &self.settings.soft_id,
            task: TaskSpec {
                task_type: &self.settings.task_type,
                website_url: &self.settings.website_url,
                website_key: &self.settings.website_key,
                user_agent,
                soft_id: &self.settings.soft_id,
            },
        };
        let request = Request::post_json(self.settings.create_task_url(), &payload)?;

        let response = match self.requester.send(&request, &HeaderSet::new()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(target: "farm_event", "{} | Error Sending Request When Create Task: {}", self.label, e);
                return Ok(None);
            }
        };

        let parsed: CreateTaskResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(target: "farm_event", "{} | Error Decoding Create Task Response: {} | {}", self.label, e, response.snippet(256));
                return Ok(None);
            }
        };

        match parsed.task_id {
            Some(task_id) if parsed.error_id == 0 => Ok(Some(task_id)),
            _ => {
                warn!(target: "farm_event", "{} | Error in Response When Create Task: {}", self.label, response.snippet(256));
                Ok(None)
            }
        }
    }

    async fn poll_task(&self, task_id: &JobId) -> Result<PollOutcome, FarmError> {
        let payload = TaskResultPayload {
            client_key: &self.api_key,
            soft_id: &self.settings.soft_id,
            task_id,
        };
        let request = Request::post_json(self.settings.task_result_url(), &payload)?;
        let headers = HeaderSet::new();

        loop {
            let response = match self.requester.send(&request, &headers).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(target: "farm_event", "{} | Error Sending Request When Get Task Result: {}", self.label, e);
                    return Ok(PollOutcome::Abandoned);
                }
            };

            let parsed: TaskResultResponse = match serde_json::from_slice(&response.body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(target: "farm_event", "{} | Error Decoding Task Result: {} | {}", self.label, e, response.snippet(256));
                    return Ok(PollOutcome::Abandoned);
                }
            };

            if parsed.error_id != 0 {
                warn!(target: "farm_event", "{} | Error in Response When Get Task Result: {}", self.label, response.snippet(256));
                return Ok(PollOutcome::Abandoned);
            }

            if parsed.status == "ready" {
                return match parsed.solution.map(|s| s.token).filter(|t| !t.is_empty()) {
                    Some(token) => Ok(PollOutcome::Ready(token)),
                    None => {
                        warn!(target: "farm_event", "{} | Task {} ready without a token", self.label, task_id);
                        Ok(PollOutcome::Abandoned)
                    }
                };
            }

            info!(
                target: "farm_event",
                "{} | Captcha is still processing... Sleeping {} secs.",
                self.label,
                self.settings.poll_interval.as_secs()
            );
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl<R: Requester> ChallengeSolver for TwoCaptchaSolver<R> {
    async fn solve(&self, user_agent: &str) -> Result<String, FarmError> {
        let started = Instant::now();
        let mut budget = self.retry.budget("challenge solving");

        loop {
            let Some(task_id) = self.create_task(user_agent).await? else {
                budget.backoff().await?;
                continue;
            };
            debug!("{} | Created challenge task {}", self.label, task_id);

            match self.poll_task(&task_id).await? {
                PollOutcome::Ready(token) => {
                    MetricsCollector::global().record_challenge_solved(started.elapsed());
                    return Ok(token);
                }
                PollOutcome::Abandoned => {
                    MetricsCollector::global().record_challenge_abandoned();
                    budget.backoff().await?;
                }
            }
        }
    }
}
