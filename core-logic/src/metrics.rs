use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_secs: u64,
    pub sessions: SessionMetrics,
    pub requests: RequestMetrics,
    pub challenges: ChallengeMetrics,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionMetrics {
    pub logins: u64,
    pub reauthentications: u64,
    pub keep_alives: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestMetrics {
    pub transient_failures: u64,
    pub interceptions: u64,
    pub decode_failures: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChallengeMetrics {
    pub solved: u64,
    pub jobs_abandoned: u64,
    pub avg_solve_ms: f64,
}

/// Process-wide counters. Observational only: nothing reads them to make a
/// decision.
#[derive(Debug)]
pub struct MetricsCollector {
    logins: AtomicU64,
    reauthentications: AtomicU64,
    keep_alives: AtomicU64,
    transient_failures: AtomicU64,
    interceptions: AtomicU64,
    decode_failures: AtomicU64,
    challenges_solved: AtomicU64,
    challenges_abandoned: AtomicU64,
    challenge_solve_sum_ms: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            logins: AtomicU64::new(0),
            reauthentications: AtomicU64::new(0),
            keep_alives: AtomicU64::new(0),
            transient_failures: AtomicU64::new(0),
            interceptions: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            challenges_solved: AtomicU64::new(0),
            challenges_abandoned: AtomicU64::new(0),
            challenge_solve_sum_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl MetricsCollector {
    pub fn global() -> &'static Self {
        static INSTANCE: std::sync::OnceLock<MetricsCollector> = std::sync::OnceLock::new();
        INSTANCE.get_or_init(MetricsCollector::default)
    }

    pub fn record_login(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reauthentication(&self) {
        self.reauthentications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_keep_alive(&self) {
        self.keep_alives.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interception(&self) {
        self.interceptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_challenge_solved(&self, took: Duration) {
        self.challenges_solved.fetch_add(1, Ordering::Relaxed);
        self.challenge_solve_sum_ms
            .fetch_add(took.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_challenge_abandoned(&self) {
        self.challenges_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let solved = self.challenges_solved.load(Ordering::Relaxed);
        let solve_sum = self.challenge_solve_sum_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_secs: self.uptime().as_secs(),
            sessions: SessionMetrics {
                logins: self.logins.load(Ordering::Relaxed),
                reauthentications: self.reauthentications.load(Ordering::Relaxed),
                keep_alives: self.keep_alives.load(Ordering::Relaxed),
            },
            requests: RequestMetrics {
                transient_failures: self.transient_failures.load(Ordering::Relaxed),
                interceptions: self.interceptions.load(Ordering::Relaxed),
                decode_failures: self.decode_failures.load(Ordering::Relaxed),
            },
            challenges: ChallengeMetrics {
                solved,
                jobs_abandoned: self.challenges_abandoned.load(Ordering::Relaxed),
                avg_solve_ms: if solved > 0 {
                    solve_sum as f64 / solved as f64
                } else {
                    0.0
                },
            },
        }
    }

    pub fn to_compact_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
