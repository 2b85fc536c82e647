//! Megafin account farmer
//!
//! Keeps a set of wallet accounts logged in to the Megafin node service and
//! pings `/users/connect` on a fixed interval for each of them.
//!
//! - [`transport`] - one HTTP exchange, no retries
//! - [`interception`] - Cloudflare block/challenge page detection
//! - [`headers`] - per-account header set and user-agent pool
//! - [`captcha`] - Turnstile solving through 2captcha
//! - [`auth`] - wallet signature login
//! - [`poller`] - the per-account login/keep-alive state machine

pub mod api;
pub mod auth;
pub mod captcha;
pub mod config;
pub mod error;
pub mod headers;
pub mod interception;
pub mod poller;
pub mod transport;

pub use crate::api::{Balance, ServiceEndpoints};
pub use crate::auth::{AccountIdentity, AuthSettings, Authenticator};
pub use crate::captcha::{ChallengeSettings, ChallengeSolver, TwoCaptchaSolver};
pub use crate::config::MegafinConfig;
pub use crate::error::FarmError;
pub use crate::headers::HeaderSet;
pub use crate::poller::{AccountPoller, KeepAlive, LiveAccountPoller, Session, SessionSettings};
pub use crate::transport::{HttpRequester, RawResponse, Request, Requester};
