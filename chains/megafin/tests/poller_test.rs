mod common;

use common::*;
use core_logic::{PrivateKey, RetryConfig, WorkerStats};
use megafin_farmer::headers::{AUTHORIZATION, CHALLENGE_HEADER};
use megafin_farmer::{
    AccountIdentity, AccountPoller, AuthSettings, Authenticator, Balance, FarmError, HeaderSet,
    KeepAlive, ServiceEndpoints, SessionSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type TestPoller = AccountPoller<Arc<ScriptedRequester>, Arc<FixedSolver>, CountingGate>;

fn poller(
    requester: &Arc<ScriptedRequester>,
    solver: &Arc<FixedSolver>,
    gate: &CountingGate,
    max_retries: u32,
) -> TestPoller {
    let key = PrivateKey::parse(TEST_KEY, 1).unwrap();
    let identity = AccountIdentity::from_private_key(&key).unwrap();
    let endpoints = ServiceEndpoints::new(TEST_API, TEST_APP);

    let authenticator = Authenticator::new(
        identity,
        Arc::clone(solver),
        AuthSettings {
            endpoints: endpoints.clone(),
            retry: RetryConfig::new(max_retries, 0),
            ..AuthSettings::default()
        },
    );

    AccountPoller::new(
        format!("001 | {}", TEST_ADDRESS),
        Arc::clone(requester),
        authenticator,
        gate.clone(),
        SessionSettings {
            endpoints,
            keep_alive_interval: Duration::from_secs(120),
            retry: RetryConfig::new(max_retries, 0),
        },
    )
}

fn assert_challenge_only_on_login(requester: &ScriptedRequester) {
    for request in requester.requests() {
        let is_login = request.url.ends_with("/auth");
        assert_eq!(
            request.headers.contains(CHALLENGE_HEADER),
            is_login,
            "unexpected challenge header state on {}",
            request.url
        );
    }
}

#[tokio::test]
async fn test_rejected_profile_relogs_once_inside_one_gate_slot() {
    let requester = ScriptedRequester::new(vec![
        login_ok("first"),
        status(401, r#"{"error":"unauthorized"}"#),
        login_ok("second"),
        balance_ok(1.5, 0.25),
    ]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(1);
    let poller = poller(&requester, &solver, &gate, 0);

    let authenticated = poller
        .authenticate(HeaderSet::browser_defaults(TEST_APP))
        .await
        .unwrap();

    assert_eq!(authenticated.logins, 2);
    assert_eq!(authenticated.session.token(), "second");
    assert_eq!(
        authenticated.balance,
        Balance {
            mgf: 1.5,
            usdc: 0.25
        }
    );

    assert_eq!(requester.requests_to("/auth").len(), 2);
    assert_eq!(solver.calls(), 2);
    assert_eq!(gate.acquired(), 1);
    assert_eq!(gate.released(), 1);
    assert_eq!(gate.available(), 1);

    let checks = requester.requests_to("/users/profile");
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0].headers.get(AUTHORIZATION), Some("Bearer first"));
    assert_eq!(checks[1].headers.get(AUTHORIZATION), Some("Bearer second"));
    assert_challenge_only_on_login(&requester);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_401_reacquires_gate_once() {
    let requester = ScriptedRequester::new(vec![
        login_ok("a"),
        balance_ok(1.0, 0.0),
        balance_ok(2.0, 0.0),
        status(401, "{}"),
        login_ok("b"),
        balance_ok(2.0, 0.0),
    ]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(1);
    let poller = poller(&requester, &solver, &gate, 1);

    // The script runs dry on the keep-alive after the second login
    let err = poller.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, FarmError::RetriesExhausted(_)));

    assert_eq!(gate.acquired(), 2);
    assert_eq!(gate.released(), 2);
    assert_eq!(requester.requests_to("/auth").len(), 2);

    let connects = requester.requests_to("/users/connect");
    assert_eq!(connects[0].headers.get(AUTHORIZATION), Some("Bearer a"));
    assert_eq!(connects[1].headers.get(AUTHORIZATION), Some("Bearer a"));
    assert_eq!(connects[2].headers.get(AUTHORIZATION), Some("Bearer b"));

    // The login after the 401 starts without the old bearer token
    let logins = requester.requests_to("/auth");
    assert!(!logins[1].headers.contains(AUTHORIZATION));
    assert_challenge_only_on_login(&requester);
}

#[tokio::test]
async fn test_intercepted_keep_alive_rotates_user_agent() {
    let requester = ScriptedRequester::new(vec![
        login_ok("tok"),
        balance_ok(0.0, 0.0),
        ok(INTERCEPTED_PAGE),
        status(502, "bad gateway"),
        balance_ok(4.0, 2.0),
    ]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(1);
    let poller = poller(&requester, &solver, &gate, 5);

    let authenticated = poller
        .authenticate(HeaderSet::browser_defaults(TEST_APP))
        .await
        .unwrap();

    match poller.keep_alive(authenticated.session).await.unwrap() {
        KeepAlive::Active(session, balance) => {
            assert_eq!(balance, Balance { mgf: 4.0, usdc: 2.0 });
            assert_eq!(session.token(), "tok");
        }
        KeepAlive::Expired(_) => panic!("session should still be active"),
    }

    let connects = requester.requests_to("/users/connect");
    assert_eq!(connects.len(), 3);
    for pair in connects.windows(2) {
        assert_ne!(pair[0].headers.user_agent(), pair[1].headers.user_agent());
        assert_eq!(pair[1].headers.get(AUTHORIZATION), Some("Bearer tok"));
    }

    // Polling never touches the gate
    assert_eq!(gate.acquired(), 1);
}

#[tokio::test]
async fn test_keep_alive_transport_and_decode_failures_rotate_user_agent() {
    let requester = ScriptedRequester::new(vec![
        login_ok("tok"),
        balance_ok(0.0, 0.0),
        Step::Fail,
        ok("not json"),
        balance_ok(5.0, 1.0),
    ]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(1);
    let poller = poller(&requester, &solver, &gate, 5);

    let authenticated = poller
        .authenticate(HeaderSet::browser_defaults(TEST_APP))
        .await
        .unwrap();

    match poller.keep_alive(authenticated.session).await.unwrap() {
        KeepAlive::Active(session, balance) => {
            assert_eq!(balance, Balance { mgf: 5.0, usdc: 1.0 });
            assert_eq!(session.token(), "tok");
        }
        KeepAlive::Expired(_) => panic!("session should still be active"),
    }

    let connects = requester.requests_to("/users/connect");
    assert_eq!(connects.len(), 3);
    for pair in connects.windows(2) {
        assert_ne!(pair[0].headers.user_agent(), pair[1].headers.user_agent());
    }
    for connect in &connects {
        assert_eq!(connect.headers.get(AUTHORIZATION), Some("Bearer tok"));
    }
    assert_eq!(requester.requests_to("/auth").len(), 1);
    assert_challenge_only_on_login(&requester);
}

#[tokio::test]
async fn test_profile_failures_rotate_user_agent_without_relogin() {
    let requester = ScriptedRequester::new(vec![
        login_ok("tok"),
        Step::Fail,
        ok("not json"),
        balance_ok(2.0, 0.5),
    ]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(1);
    let poller = poller(&requester, &solver, &gate, 5);

    let authenticated = poller
        .authenticate(HeaderSet::browser_defaults(TEST_APP))
        .await
        .unwrap();

    assert_eq!(authenticated.logins, 1);
    assert_eq!(authenticated.balance, Balance { mgf: 2.0, usdc: 0.5 });

    let checks = requester.requests_to("/users/profile");
    assert_eq!(checks.len(), 3);
    for pair in checks.windows(2) {
        assert_ne!(pair[0].headers.user_agent(), pair[1].headers.user_agent());
    }
    for check in &checks {
        assert_eq!(check.headers.get(AUTHORIZATION), Some("Bearer tok"));
    }
    assert_eq!(solver.calls(), 1);
    assert_eq!(gate.released(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_on_cancellation() {
    let requester = ScriptedRequester::new(vec![
        login_ok("tok"),
        balance_ok(1.0, 1.0),
        balance_ok(1.0, 1.0),
    ]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(1);
    let poller = poller(&requester, &solver, &gate, 0);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        canceller.cancel();
    });

    let stats = poller.run(token).await.unwrap();
    assert_eq!(
        stats,
        WorkerStats {
            logins: 1,
            polls: 1,
            relogins: 0
        }
    );
    assert_eq!(requester.remaining(), 0);
    assert_eq!(gate.released(), 1);
}

#[tokio::test]
async fn test_check_balance_reports_profile_balance() {
    let requester = ScriptedRequester::new(vec![login_ok("tok"), balance_ok(3.0, 1.0)]);
    let solver = FixedSolver::new("cf");
    let gate = CountingGate::new(2);
    let poller = poller(&requester, &solver, &gate, 0);

    let balance = poller.check_balance().await.unwrap();
    assert_eq!(balance, Balance { mgf: 3.0, usdc: 1.0 });
    assert_eq!(gate.acquired(), 1);
    assert_eq!(gate.released(), 1);
    assert!(requester.requests_to("/users/connect").is_empty());
}
