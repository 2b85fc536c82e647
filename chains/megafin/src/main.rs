use megafin_farmer::{
    AccountIdentity, AccountPoller, Authenticator, Balance, HttpRequester, LiveAccountPoller,
    MegafinConfig, TwoCaptchaSolver,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use core_logic::{
    setup_logger, ConcurrencyGate, PrivateKey, ProxyConfig, ProxyManager, WalletManager, Worker,
    WorkerRunner, FARM_EVENT_TARGET,
};
use dotenv::dotenv;
use rand::seq::SliceRandom;
use tokio::task::JoinSet;
use tracing::{error, info, Instrument};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    /// Keep every account logged in and pinging (default)
    #[default]
    Farm,
    /// Log in once per account and print MGF/USDC balances
    Balances,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);

    let config = match MegafinConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Ok(());
        }
    };

    let manager = match WalletManager::load(&config.accounts_file) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to load accounts: {:#}", e);
            return Ok(());
        }
    };
    let total_accounts = manager.count();
    info!("Found {} accounts.", total_accounts);

    let proxies = ProxyManager::load_proxies(&config.proxies_file)?;
    if !proxies.is_empty() {
        info!("Loaded {} proxies for rotation.", proxies.len());
    }

    let gate = ConcurrencyGate::new(config.max_concurrent_logins);
    let solver_client = HttpRequester::new(None, config.request_timeout())?;

    let mut indices: Vec<usize> = (0..total_accounts).collect();
    if config.shuffle_accounts {
        indices.shuffle(&mut rand::thread_rng());
    }
    let max_workers = config
        .worker_amount
        .unwrap_or(total_accounts)
        .min(total_accounts);

    info!(
        "Starting {} accounts (Available: {}, Configured limit: {:?}, Concurrent logins: {})",
        max_workers,
        total_accounts,
        config.worker_amount,
        gate.capacity()
    );

    let mut pollers = Vec::with_capacity(max_workers);
    for &index in indices.iter().take(max_workers) {
        match build_poller(
            &config,
            &manager.keys()[index],
            index,
            &proxies,
            &gate,
            &solver_client,
        ) {
            Ok(poller) => pollers.push(poller),
            Err(e) => {
                error!(target: FARM_EVENT_TARGET, "{:03} | FAILED to set up account: {:#}", index + 1, e);
            }
        }
    }

    match args.command.unwrap_or_default() {
        Command::Farm => {
            let workers: Vec<Box<dyn Worker>> = pollers
                .into_iter()
                .map(|p| Box::new(p) as Box<dyn Worker>)
                .collect();
            WorkerRunner::run_workers(workers).await?;
        }
        Command::Balances => check_balances(pollers).await,
    }

    Ok(())
}

fn build_poller(
    config: &MegafinConfig,
    key: &PrivateKey,
    index: usize,
    proxies: &[ProxyConfig],
    gate: &ConcurrencyGate,
    solver_client: &HttpRequester,
) -> Result<LiveAccountPoller> {
    let identity = AccountIdentity::from_private_key(key)?;
    let label = format!("{:03} | {}", index + 1, identity.address_checksum());

    let proxy = ProxyManager::assign(proxies, index);
    if let Some(p) = &proxy {
        info!("{} | Assigned proxy {}", label, p.url);
    }
    let site_client = HttpRequester::new(proxy.as_ref(), config.request_timeout())?;

    // The solver never goes through the account proxy
    let solver = TwoCaptchaSolver::new(
        solver_client.clone(),
        config.twocaptcha_api_key.clone(),
        config.challenge_settings(),
        config.retry_config(),
    )
    .with_label(label.clone());
    let authenticator = Authenticator::new(identity, solver, config.auth_settings());

    Ok(AccountPoller::new(
        label,
        site_client,
        authenticator,
        gate.clone(),
        config.session_settings(),
    ))
}

async fn check_balances(pollers: Vec<LiveAccountPoller>) {
    let mut set = JoinSet::new();

    for (i, poller) in pollers.into_iter().enumerate() {
        let span = tracing::info_span!("worker", worker_id = format!("{:03}", i + 1));
        set.spawn(
            async move {
                let result = poller.check_balance().await;
                (poller.label().to_string(), result)
            }
            .instrument(span),
        );
    }

    let mut total = Balance::default();
    let mut checked = 0usize;

    while let Some(res) = set.join_next().await {
        match res {
            Ok((_, Ok(balance))) => {
                total = total + balance;
                checked += 1;
            }
            Ok((label, Err(e))) => {
                error!(target: FARM_EVENT_TARGET, "{} | FAILED balance check: {}", label, e);
            }
            Err(e) => error!("A balance task panicked or failed to join: {:?}", e),
        }
    }

    info!(
        target: FARM_EVENT_TARGET,
        "Checked {} accounts | Total MGF Balance: {:.6} | Total USDC Balance: {:.6}",
        checked,
        total.mgf,
        total.usdc
    );
}
