//! Liquidation bot for an Aave-V3-style lending protocol on a low-latency L2.
//!
//! Wires together the real-time pipeline: candidate store, HF resolver,
//! predictive signal gate and queue manager, scan registry, profit engine,
//! execution path, and priority sweep. When the RPC/signing environment is
//! fully configured, also builds the chain-side adapters (`src/adapters.rs`)
//! and drives the live event loop; otherwise it bootstraps components only,
//! so the binary stays runnable against partial configuration (e.g. in CI).

mod adapters;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_chain::protocol::{
    AaveV3ConfigBuilder, LendingProtocol, LiquidatableProtocol, LiquidationCallParams,
    ProtocolFactory,
};
use liquidator_chain::{ChainCandidateSource, EventListener, ObservedBorrowers, ProviderManager, TransactionSender};

use liquidator_core::candidates::{CandidateOrigin, CandidateStore, CandidateStoreConfig, LowHfMode, LowHfTracker, WatchSet};
use liquidator_core::execution::{
    CriticalLane, CriticalLaneConfig, GasControls, GasControlsConfig, IntentCache, IntentCacheConfig,
    PriceHotCache, PriceHotCacheConfig,
};
use liquidator_core::predictive::{
    GateConfig, PredictiveGate, PredictiveQueueManager, QueueConfig, SignalKind, SignalTracker,
    DEFAULT_PRUNE_MAX_AGE_MS,
};
use liquidator_core::priority_sweep::{PrioritySweep, PrioritySweepConfig};
use liquidator_core::profit::{self, PositionReserve, ProfitConfig};
use liquidator_core::resolver::{Resolver, ResolverConfig};
use liquidator_core::scan_registry::{self, ScanRegistry, ScanRegistryConfig};
use liquidator_core::types::ReserveMeta;
use liquidator_core::{AssetRegistry, BotConfig, HeartbeatPredictor, ASSETS};

use liquidator_chain::events::{
    backfill, decode_event, AlloyLogFetcher, BackfillConfig, HeartbeatWatchdog, ReconnectBackoff,
};
use liquidator_chain::rpc::{RpcClient, RpcClientConfig};

use adapters::{
    build_critical_event, CandidateSourcePageSource, DualEndpointTxSubmitter, ProtocolHfSource,
    ProtocolReverifier,
};

mod env {
    pub const ALCHEMY_WS_URL: &str = "ALCHEMY_WS_URL";
    pub const ALCHEMY_HTTP_URL: &str = "ALCHEMY_HTTP_URL";
    pub const ARCHIVE_RPC_URL: &str = "ARCHIVE_RPC_URL";
    pub const SECONDARY_HTTP_URL: &str = "SECONDARY_HTTP_URL";
    pub const SEND_RPC: &str = "SEND_RPC";
    pub const PRIVATE_RELAY_RPC: &str = "PRIVATE_RELAY_RPC";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const PROFIT_RECEIVER: &str = "PROFIT_RECEIVER";
    pub const POOL: &str = "POOL";
    pub const BALANCES_READER: &str = "BALANCES_READER";
    pub const ORACLE: &str = "ORACLE";
    pub const LIQUIDATOR: &str = "LIQUIDATOR";
    pub const CHAIN_ID: &str = "CHAIN_ID";
}

/// Holds the pipeline components constructed at startup, independent of
/// whether a live chain connection is available.
struct Pipeline {
    assets: Arc<AssetRegistry>,
    candidates: Arc<CandidateStore>,
    low_hf: Arc<LowHfTracker>,
    scan_registry: Arc<ScanRegistry>,
    gate: Arc<PredictiveGate>,
    queue: Arc<PredictiveQueueManager>,
    signal_tracker: Arc<SignalTracker>,
    intent_cache: Arc<IntentCache>,
    price_cache: Arc<PriceHotCache>,
    gas_controls: Arc<GasControls>,
    profit_config: ProfitConfig,
    priority_sweep_config: PrioritySweepConfig,
    heartbeat: Arc<HeartbeatPredictor>,
    shutdown: Arc<AtomicBool>,
}

fn build_pipeline() -> Pipeline {
    let assets = Arc::new(AssetRegistry::new());
    info!(asset_count = ASSETS.len(), "asset registry loaded");

    Pipeline {
        assets,
        candidates: Arc::new(CandidateStore::new(CandidateStoreConfig::default())),
        low_hf: Arc::new(LowHfTracker::new(LowHfMode::Min, 5_000, 1.1)),
        scan_registry: Arc::new(ScanRegistry::new(ScanRegistryConfig::default())),
        gate: Arc::new(PredictiveGate::new(GateConfig::default())),
        queue: Arc::new(PredictiveQueueManager::new(QueueConfig::default())),
        signal_tracker: Arc::new(SignalTracker::new()),
        intent_cache: Arc::new(IntentCache::new(IntentCacheConfig::default())),
        price_cache: Arc::new(PriceHotCache::new(PriceHotCacheConfig::default())),
        gas_controls: Arc::new(GasControls::new(GasControlsConfig::default())),
        profit_config: ProfitConfig::default(),
        priority_sweep_config: PrioritySweepConfig::default(),
        heartbeat: Arc::new(HeartbeatPredictor::new()),
        shutdown: Arc::new(AtomicBool::new(false)),
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Everything needed to drive the live event loop against a real chain
/// connection. Kept separate from `Pipeline` so component bootstrap always
/// succeeds even when the RPC/signing env is incomplete.
struct ChainAdapters {
    protocol: Arc<liquidator_chain::protocol::AaveV3Protocol>,
    resolver: Arc<Resolver<ProtocolHfSource<liquidator_chain::protocol::AaveV3Protocol>>>,
    critical_lane:
        Arc<CriticalLane<ProtocolReverifier<liquidator_chain::protocol::AaveV3Protocol>, DualEndpointTxSubmitter>>,
    priority_sweep: Arc<PrioritySweep<CandidateSourcePageSource>>,
    event_listener: Arc<EventListener>,
    observed: Arc<ObservedBorrowers>,
    provider: ProviderManager,
}

/// §4.1 "Backfill algorithm": seed the candidate store from `BackfillConfig`'s
/// window of historical pool logs before the live event/resolver loops start.
/// Backfill draws from the same budgeted `RpcClient` as any other chain read
/// rather than a second, unbudgeted path, and a failure here is logged and
/// skipped rather than fatal — the bot still tracks borrowers going forward
/// from the live event stream and priority sweep.
async fn run_startup_backfill(
    provider: &ProviderManager,
    http_url: &str,
    archive_url: &str,
    pool: Address,
    candidates: &Arc<CandidateStore>,
) {
    let current_block = match provider.block_number().await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "could not read current block for backfill; skipping");
            return;
        }
    };

    let rpc = RpcClient::new(vec![http_url.to_string(), archive_url.to_string()], RpcClientConfig::default());
    let fetcher = AlloyLogFetcher::new(rpc, vec![pool]);

    match backfill(&fetcher, current_block, BackfillConfig::default()).await {
        Ok(logs) => {
            let oracle_map = dashmap::DashMap::new();
            let mut seeded = 0usize;
            for log in &logs {
                if let Some(event) = decode_event(log, &oracle_map) {
                    for user in event.affected_users() {
                        candidates.upsert(user, CandidateOrigin::Backfill, now_ms());
                        seeded += 1;
                    }
                }
            }
            info!(logs = logs.len(), seeded, current_block, "startup backfill complete");
        }
        Err(e) => warn!(error = %e, "startup backfill failed; continuing with event-driven tracking only"),
    }
}

/// Attempt to build the chain-side wiring from the process environment.
/// Returns `None` (with an explanatory log) rather than erroring, so a
/// partially-configured environment still runs in component-bootstrap mode.
async fn try_build_chain_adapters(candidates: Arc<CandidateStore>) -> Option<ChainAdapters> {
    let ws_url = std::env::var(env::ALCHEMY_WS_URL).ok()?;
    let http_url = std::env::var(env::ALCHEMY_HTTP_URL).ok()?;
    let archive_url = std::env::var(env::ARCHIVE_RPC_URL).unwrap_or_else(|_| http_url.clone());
    let send_url = std::env::var(env::SEND_RPC).ok()?;
    let private_key = std::env::var(env::PRIVATE_KEY).ok()?;
    let pool: Address = std::env::var(env::POOL).ok()?.parse().ok()?;
    let balances_reader: Address = std::env::var(env::BALANCES_READER).ok()?.parse().ok()?;
    let liquidator_contract: Address = std::env::var(env::LIQUIDATOR).ok()?.parse().ok()?;
    let oracle: Option<Address> = std::env::var(env::ORACLE).ok().and_then(|s| s.parse().ok());
    let chain_id: u64 = std::env::var(env::CHAIN_ID).ok().and_then(|s| s.parse().ok()).unwrap_or(1);

    let provider = match ProviderManager::new(&http_url, &archive_url, &send_url, &ws_url, pool, balances_reader).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "failed to initialize provider manager; staying in component-bootstrap mode");
            return None;
        }
    };

    let public_sender = match TransactionSender::new(&private_key, &send_url, chain_id).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            warn!(error = %e, "failed to initialize transaction sender; staying in component-bootstrap mode");
            return None;
        }
    };
    let private_sender = match std::env::var(env::PRIVATE_RELAY_RPC) {
        Ok(url) => TransactionSender::new(&private_key, &url, chain_id).await.ok().map(Arc::new),
        Err(_) => None,
    };

    let protocol_config = AaveV3ConfigBuilder::new("aave-v3")
        .chain_id(chain_id)
        .pool_address(pool)
        .balances_reader_address(balances_reader)
        .liquidator_address(liquidator_contract)
        .close_factor(0.5)
        .default_liquidation_bonus_bps(500);
    let protocol_config = match oracle {
        Some(addr) => protocol_config.oracle_address(addr),
        None => protocol_config,
    }
    .build();

    let factory = ProtocolFactory::new();
    let provider_arc = Arc::new(provider.clone());
    let protocol = Arc::new(factory.create_aave_v3_with_sender(protocol_config, provider_arc, public_sender.clone()));

    let secondary_protocol = match std::env::var(env::SECONDARY_HTTP_URL) {
        Ok(url) => match ProviderManager::new(&url, &url, &send_url, &ws_url, pool, balances_reader).await {
            Ok(secondary_provider) => {
                let cfg = AaveV3ConfigBuilder::new("aave-v3-secondary")
                    .chain_id(chain_id)
                    .pool_address(pool)
                    .balances_reader_address(balances_reader)
                    .liquidator_address(liquidator_contract)
                    .build();
                Some(Arc::new(factory.create_aave_v3_from_config(cfg, Arc::new(secondary_provider))))
            }
            Err(e) => {
                warn!(error = %e, "secondary RPC configured but unreachable; resolver will run unhedged");
                None
            }
        },
        Err(_) => None,
    };

    run_startup_backfill(&provider, &http_url, &archive_url, pool, &candidates).await;

    let hf_source = Arc::new(ProtocolHfSource::new(protocol.clone(), secondary_protocol));
    let resolver = Arc::new(Resolver::new(candidates, hf_source, ResolverConfig::default()));

    let reverifier = ProtocolReverifier::new(protocol.clone());
    let submitter = DualEndpointTxSubmitter::new(Some(public_sender), private_sender);
    let critical_lane = Arc::new(CriticalLane::new(reverifier, submitter, CriticalLaneConfig::default()));

    let observed = Arc::new(ObservedBorrowers::new());
    let candidate_source = Arc::new(ChainCandidateSource::new(provider.clone(), observed.clone()));
    let priority_sweep = Arc::new(PrioritySweep::new(
        CandidateSourcePageSource::new(candidate_source),
        PrioritySweepConfig::default(),
    ));

    let oracle_configs = match oracle {
        Some(addr) => vec![(addr, Address::ZERO, liquidator_chain::OracleType::Standard)],
        None => Vec::new(),
    };
    let event_listener = Arc::new(EventListener::new(ws_url, pool, oracle_configs));

    Some(ChainAdapters {
        protocol,
        resolver,
        critical_lane,
        priority_sweep,
        event_listener,
        observed,
        provider,
    })
}

/// Refetch a user's position and run the profit engine against it. Returns
/// `None` when the position isn't profitable to liquidate (dust, no eligible
/// asset pair, or net below `minProfitUsd`) rather than surfacing an error —
/// this is normal control flow on the hot path, logged at debug.
async fn simulate_profitable_liquidation(
    protocol: &liquidator_chain::protocol::AaveV3Protocol,
    user: Address,
    profit_config: &ProfitConfig,
) -> Option<(LiquidationCallParams, profit::ProfitSimulation)> {
    let position = match protocol.get_position(user).await {
        Ok(p) => p,
        Err(e) => {
            warn!(%user, error = %e, "position refetch failed ahead of profit simulation");
            return None;
        }
    };

    let reserves: Vec<PositionReserve> = position
        .collaterals
        .iter()
        .map(|c| PositionReserve {
            meta: ReserveMeta {
                asset: c.asset,
                symbol: String::new(),
                decimals: c.decimals,
                liquidation_threshold_bps: c.liquidation_threshold_bps,
                liquidation_bonus_bps: 500,
                is_active: true,
                is_frozen: false,
                price_base: c.price,
                usage_as_collateral_enabled: c.enabled,
            },
            user: liquidator_core::types::UserReserve {
                a_token_balance: c.balance,
                variable_debt: U256::ZERO,
                stable_debt: U256::ZERO,
                used_as_collateral: c.enabled,
            },
        })
        .chain(position.debts.iter().map(|d| PositionReserve {
            meta: ReserveMeta {
                asset: d.asset,
                symbol: String::new(),
                decimals: d.decimals,
                liquidation_threshold_bps: 0,
                liquidation_bonus_bps: 0,
                is_active: true,
                is_frozen: false,
                price_base: d.price,
                usage_as_collateral_enabled: false,
            },
            user: liquidator_core::types::UserReserve {
                a_token_balance: U256::ZERO,
                variable_debt: d.balance,
                stable_debt: U256::ZERO,
                used_as_collateral: false,
            },
        }))
        .collect();

    match profit::simulate(&reserves, profit_config) {
        Ok(sim) if sim.is_profitable(profit_config.min_profit_usd) => {
            let params = LiquidationCallParams {
                user,
                collateral_asset: sim.collateral_asset,
                debt_asset: sim.debt_asset,
                debt_to_cover: sim.repay,
                min_collateral_out: sim.seize,
                swap_data: None,
                receive_atoken: false,
            };
            Some((params, sim))
        }
        Ok(sim) => {
            debug!(%user, net = %sim.net, "liquidation simulated but below minProfitUsd");
            None
        }
        Err(e) => {
            debug!(%user, error = %e, "liquidation not profitable");
            None
        }
    }
}

/// Periodically runs the resolver's paged HF cycle, feeding liquidatable
/// candidates into the critical lane over a bounded channel.
async fn run_resolver_loop(
    chain: Arc<ChainAdapters>,
    scan_registry: Arc<ScanRegistry>,
    low_hf: Arc<LowHfTracker>,
    profit_config: ProfitConfig,
    execution_hf_threshold: f64,
    shutdown: Arc<AtomicBool>,
) {
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);

    let consumer_chain = chain.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let result = consumer_chain.critical_lane.handle(event).await;
            debug!(outcome = ?result.outcome, "critical lane event handled");
        }
    });

    let mut interval = tokio::time::interval(Duration::from_millis(900));
    while !shutdown.load(Ordering::Relaxed) {
        interval.tick().await;
        let block = chain.provider.block_number().await.unwrap_or(0);
        let key = scan_registry::scan_key("head", "resolver", block, "cycle");
        if scan_registry.acquire(&key, now_ms()).is_err() {
            continue;
        }

        let resolutions = chain.resolver.run_cycle(now_ms()).await;
        for resolution in &resolutions {
            low_hf.observe(resolution.address, resolution.hf, resolution.block);
            if resolution.hf >= execution_hf_threshold {
                continue;
            }
            info!(user = %resolution.address, hf = resolution.hf, "candidate below execution threshold");
            let Some((params, _sim)) =
                simulate_profitable_liquidation(&chain.protocol, resolution.address, &profit_config).await
            else {
                continue;
            };
            match build_critical_event(
                chain.protocol.as_ref(),
                resolution.address,
                resolution.hf,
                block,
                resolution.block,
                &params,
            ) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        warn!("critical lane channel closed; dropping event");
                    }
                }
                Err(e) => warn!(user = %resolution.address, error = %e, "failed to build critical event"),
            }
        }

        scan_registry.release(&key, now_ms());
        scan_registry.cleanup_expired(now_ms());
    }
}

/// Subscribes to pool events and marks every affected user dirty in the
/// candidate store so the next resolver cycle re-evaluates them immediately.
///
/// Wraps the subscription in the §4.1 failure semantics: a closed or stalled
/// (no message within 2x the 15s heartbeat) stream triggers a reconnect with
/// capped exponential backoff rather than silently starving candidate input.
async fn run_event_ingest(chain: Arc<ChainAdapters>, candidates: Arc<CandidateStore>, shutdown: Arc<AtomicBool>) {
    let mut backoff = ReconnectBackoff::capped_at_60s();
    while !shutdown.load(Ordering::Relaxed) {
        let mut stream = match chain.event_listener.subscribe_pool_events().await {
            Ok(s) => {
                backoff.reset();
                s
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(error = %e, delay_ms = delay.as_millis() as u64, "pool event subscription failed; reconnecting");
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let watchdog = HeartbeatWatchdog::default_15s();
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            tokio::select! {
                item = stream.next() => match item {
                    Some(event) => {
                        watchdog.touch();
                        let user = event.user();
                        candidates.upsert(user, CandidateOrigin::Event, now_ms());
                        chain.observed.observe(user);
                    }
                    None => {
                        warn!("pool event stream ended; reconnecting");
                        break;
                    }
                },
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    if watchdog.is_stale() {
                        warn!(age_secs = watchdog.age().as_secs(), "pool event heartbeat stale; forcing reconnect");
                        break;
                    }
                }
            }
        }
    }
}

/// Convert an on-chain 8-decimal price (the standard Chainlink/`AnswerUpdated`
/// scale this bot's oracle adapters report in) to `f64` for the signal
/// tracker's delta-pct math. Only used on the predictive path, never on the
/// profit engine's exact-integer decision path.
fn price_to_f64(price: U256) -> f64 {
    let raw: u128 = price.try_into().unwrap_or(u128::MAX);
    raw as f64 / 1e8
}

/// Data flow §2: "Oracle events → Predictive Gate → Queue Mgr → HF Resolver".
/// Subscribes to oracle transmissions, updates the per-asset signal tracker,
/// and for every watch-set member (hot tier ∪ near-band low-HF entries) runs
/// the four-gate admission filter; an accepted evaluation marks the
/// candidate dirty so the very next resolver cycle re-checks it ahead of its
/// own cadence, exactly the fast-path this component exists to provide.
async fn run_predictive_loop(
    chain: Arc<ChainAdapters>,
    candidates: Arc<CandidateStore>,
    low_hf: Arc<LowHfTracker>,
    gate: Arc<PredictiveGate>,
    queue: Arc<PredictiveQueueManager>,
    signal_tracker: Arc<SignalTracker>,
    shutdown: Arc<AtomicBool>,
) {
    let mut stream = match chain.event_listener.subscribe_oracle_updates().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "oracle update subscription failed; predictive gate disabled");
            return;
        }
    };

    while !shutdown.load(Ordering::Relaxed) {
        let update = match stream.next().await {
            Some(u) => u,
            None => {
                warn!("oracle update stream ended; reconnect handled by the caller's next subscribe attempt");
                break;
            }
        };

        let now = now_ms();
        let kind = match update.oracle_type {
            liquidator_chain::OracleType::Pyth => SignalKind::Pyth,
            _ => SignalKind::Chainlink,
        };
        let signal = signal_tracker.observe(update.asset, price_to_f64(update.price), kind, now);

        let watch = WatchSet::compute(&candidates, &low_hf);
        let block = update.block_number;
        for user in watch.iter() {
            let Some(candidate) = candidates.get(user) else { continue };
            let ctx = liquidator_core::predictive::UserContext {
                hf_current: candidate.last_hf,
                hf_projected: None,
                eta_sec: None,
                debt_usd: candidate.last_debt_usd,
            };
            let Ok(outcome) = gate.evaluate(update.asset, &signal, &ctx) else { continue };

            let user_key = format!("{:#x}", user);
            if queue.should_evaluate(&user_key, "baseline", block, now).is_err() {
                continue;
            }
            queue.mark_evaluated(&user_key, "baseline", block, now);
            queue.increment_calls(1);
            candidates.upsert(*user, CandidateOrigin::Predictive, now);
            info!(user = %user, source = ?outcome.source, asset = %update.asset, "predictive gate admitted re-evaluation");
        }

        queue.prune_stale(now, DEFAULT_PRUNE_MAX_AGE_MS);
    }
}

/// Periodically re-scores the full borrower population and seeds its
/// top entries into the candidate store as `Priority` origin.
async fn run_priority_sweep_loop(chain: Arc<ChainAdapters>, candidates: Arc<CandidateStore>, shutdown: Arc<AtomicBool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(15 * 60));
    while !shutdown.load(Ordering::Relaxed) {
        interval.tick().await;
        let cancel = AtomicBool::new(false);
        match chain.priority_sweep.run(&cancel).await {
            Ok((set, summary)) => {
                info!(
                    version = set.version,
                    selected = summary.selected,
                    seen = summary.seen,
                    duration_ms = summary.duration_ms,
                    "priority sweep published"
                );
                for entry in &set.users {
                    candidates.upsert(entry.user, CandidateOrigin::Priority, now_ms());
                    candidates.record_debt_usd(entry.user, entry.debt_usd);
                }
            }
            Err(e) => warn!(error = %e, "priority sweep failed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,liquidator_core=debug,liquidator_chain=debug")),
        )
        .init();

    let bot_config = BotConfig::from_env();
    bot_config.log_config();

    info!("starting liquidation bot");

    let profit_receiver = std::env::var(env::PROFIT_RECEIVER).ok();
    if profit_receiver.is_none() {
        info!("PROFIT_RECEIVER not set; liquidation proceeds would remain in the liquidator contract");
    }

    let pipeline = build_pipeline();
    info!(
        candidates = pipeline.candidates.len(),
        revalidation_bps = pipeline.intent_cache.revalidation_bps(),
        min_profit_usd = %pipeline.profit_config.min_profit_usd,
        sweep_target_size = pipeline.priority_sweep_config.target_size,
        "pipeline components bootstrapped"
    );
    let _ = (&pipeline.assets, &pipeline.price_cache, &pipeline.gas_controls, &pipeline.heartbeat);

    match try_build_chain_adapters(pipeline.candidates.clone()).await {
        Some(chain) => {
            let chain = Arc::new(chain);
            info!("chain adapters initialized; starting live event loop");

            let execution_hf_threshold = bot_config.tiers.critical_hf_threshold;
            let resolver_task = tokio::spawn(run_resolver_loop(
                chain.clone(),
                pipeline.scan_registry.clone(),
                pipeline.low_hf.clone(),
                pipeline.profit_config.clone(),
                execution_hf_threshold,
                pipeline.shutdown.clone(),
            ));
            let ingest_task =
                tokio::spawn(run_event_ingest(chain.clone(), pipeline.candidates.clone(), pipeline.shutdown.clone()));
            let sweep_task =
                tokio::spawn(run_priority_sweep_loop(chain.clone(), pipeline.candidates.clone(), pipeline.shutdown.clone()));
            let predictive_task = tokio::spawn(run_predictive_loop(
                chain.clone(),
                pipeline.candidates.clone(),
                pipeline.low_hf.clone(),
                pipeline.gate.clone(),
                pipeline.queue.clone(),
                pipeline.signal_tracker.clone(),
                pipeline.shutdown.clone(),
            ));

            tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            info!("shutdown signal received");
            pipeline.shutdown.store(true, Ordering::Relaxed);
            let _ = tokio::join!(resolver_task, ingest_task, sweep_task, predictive_task);
        }
        None => {
            info!(
                "RPC/signing environment not fully configured ({}, {}, {}, {}, {}, {} required); \
                 running in component-bootstrap mode only",
                env::ALCHEMY_WS_URL,
                env::ALCHEMY_HTTP_URL,
                env::SEND_RPC,
                env::PRIVATE_KEY,
                env::POOL,
                env::BALANCES_READER
            );
        }
    }

    Ok(())
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╦  ┬┌─┐ ┬ ┬┬┌┬┐┌─┐┌┬┐┌─┐┬─┐
    ║  ││─┼┐│ │││ ││├─┤ │ │ │├┬┘
    ╩═╝┴└─┘└└─┘┴─┴┘┴ ┴ ┴ └─┘┴└─
    Liquidation Bot
    "#
    );
}
