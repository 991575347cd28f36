// Path: crates/validator/tests/chain_pipeline.rs
//! End-to-end tests of the chain pipeline against the in-memory ledger.

use chroma_api::ledger::Level1Client;
use chroma_api::vm::ContractProcessor;
use chroma_execution::core_contracts::{accounts as accounts_contract, root};
use chroma_execution::VmEnvironment;
use chroma_telemetry::prometheus::PrometheusSink;
use chroma_telemetry::{ChainMetricsSink, NopSink};
use chroma_test_utils::contracts::{sandbox_test_contract, SANDBOX_TEST};
use chroma_test_utils::fixtures::{address, chain_id};
use chroma_test_utils::ledger::InMemoryLedger;
use chroma_test_utils::{assert_request_failed, assert_request_ok};
use chroma_types::app::{
    Address, AgentId, ChainId, Color, ColoredBalances, ContractId, Hname, Params, RequestSection,
};
use chroma_types::config::ChainConfig;
use chroma_types::error::{ChainError, LedgerError};
use chroma_validator::{Chain, ChainParams};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn owner() -> Address {
    address(1)
}

fn params(chain: ChainId) -> ChainParams {
    ChainParams {
        chain_id: chain,
        owner: AgentId::Address(owner()),
        description: "pipeline test chain".into(),
        fee_color: Color::BASE,
        validator_fee_target: None,
    }
}

fn config() -> ChainConfig {
    ChainConfig {
        idle_backoff_ms: 10,
        ..ChainConfig::default()
    }
}

fn env() -> Arc<VmEnvironment> {
    Arc::new(
        VmEnvironment::builder()
            .with_contract(sandbox_test_contract())
            .build(),
    )
}

fn funded_ledger() -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.faucet(&owner(), &ColoredBalances::base(1_000));
    ledger.faucet(&address(2), &ColoredBalances::base(100));
    ledger
}

fn section(chain: ChainId, contract: &str, entry_point: &str) -> RequestSection {
    RequestSection::new(
        ContractId::new(chain, Hname::of(contract)),
        Hname::of(entry_point),
    )
}

fn deploy_section(chain: ChainId) -> RequestSection {
    section(chain, chroma_types::keys::ROOT_CONTRACT, root::FUNC_DEPLOY_CONTRACT).with_params(
        Params::new()
            .with(root::PARAM_PROGRAM_HASH, sandbox_test_contract().program_hash())
            .with(root::PARAM_NAME, SANDBOX_TEST.to_string()),
    )
}

fn set_int(chain: ChainId, name: &str, value: i64) -> RequestSection {
    section(chain, SANDBOX_TEST, "setInt").with_params(
        Params::new()
            .with("name", name.to_string())
            .with("intValue", value),
    )
}

/// Polls `cond` until it holds or the wait budget is spent.
async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "timed out: {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn manual_chain(ledger: Arc<InMemoryLedger>, sink: Arc<dyn ChainMetricsSink>) -> Chain {
    manual_chain_with(ledger, sink, config()).await
}

async fn manual_chain_with(
    ledger: Arc<InMemoryLedger>,
    sink: Arc<dyn ChainMetricsSink>,
    config: ChainConfig,
) -> Chain {
    let chain = Chain::new(params(chain_id(1)), config, env(), ledger, sink)
        .await
        .unwrap();
    chain
        .post_request(&owner(), deploy_section(chain.chain_id()))
        .await
        .unwrap();
    eventually("deploy ingested", || chain.backlog_len() == 1).await;
    let report = chain.run_batch().await.unwrap().unwrap();
    assert!(report.results.iter().all(|r| r.is_success()));
    chain
}

#[derive(Debug, Default)]
struct CountingSink {
    blocks: AtomicUsize,
    anchor_failures: AtomicUsize,
    requests: AtomicUsize,
}

impl ChainMetricsSink for CountingSink {
    fn inc_requests_processed(&self, _outcome: &str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
    fn inc_blocks_committed(&self) {
        self.blocks.fetch_add(1, Ordering::SeqCst);
    }
    fn inc_anchor_failures(&self) {
        self.anchor_failures.fetch_add(1, Ordering::SeqCst);
    }
    fn observe_batch_duration(&self, _duration_secs: f64) {}
    fn set_backlog_len(&self, _len: usize) {}
}

#[tokio::test]
async fn deployed_contract_is_callable_through_the_ledger() {
    let ledger = funded_ledger();
    let chain = Chain::start(
        params(chain_id(1)),
        config(),
        env(),
        ledger.clone(),
        Arc::new(NopSink),
    )
    .await
    .unwrap();
    let id = chain.chain_id();

    let deploy = chain.post_request(&owner(), deploy_section(id)).await.unwrap();
    let deployed = deploy.wait_timeout(WAIT).await.unwrap();
    let out = assert_request_ok!(deployed);
    assert_eq!(
        out.require::<Hname>(root::PARAM_HNAME).unwrap(),
        Hname::of(SANDBOX_TEST)
    );

    let set = chain
        .post_request(&address(2), set_int(id, "answer", 42))
        .await
        .unwrap();
    assert_request_ok!(set.wait_timeout(WAIT).await.unwrap());

    let view = chain
        .call_view(
            Hname::of(SANDBOX_TEST),
            Hname::of("getInt"),
            Params::new().with("name", "answer".to_string()),
        )
        .unwrap();
    assert_eq!(view.require::<i64>("answer").unwrap(), 42);
    assert_eq!(
        chain
            .get_state(Hname::of(SANDBOX_TEST), b"int/answer")
            .unwrap(),
        Some(42i64.to_le_bytes().to_vec())
    );

    let anchors = ledger.anchors(&id);
    assert_eq!(anchors.len() as u64, chain.block_index() + 1);
    assert_eq!(
        anchors.last().map(|h| h.state_hash),
        Some(chain.state_hash())
    );
    for pair in anchors.windows(2) {
        assert_eq!(pair[1].prev_state_hash, pair[0].state_hash);
        assert_eq!(pair[1].index, pair[0].index + 1);
    }
    chain.shutdown().await;
}

#[tokio::test]
async fn time_locked_request_waits_for_logical_time() {
    let chain = manual_chain(funded_ledger(), Arc::new(NopSink)).await;
    let id = chain.chain_id();

    let locked = chain
        .post_request(&address(2), set_int(id, "late", 1).with_time_lock(5))
        .await
        .unwrap();
    let free = chain
        .post_request(&address(2), set_int(id, "early", 1))
        .await
        .unwrap();
    eventually("both ingested", || chain.backlog_len() == 2).await;

    let report = chain.run_batch().await.unwrap().unwrap();
    assert_eq!(report.header.request_ids, vec![free.id()]);
    assert_eq!(chain.backlog_len(), 1);
    assert!(chain.run_batch().await.unwrap().is_none());

    assert_eq!(chain.advance_logical_time(5), 5);
    let report = chain.run_batch().await.unwrap().unwrap();
    assert_eq!(report.header.request_ids, vec![locked.id()]);
    assert_eq!(report.header.timestamp, 5);
    assert_request_ok!(locked.try_result().unwrap());
    assert_eq!(chain.backlog_len(), 0);
    chain.shutdown().await;
}

#[tokio::test]
async fn rejected_anchor_leaves_state_untouched_and_requeues() {
    let ledger = funded_ledger();
    let sink = Arc::new(CountingSink::default());
    let chain = manual_chain(ledger.clone(), sink.clone()).await;
    let id = chain.chain_id();
    let before = chain.state_hash();
    let index = chain.block_index();

    let first = chain
        .post_request(&address(2), set_int(id, "a", 1))
        .await
        .unwrap();
    let second = chain
        .post_request(&address(2), set_int(id, "b", 2))
        .await
        .unwrap();
    eventually("both ingested", || chain.backlog_len() == 2).await;

    ledger.reject_next_state_transitions(1);
    let err = chain.run_batch().await.unwrap_err();
    assert!(matches!(err, ChainError::Ledger(LedgerError::Rejected(_))));
    assert_eq!(chain.state_hash(), before);
    assert_eq!(chain.block_index(), index);
    assert_eq!(chain.backlog_len(), 2);
    assert!(first.try_result().is_none());
    assert_eq!(
        chain
            .get_state(Hname::of(SANDBOX_TEST), b"int/a")
            .unwrap(),
        None
    );

    let report = chain.run_batch().await.unwrap().unwrap();
    assert_eq!(report.header.request_ids, vec![first.id(), second.id()]);
    assert_eq!(report.header.index, index + 1);
    assert_eq!(sink.anchor_failures.load(Ordering::SeqCst), 1);
    assert_eq!(sink.blocks.load(Ordering::SeqCst), 2);
    assert_eq!(sink.requests.load(Ordering::SeqCst), 3);
    chain.shutdown().await;
}

fn send_cross_chain(chain: ChainId, to: ChainId, amount: u64) -> RequestSection {
    section(chain, SANDBOX_TEST, "sendCrossChain")
        .with_params(
            Params::new()
                .with("agentID", AgentId::Address(address(2)))
                .with("chainID", to)
                .with("amount", amount),
        )
        .with_transfer(ColoredBalances::base(amount))
}

#[tokio::test]
async fn stopped_target_chain_neither_blocks_nor_double_credits() {
    let ledger = funded_ledger();
    let chain = manual_chain(ledger.clone(), Arc::new(NopSink)).await;
    let id = chain.chain_id();
    let stopped = Chain::new(
        params(chain_id(2)),
        config(),
        env(),
        ledger.clone(),
        Arc::new(NopSink),
    )
    .await
    .unwrap();
    stopped.shutdown().await;

    let handles = chain
        .post_requests(
            &address(2),
            vec![
                section(id, SANDBOX_TEST, "sendToAddress")
                    .with_params(
                        Params::new()
                            .with("address", address(7))
                            .with("amount", 5u64),
                    )
                    .with_transfer(ColoredBalances::base(5)),
                send_cross_chain(id, chain_id(2), 5),
                set_int(id, "after", 1),
            ],
        )
        .await
        .unwrap();
    eventually("all ingested", || chain.backlog_len() == 3).await;

    let report = chain.run_batch().await.unwrap().unwrap();
    assert_eq!(report.results.len(), 3);
    for handle in &handles {
        assert_request_ok!(handle.try_result().unwrap());
    }
    assert!(chain.run_batch().await.unwrap().is_none());
    assert!(chain.run_batch().await.unwrap().is_none());

    assert_eq!(ledger.balance(&address(7), &Color::BASE).await.unwrap(), 5);
    assert_eq!(ledger.balance(&address(2), &Color::BASE).await.unwrap(), 90);
    let undelivered = ledger.undelivered();
    assert_eq!(undelivered.len(), 1);
    assert_eq!(undelivered[0].target.chain_id, chain_id(2));
    chain.shutdown().await;
}

#[tokio::test]
async fn batch_that_keeps_failing_is_split_and_its_culprit_dropped() {
    let ledger = funded_ledger();
    let sink = Arc::new(CountingSink::default());
    let config = ChainConfig {
        max_batch_attempts: 2,
        ..config()
    };
    let chain = manual_chain_with(ledger.clone(), sink.clone(), config).await;
    let id = chain.chain_id();
    let user = AgentId::Address(address(2));
    ledger.close_chain(&chain_id(2));

    let culprit = chain
        .post_request(&address(2), send_cross_chain(id, chain_id(2), 5))
        .await
        .unwrap();
    let unrelated = chain
        .post_request(&address(2), set_int(id, "after", 1))
        .await
        .unwrap();
    eventually("both ingested", || chain.backlog_len() == 2).await;

    // Two failures as a batch, then two more for the culprit alone.
    for _ in 0..4 {
        let err = chain.run_batch().await.unwrap_err();
        assert!(matches!(err, ChainError::Ledger(LedgerError::Rejected(_))));
        assert_eq!(chain.block_index(), 1);
    }
    assert_request_failed!(culprit.try_result().unwrap(), "CHAIN_LEDGER_ERROR");
    assert!(unrelated.try_result().is_none());
    assert_eq!(chain.backlog_len(), 1);

    let report = chain.run_batch().await.unwrap().unwrap();
    assert_eq!(report.header.request_ids, vec![unrelated.id()]);
    assert_request_ok!(unrelated.try_result().unwrap());
    assert_eq!(
        chain
            .get_state(Hname::of(SANDBOX_TEST), b"int/after")
            .unwrap(),
        Some(1i64.to_le_bytes().to_vec())
    );
    assert_eq!(chain.balance(&user, &Color::BASE).unwrap(), 5);
    assert_eq!(ledger.balance(&address(2), &Color::BASE).await.unwrap(), 95);
    assert_eq!(sink.anchor_failures.load(Ordering::SeqCst), 4);
    assert!(chain.run_batch().await.unwrap().is_none());
    chain.shutdown().await;
}

#[tokio::test]
async fn failing_batches_do_not_stall_the_batch_loop() {
    let ledger = funded_ledger();
    let config = ChainConfig {
        max_batch_attempts: 2,
        ..config()
    };
    let chain = Chain::start(
        params(chain_id(1)),
        config,
        env(),
        ledger.clone(),
        Arc::new(NopSink),
    )
    .await
    .unwrap();
    let id = chain.chain_id();
    let deploy = chain.post_request(&owner(), deploy_section(id)).await.unwrap();
    assert_request_ok!(deploy.wait_timeout(WAIT).await.unwrap());
    ledger.close_chain(&chain_id(2));

    let culprit = chain
        .post_request(&address(2), send_cross_chain(id, chain_id(2), 5))
        .await
        .unwrap();
    let unrelated = chain
        .post_request(&address(2), set_int(id, "after", 1))
        .await
        .unwrap();
    assert_request_ok!(unrelated.wait_timeout(WAIT).await.unwrap());
    assert_request_failed!(
        culprit.wait_timeout(WAIT).await.unwrap(),
        "CHAIN_LEDGER_ERROR"
    );
    chain.shutdown().await;
}

#[tokio::test]
async fn configured_call_depth_bounds_every_request() {
    let config = ChainConfig {
        max_call_depth: 4,
        ..config()
    };
    let chain = manual_chain_with(funded_ledger(), Arc::new(NopSink), config).await;
    let id = chain.chain_id();
    let recurse = |n: i64| {
        section(id, SANDBOX_TEST, "recurse").with_params(Params::new().with("intValue", n))
    };

    let handles = chain
        .post_requests(&address(2), vec![recurse(3), recurse(20)])
        .await
        .unwrap();
    eventually("both ingested", || chain.backlog_len() == 2).await;
    chain.run_batch().await.unwrap().unwrap();

    let shallow = assert_request_ok!(handles[0].try_result().unwrap());
    assert_eq!(shallow.require::<i64>("depth").unwrap(), 4);
    assert_request_failed!(handles[1].try_result().unwrap(), "VM_CALL_DEPTH_EXCEEDED");
    chain.shutdown().await;
}

#[tokio::test]
async fn failed_request_is_reported_and_refunded() {
    let chain = manual_chain(funded_ledger(), Arc::new(NopSink)).await;
    let id = chain.chain_id();
    let sender = AgentId::Address(address(2));

    let handle = chain
        .post_request(
            &address(2),
            section(id, SANDBOX_TEST, "testAbort").with_transfer(ColoredBalances::base(7)),
        )
        .await
        .unwrap();
    eventually("ingested", || chain.backlog_len() == 1).await;
    chain.run_batch().await.unwrap().unwrap();

    assert_request_failed!(handle.try_result().unwrap(), "VM_ABORTED");
    assert_eq!(chain.balance(&sender, &Color::BASE).unwrap(), 7);
    let contract = AgentId::Contract(ContractId::new(id, Hname::of(SANDBOX_TEST)));
    assert_eq!(chain.balance(&contract, &Color::BASE).unwrap(), 0);
    chain.shutdown().await;
}

#[tokio::test]
async fn deposit_and_withdraw_round_trip_through_the_ledger() {
    let ledger = funded_ledger();
    let chain = Chain::start(
        params(chain_id(1)),
        config(),
        env(),
        ledger.clone(),
        Arc::new(NopSink),
    )
    .await
    .unwrap();
    let id = chain.chain_id();
    let user = AgentId::Address(address(2));

    let deposit = chain
        .post_request(
            &address(2),
            section(id, chroma_types::keys::ACCOUNTS_CONTRACT, accounts_contract::FUNC_DEPOSIT)
                .with_transfer(ColoredBalances::base(30)),
        )
        .await
        .unwrap();
    assert_request_ok!(deposit.wait_timeout(WAIT).await.unwrap());
    assert_eq!(chain.balance(&user, &Color::BASE).unwrap(), 30);
    assert_eq!(ledger.balance(&address(2), &Color::BASE).await.unwrap(), 70);

    let withdraw = chain
        .post_request(
            &address(2),
            section(id, chroma_types::keys::ACCOUNTS_CONTRACT, accounts_contract::FUNC_WITHDRAW),
        )
        .await
        .unwrap();
    assert_request_ok!(withdraw.wait_timeout(WAIT).await.unwrap());
    assert_eq!(chain.balance(&user, &Color::BASE).unwrap(), 0);
    assert_eq!(ledger.balance(&address(2), &Color::BASE).await.unwrap(), 100);
    chain.shutdown().await;
}

#[tokio::test]
async fn cross_chain_transfer_lands_on_the_target_chain() {
    let ledger = funded_ledger();
    let sender_chain = Chain::start(
        params(chain_id(1)),
        config(),
        env(),
        ledger.clone(),
        Arc::new(NopSink),
    )
    .await
    .unwrap();
    let target_chain = Chain::start(
        params(chain_id(2)),
        config(),
        env(),
        ledger.clone(),
        Arc::new(NopSink),
    )
    .await
    .unwrap();
    let src = sender_chain.chain_id();
    let dst = target_chain.chain_id();
    let user = AgentId::Address(address(2));

    let deploy = sender_chain
        .post_request(&owner(), deploy_section(src))
        .await
        .unwrap();
    assert_request_ok!(deploy.wait_timeout(WAIT).await.unwrap());

    let send = sender_chain
        .post_request(
            &address(2),
            section(src, SANDBOX_TEST, "sendCrossChain")
                .with_params(
                    Params::new()
                        .with("agentID", user)
                        .with("chainID", dst)
                        .with("amount", 5u64),
                )
                .with_transfer(ColoredBalances::base(5)),
        )
        .await
        .unwrap();
    let sent = send.wait_timeout(WAIT).await.unwrap();
    let out = assert_request_ok!(sent);
    assert!(out.require::<bool>("ok").unwrap());

    eventually("deposit executed on target chain", || {
        target_chain.balance(&user, &Color::BASE).ok() == Some(5)
    })
    .await;
    let contract = AgentId::Contract(ContractId::new(src, Hname::of(SANDBOX_TEST)));
    assert_eq!(sender_chain.balance(&contract, &Color::BASE).unwrap(), 0);
    assert!(ledger.undelivered().is_empty());

    sender_chain.shutdown().await;
    target_chain.shutdown().await;
}

#[tokio::test]
async fn shutdown_releases_waiters_and_refuses_new_requests() {
    let chain = manual_chain(funded_ledger(), Arc::new(NopSink)).await;
    let id = chain.chain_id();

    let pending = chain
        .post_request(&address(2), set_int(id, "never", 1))
        .await
        .unwrap();
    let waiter = {
        let pending = pending.clone();
        tokio::spawn(async move { pending.wait().await })
    };

    chain.shutdown().await;
    let waited = tokio::time::timeout(WAIT, waiter).await.unwrap().unwrap();
    assert!(matches!(waited, Err(ChainError::Shutdown)));
    assert!(matches!(
        chain.post_request(&address(2), set_int(id, "late", 1)).await,
        Err(ChainError::Shutdown)
    ));
    assert!(matches!(chain.run_batch().await, Err(ChainError::Shutdown)));
}

#[tokio::test]
async fn underfunded_sender_is_rejected_by_the_ledger() {
    let chain = manual_chain(funded_ledger(), Arc::new(NopSink)).await;
    let id = chain.chain_id();
    let err = chain
        .post_request(
            &address(3),
            set_int(id, "x", 1).with_transfer(ColoredBalances::base(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Ledger(LedgerError::InsufficientFunds(_))
    ));
    assert_eq!(chain.backlog_len(), 0);
    chain.shutdown().await;
}

#[tokio::test]
async fn prometheus_sink_tracks_the_pipeline() {
    let registry = prometheus::Registry::new();
    let sink = PrometheusSink::install(&registry, "one").unwrap();
    let sink = Arc::new(sink);
    let chain = manual_chain(funded_ledger(), sink).await;
    let id = chain.chain_id();

    chain
        .post_request(&address(2), section(id, SANDBOX_TEST, "testAbort"))
        .await
        .unwrap();
    eventually("ingested", || chain.backlog_len() == 1).await;
    chain.run_batch().await.unwrap().unwrap();

    let families = registry.gather();
    let family = |name: &str| {
        families
            .iter()
            .find(|f| f.get_name() == name)
            .unwrap_or_else(|| panic!("missing {name}"))
    };
    let blocks = family("chroma_blocks_committed_total");
    assert_eq!(blocks.get_metric()[0].get_counter().get_value(), 2.0);
    let outcomes: Vec<_> = family("chroma_requests_processed_total")
        .get_metric()
        .iter()
        .map(|m| {
            let label = m.get_label().iter().find(|l| l.get_name() == "outcome").unwrap();
            (label.get_value().to_string(), m.get_counter().get_value())
        })
        .collect();
    assert!(outcomes.contains(&("success".to_string(), 1.0)));
    assert!(outcomes.contains(&("VM_ABORTED".to_string(), 1.0)));
    let durations = family("chroma_batch_duration_seconds");
    assert_eq!(durations.get_metric()[0].get_histogram().get_sample_count(), 2);
    chain.shutdown().await;
}
