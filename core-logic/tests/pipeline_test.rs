use async_trait::async_trait;
use core_logic::{
    Checker, ConfigError, CoreError, FailureReason, FetchResult, Fetcher, JsonFileStore,
    MemoryErrorLog, MemoryStore, NetworkError, PipelineContext, Proxy, ProxyPool, ResultStore,
    RetryPolicy, Scheduler, SchedulerSettings, SilentProgress, SleepRange, Wallet, WalletState,
    WalletTracker, WalletWorker,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum Step {
    Ok(Value),
    NotFound,
    Http500,
    /// Blocks until the attempt is cancelled.
    Hang,
    Panic,
}

/// Scripted fetcher: each wallet pops its next step, falling back to `default`.
struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    default: Step,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight_per_wallet: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(default: Step) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight_per_wallet: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn script(self, wallet: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(wallet.to_string(), steps.into());
        self
    }

    fn calls_for(&self, wallet: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(w, _)| w == wallet)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn next_step(&self, wallet: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(wallet)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| self.default.clone())
    }

    fn enter(&self, wallet: &str) {
        let mut map = self.in_flight.lock().unwrap();
        let n = map.entry(wallet.to_string()).or_insert(0);
        *n += 1;
        self.max_in_flight_per_wallet
            .fetch_max(*n, Ordering::SeqCst);
    }

    fn leave(&self, wallet: &str) {
        let mut map = self.in_flight.lock().unwrap();
        if let Some(n) = map.get_mut(wallet) {
            *n -= 1;
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        wallet: &Wallet,
        proxy: &Proxy,
        cancel: &CancellationToken,
    ) -> FetchResult {
        self.calls
            .lock()
            .unwrap()
            .push((wallet.to_string(), proxy.endpoint()));
        let step = self.next_step(wallet.as_str());

        self.enter(wallet.as_str());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = match step {
            Step::Ok(mut payload) => {
                payload["wallet_address"] = json!(wallet.as_str());
                FetchResult::Success(payload)
            }
            Step::NotFound => FetchResult::NotFound,
            Step::Http500 => FetchResult::Transient(NetworkError::HttpError {
                status_code: 500,
                body: "Internal Server Error".to_string(),
            }),
            Step::Hang => {
                cancel.cancelled().await;
                FetchResult::Transient(NetworkError::Cancelled)
            }
            Step::Panic => {
                self.leave(wallet.as_str());
                panic!("scripted panic for {}", wallet);
            }
        };
        self.leave(wallet.as_str());
        result
    }
}

fn proxy(port: u16) -> Proxy {
    Proxy::parse(&format!("127.0.0.1:{}", port)).unwrap()
}

fn wallets(ids: &[&str]) -> Vec<Wallet> {
    ids.iter().map(|id| Wallet::from(*id)).collect()
}

struct Harness {
    fetcher: Arc<ScriptedFetcher>,
    store: Arc<MemoryStore>,
    log: Arc<MemoryErrorLog>,
    ctx: PipelineContext,
}

fn harness(fetcher: ScriptedFetcher, pool: ProxyPool) -> Harness {
    let fetcher = Arc::new(fetcher);
    let store = Arc::new(MemoryStore::new());
    let log = Arc::new(MemoryErrorLog::new());
    let ctx = PipelineContext::new(fetcher.clone(), store.clone(), log.clone(), pool);
    Harness {
        fetcher,
        store,
        log,
        ctx,
    }
}

fn policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, SleepRange::none())
}

fn scheduler(
    h: &Harness,
    attempts: u32,
    list: &[Wallet],
    settings: SchedulerSettings,
) -> (Scheduler, Arc<WalletTracker>) {
    let tracker = Arc::new(WalletTracker::new(list));
    let worker = WalletWorker::new(h.ctx.clone(), policy(attempts), tracker.clone());
    (
        Scheduler::new(worker, settings, Arc::new(SilentProgress)),
        tracker,
    )
}

#[tokio::test]
async fn test_always_failing_wallet_logs_every_attempt() {
    let h = harness(
        ScriptedFetcher::new(Step::Http500),
        ProxyPool::from_primary(vec![proxy(1)], vec![proxy(9)]),
    );
    let list = wallets(&["0xAAA"]);
    let (scheduler, tracker) = scheduler(&h, 3, &list, SchedulerSettings::default());

    let outcomes = scheduler.run(&list, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].attempts, 3);
    assert_eq!(outcomes[0].failure, Some(FailureReason::Exhausted));
    assert!(h.store.get(&Wallet::from("0xAAA")).await.unwrap().is_none());

    let lines = h.log.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("[attempt 1/3]"));
    assert!(lines[0].contains("HTTP error: 500"));
    assert!(lines[2].contains("[attempt 3/3]"));

    // first attempt on the primary proxy, replacements from the reserve
    let used = h.fetcher.calls_for("0xAAA");
    assert_eq!(
        used,
        vec![
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9".to_string(),
        ]
    );
    assert_eq!(tracker.state(0), Some(WalletState::Exhausted));
}

#[tokio::test]
async fn test_not_found_then_success_keeps_second_payload() {
    let h = harness(
        ScriptedFetcher::new(Step::Http500).script(
            "0xBBB",
            vec![Step::NotFound, Step::Ok(json!({"walletPerformance": {"topPercent": 12}}))],
        ),
        ProxyPool::from_primary(vec![proxy(1)], vec![proxy(9)]),
    );
    let list = wallets(&["0xBBB"]);
    let (scheduler, _) = scheduler(&h, 3, &list, SchedulerSettings::default());

    let outcomes = scheduler.run(&list, &CancellationToken::new()).await.unwrap();

    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].attempts, 2);

    let record = h.store.get(&Wallet::from("0xBBB")).await.unwrap().unwrap();
    assert_eq!(record.payload["walletPerformance"]["topPercent"], 12);
    assert_eq!(record.payload["wallet_address"], "0xBBB");

    let lines = h.log.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Wallet 0xBBB not found, retrying..."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_wallet_has_two_concurrent_attempts() {
    let ids: Vec<String> = (0..40).map(|i| format!("0x{:03}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
    let list = wallets(&id_refs);

    let mut fetcher = ScriptedFetcher::new(Step::Ok(json!({}))).with_delay(Duration::from_millis(5));
    for id in ids.iter().step_by(3) {
        fetcher = fetcher.script(id, vec![Step::Http500, Step::NotFound]);
    }
    let h = harness(fetcher, ProxyPool::new(Vec::new(), vec![proxy(7), proxy(8)]));
    let (scheduler, tracker) = scheduler(
        &h,
        5,
        &list,
        SchedulerSettings {
            concurrency: 8,
            task_timeout: Duration::from_secs(10),
        },
    );

    let outcomes = scheduler.run(&list, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcomes.len(), list.len());
    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(h.fetcher.max_in_flight_per_wallet.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.counts().success, list.len());
    assert_eq!(h.store.len().await, list.len());
}

#[tokio::test]
async fn test_empty_reserve_with_short_primary_is_fatal() {
    let h = harness(
        ScriptedFetcher::new(Step::Ok(json!({}))),
        ProxyPool::from_primary(vec![proxy(1)], Vec::new()),
    );
    let list = wallets(&["0xAAA", "0xBBB"]);
    let (scheduler, _) = scheduler(&h, 3, &list, SchedulerSettings::default());

    let err = scheduler
        .run(&list, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, CoreError::Config(ConfigError::NoReserveProxies)));
}

#[tokio::test]
async fn test_empty_reserve_is_fatal_on_first_replacement() {
    let h = harness(
        ScriptedFetcher::new(Step::Http500),
        ProxyPool::from_primary(vec![proxy(1)], Vec::new()),
    );
    let list = wallets(&["0xAAA"]);
    let (scheduler, _) = scheduler(&h, 3, &list, SchedulerSettings::default());

    let err = scheduler
        .run(&list, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Config(ConfigError::NoReserveProxies)));
    // the failed attempt on the primary proxy was still logged
    assert!(h.log.lines()[0].contains("[attempt 1/3]"));
}

#[tokio::test]
async fn test_task_deadline_cancels_hanging_attempt() {
    let h = harness(
        ScriptedFetcher::new(Step::Ok(json!({"ok": true}))).script("0xSLOW", vec![Step::Hang]),
        ProxyPool::from_primary(vec![proxy(1), proxy(2)], vec![proxy(9)]),
    );
    let list = wallets(&["0xSLOW", "0xFAST"]);
    let (scheduler, tracker) = scheduler(
        &h,
        3,
        &list,
        SchedulerSettings {
            concurrency: 2,
            task_timeout: Duration::from_millis(100),
        },
    );

    let outcomes = scheduler.run(&list, &CancellationToken::new()).await.unwrap();

    let slow = outcomes
        .iter()
        .find(|o| o.wallet.as_str() == "0xSLOW")
        .unwrap();
    assert!(!slow.success);
    assert_eq!(slow.failure, Some(FailureReason::TimedOut));

    let fast = outcomes
        .iter()
        .find(|o| o.wallet.as_str() == "0xFAST")
        .unwrap();
    assert!(fast.success);

    assert!(h
        .log
        .lines()
        .iter()
        .any(|l| l.contains("Timeout error for wallet 0xSLOW")));
    assert_eq!(tracker.state(0), Some(WalletState::Exhausted));
    assert!(h.store.get(&Wallet::from("0xSLOW")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_panicking_worker_is_recorded_as_failure() {
    let h = harness(
        ScriptedFetcher::new(Step::Ok(json!({}))).script("0xBAD", vec![Step::Panic]),
        ProxyPool::new(Vec::new(), vec![proxy(9)]),
    );
    let list = wallets(&["0xBAD", "0xGOOD"]);
    let (scheduler, tracker) = scheduler(&h, 3, &list, SchedulerSettings::default());

    let outcomes = scheduler.run(&list, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    let bad = outcomes
        .iter()
        .find(|o| o.wallet.as_str() == "0xBAD")
        .unwrap();
    assert_eq!(bad.failure, Some(FailureReason::Panicked));
    assert_eq!(tracker.state(0), Some(WalletState::Exhausted));
}

#[tokio::test]
async fn test_full_run_leaves_record_or_permanent_failure_for_every_wallet() {
    let fetcher = ScriptedFetcher::new(Step::Ok(json!({"v": 1})))
        .script("0xAAA", vec![Step::Http500; 10])
        .script("0xBBB", vec![Step::NotFound, Step::Ok(json!({"v": 2}))])
        // fails the whole first pass, recovers during reconcile
        .script("0xCCC", vec![Step::Http500, Step::Http500, Step::Ok(json!({"v": 3}))])
        .script("0xDDD", vec![Step::Panic]);
    let h = harness(
        fetcher,
        ProxyPool::from_primary(vec![proxy(1), proxy(2)], vec![proxy(8), proxy(9)]),
    );
    let list = wallets(&["0xAAA", "0xBBB", "0xCCC", "0xDDD", "0xEEE"]);
    let checker = Checker::new(
        h.ctx.clone(),
        policy(2),
        SchedulerSettings::default(),
        Arc::new(SilentProgress),
    );

    let summary = checker.run(&list, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcomes.len(), list.len());
    assert_eq!(
        summary.reconcile.recovered,
        wallets(&["0xCCC", "0xDDD"])
    );
    assert_eq!(summary.reconcile.permanently_failed, wallets(&["0xAAA"]));
    assert_eq!(summary.counts.success, 4);
    assert_eq!(summary.counts.permanently_failed, 1);

    let lines = h.log.lines();
    for wallet in &list {
        let stored = h.store.get(wallet).await.unwrap().is_some();
        let marker = format!(
            "Wallet {} permanently failed after 4 attempts (budget 2)",
            wallet
        );
        let failed = lines.iter().any(|l| l.contains(&marker));
        assert!(stored ^ failed, "wallet {} stored={} failed={}", wallet, stored, failed);
    }

    // wallets with a record are never attempted again
    assert_eq!(h.fetcher.calls_for("0xEEE").len(), 1);
    assert_eq!(h.fetcher.calls_for("0xBBB").len(), 2);
    assert_eq!(h.fetcher.calls_for("0xAAA").len(), 4);
}

#[tokio::test]
async fn test_lookalike_wallet_ids_keep_separate_records_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new(Step::Http500)
            .script("0x_A", vec![Step::Ok(json!({"v": "underscore"}))]),
    );
    let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
    let log = Arc::new(MemoryErrorLog::new());
    let ctx = PipelineContext::new(
        fetcher.clone(),
        store.clone(),
        log.clone(),
        ProxyPool::new(Vec::new(), vec![proxy(9)]),
    );
    let list = wallets(&["0x_A", "0x/A"]);
    let checker = Checker::new(
        ctx,
        policy(2),
        SchedulerSettings::default(),
        Arc::new(SilentProgress),
    );

    let summary = checker.run(&list, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.reconcile.permanently_failed, wallets(&["0x/A"]));
    assert_eq!(fetcher.calls_for("0x/A").len(), 4);
    assert!(store.get(&Wallet::from("0x/A")).await.unwrap().is_none());
    let record = store.get(&Wallet::from("0x_A")).await.unwrap().unwrap();
    assert_eq!(record.payload["v"], "underscore");
}

#[tokio::test]
async fn test_cancelled_run_skips_reconcile() {
    let h = harness(
        ScriptedFetcher::new(Step::Http500),
        ProxyPool::new(Vec::new(), vec![proxy(9)]),
    );
    let list = wallets(&["0xAAA", "0xBBB"]);
    let checker = Checker::new(
        h.ctx.clone(),
        policy(3),
        SchedulerSettings::default(),
        Arc::new(SilentProgress),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = checker.run(&list, &cancel).await.unwrap();

    assert!(summary.outcomes.iter().all(|o| !o.success));
    assert!(summary
        .outcomes
        .iter()
        .all(|o| o.failure == Some(FailureReason::Cancelled)));
    assert_eq!(summary.reconcile.skipped, list);
    assert!(h.fetcher.calls_for("0xAAA").is_empty());
}
