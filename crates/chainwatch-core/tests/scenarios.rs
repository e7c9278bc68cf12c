//! End-to-end ingestion scenarios against a scripted ledger.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chainwatch_core::{
    Address, ChainWatch, LedgerSource, QueryFacade, SubscriptionIndex, SyncEngine, Transaction,
    TransactionStore, WatchConfig, WatchConfigBuilder, WatchError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Hashes(u64),
    Full(u64),
    ByHash(String),
}

/// In-memory ledger whose contents can change between passes.
#[derive(Default)]
struct ScriptedLedger {
    head: Mutex<u64>,
    blocks: Mutex<HashMap<u64, Vec<Transaction>>>,
    failing: Mutex<HashSet<u64>>,
    /// Hashes listed in their block but unknown to by-hash lookups.
    lost: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedLedger {
    fn with_head(head: u64) -> Arc<Self> {
        let ledger = Self::default();
        *ledger.head.lock().unwrap() = head;
        Arc::new(ledger)
    }

    fn set_head(&self, head: u64) {
        *self.head.lock().unwrap() = head;
    }

    fn push(&self, tx: Transaction) {
        self.blocks
            .lock()
            .unwrap()
            .entry(tx.block_number)
            .or_default()
            .push(tx);
    }

    fn fail_block(&self, block: u64) {
        self.failing.lock().unwrap().insert(block);
    }

    fn heal_block(&self, block: u64) {
        self.failing.lock().unwrap().remove(&block);
    }

    fn lose_tx(&self, hash: &str) {
        self.lost.lock().unwrap().insert(hash.to_string());
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check(&self, block: u64) -> Result<(), WatchError> {
        if self.failing.lock().unwrap().contains(&block) {
            return Err(WatchError::Fetch(format!("block {block} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerSource for ScriptedLedger {
    async fn block_number(&self) -> Result<u64, WatchError> {
        Ok(*self.head.lock().unwrap())
    }

    async fn block_transaction_hashes(&self, number: u64) -> Result<Vec<String>, WatchError> {
        self.calls.lock().unwrap().push(Call::Hashes(number));
        self.check(number)?;
        let blocks = self.blocks.lock().unwrap();
        Ok(blocks
            .get(&number)
            .map(|txs| txs.iter().map(|t| t.hash.clone()).collect())
            .unwrap_or_default())
    }

    async fn block_transactions(&self, number: u64) -> Result<Vec<Transaction>, WatchError> {
        self.calls.lock().unwrap().push(Call::Full(number));
        self.check(number)?;
        Ok(self.blocks.lock().unwrap().get(&number).cloned().unwrap_or_default())
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, WatchError> {
        self.calls.lock().unwrap().push(Call::ByHash(hash.to_string()));
        if self.lost.lock().unwrap().contains(hash) {
            return Err(WatchError::TransactionNotFound { hash: hash.into() });
        }
        self.blocks
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|t| t.hash == hash)
            .cloned()
            .ok_or_else(|| WatchError::TransactionNotFound { hash: hash.into() })
    }
}

fn addr(a: &str) -> Address {
    Address::parse(a).unwrap()
}

fn tx(hash: &str, block: u64, index: u64, from: &str, to: &str) -> Transaction {
    Transaction {
        hash: hash.into(),
        from: addr(from),
        to: Some(addr(to)),
        value: "0xde0b6b3a7640000".into(),
        nonce: index,
        block_number: block,
        transaction_index: index,
    }
}

fn engine_at(ledger: &Arc<ScriptedLedger>, start: u64) -> (SyncEngine, TransactionStore, SubscriptionIndex) {
    let store = TransactionStore::new();
    let index = SubscriptionIndex::new();
    let engine = SyncEngine::new(ledger.clone(), store.clone(), index.clone(), start);
    (engine, store, index)
}

#[tokio::test(start_paused = true)]
async fn new_block_transaction_reaches_subscriber() {
    let ledger = ScriptedLedger::with_head(100);
    let config = WatchConfigBuilder::new().poll_interval_ms(5_000).build();
    let watch = ChainWatch::start(ledger.clone(), &config).await.unwrap();
    let facade = watch.facade();

    facade.subscribe(addr("0xAA")).await;
    ledger.push(tx("t1", 101, 0, "0xAA", "0xBB"));
    ledger.set_head(101);

    for _ in 0..10 {
        if facade.status().await.sync.last_ingested_height == 101 {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let txs = facade.transactions_for(&addr("0xaa")).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].hash, "t1");
    assert!(facade.transactions_for(&addr("0xbb")).await.is_none());

    watch.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_poll_interval_still_ingests() {
    let ledger = ScriptedLedger::with_head(100);
    let config = WatchConfig {
        poll_interval_ms: 0,
        ..WatchConfig::default()
    };
    let watch = ChainWatch::start(ledger.clone(), &config).await.unwrap();
    let facade = watch.facade();

    facade.subscribe(addr("0xaa")).await;
    ledger.push(tx("t1", 101, 0, "0xaa", "0xbb"));
    ledger.set_head(101);

    for _ in 0..100 {
        if facade.status().await.sync.last_ingested_height == 101 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(facade.status().await.sync.last_ingested_height, 101);
    assert_eq!(facade.transactions_for(&addr("0xaa")).await.unwrap().len(), 1);

    watch.shutdown().await;
}

#[tokio::test]
async fn startup_fails_without_initial_height() {
    struct Down;

    #[async_trait]
    impl LedgerSource for Down {
        async fn block_number(&self) -> Result<u64, WatchError> {
            Err(WatchError::Fetch("connection refused".into()))
        }
        async fn block_transaction_hashes(&self, _: u64) -> Result<Vec<String>, WatchError> {
            unreachable!()
        }
        async fn block_transactions(&self, _: u64) -> Result<Vec<Transaction>, WatchError> {
            unreachable!()
        }
        async fn transaction_by_hash(&self, _: &str) -> Result<Transaction, WatchError> {
            unreachable!()
        }
    }

    let config = WatchConfigBuilder::new().build();
    let result = ChainWatch::start(Arc::new(Down), &config).await;
    assert!(matches!(result, Err(WatchError::Fetch(_))));
}

#[tokio::test]
async fn head_block_gains_transaction_via_light_refresh() {
    let ledger = ScriptedLedger::with_head(100);
    ledger.push(tx("t0", 100, 0, "0xcc", "0xdd"));
    let (mut engine, store, index) = engine_at(&ledger, 100);
    index.subscribe(addr("0xaa")).await;

    engine.on_new_height(100).await.unwrap();
    assert!(store.exists("t0").await);

    // t2 lands in block 100 after it was first observed.
    ledger.push(tx("t2", 100, 1, "0xbb", "0xaa"));
    ledger.clear_calls();

    engine.on_new_height(100).await.unwrap();

    assert!(store.exists("t2").await);
    assert_eq!(
        ledger.calls(),
        vec![Call::Hashes(100), Call::ByHash("t2".into())]
    );
    let matched = index.matches_for(&addr("0xaa")).await.unwrap();
    assert!(matched.contains("t2"));
}

#[tokio::test]
async fn failed_block_is_retried_on_next_pass() {
    let ledger = ScriptedLedger::with_head(105);
    for b in 101..=105 {
        ledger.push(tx(&format!("t{b}"), b, 0, "0xaa", "0xbb"));
    }
    ledger.fail_block(102);
    let (mut engine, store, index) = engine_at(&ledger, 100);
    index.subscribe(addr("0xaa")).await;

    let err = engine.on_new_height(105).await.unwrap_err();
    assert!(err.is_fetch_failure());
    assert!(engine.cursor() <= 101);
    assert!(store.exists("t101").await);
    assert!(!store.exists("t103").await);
    assert_eq!(engine.status().fetch_failures, 1);

    ledger.heal_block(102);
    ledger.clear_calls();
    engine.on_new_height(105).await.unwrap();

    assert!(ledger.calls().contains(&Call::Full(102)));
    assert_eq!(engine.cursor(), 105);
    for b in 101..=105 {
        assert!(store.exists(&format!("t{b}")).await, "block {b} not ingested");
    }
    assert_eq!(index.matches_for(&addr("0xaa")).await.unwrap().len(), 5);
}

#[tokio::test]
async fn failed_light_refresh_keeps_cursor() {
    let ledger = ScriptedLedger::with_head(101);
    ledger.fail_block(100);
    let (mut engine, _, _) = engine_at(&ledger, 100);

    assert!(engine.on_new_height(101).await.is_err());
    assert_eq!(engine.cursor(), 100);
    assert!(!ledger.calls().contains(&Call::Full(101)));
}

#[tokio::test]
async fn unresolvable_cursor_transaction_stalls_ingestion() {
    let ledger = ScriptedLedger::with_head(100);
    let (mut engine, store, _) = engine_at(&ledger, 100);

    // t1 shows up in the cursor block but the node cannot serve it by hash.
    ledger.push(tx("t1", 100, 0, "0xaa", "0xbb"));
    ledger.lose_tx("t1");
    ledger.push(tx("t2", 101, 0, "0xaa", "0xbb"));
    ledger.set_head(101);

    for pass in 1..=3 {
        let err = engine.on_new_height(101).await.unwrap_err();
        assert!(matches!(err, WatchError::TransactionNotFound { .. }));
        assert_eq!(engine.cursor(), 100);
        assert_eq!(engine.status().fetch_failures, pass);
    }
    assert!(!ledger.calls().contains(&Call::Full(101)));
    assert!(!store.exists("t2").await);

    ledger.lost.lock().unwrap().clear();
    engine.on_new_height(101).await.unwrap();

    assert_eq!(engine.cursor(), 101);
    assert!(store.exists("t1").await);
    assert!(store.exists("t2").await);
}

#[tokio::test]
async fn resubscribe_keeps_recorded_matches() {
    let ledger = ScriptedLedger::with_head(101);
    ledger.push(tx("t1", 101, 0, "0xaa", "0xbb"));
    let (mut engine, _, index) = engine_at(&ledger, 100);

    index.subscribe(addr("0xaa")).await;
    engine.on_new_height(101).await.unwrap();
    index.subscribe(addr("0xaa")).await;

    let matched = index.matches_for(&addr("0xaa")).await.unwrap();
    assert_eq!(matched, HashSet::from(["t1".to_string()]));
}

#[tokio::test]
async fn late_subscriber_misses_earlier_transactions() {
    let ledger = ScriptedLedger::with_head(102);
    ledger.push(tx("t1", 101, 0, "0xaa", "0xbb"));
    ledger.push(tx("t2", 102, 0, "0xbb", "0xaa"));
    let (mut engine, _, index) = engine_at(&ledger, 100);

    engine.on_new_height(101).await.unwrap();
    index.subscribe(addr("0xaa")).await;
    engine.on_new_height(102).await.unwrap();

    let matched = index.matches_for(&addr("0xaa")).await.unwrap();
    assert_eq!(matched, HashSet::from(["t2".to_string()]));
}

#[tokio::test]
async fn unrelated_subscriber_gets_nothing() {
    let ledger = ScriptedLedger::with_head(101);
    ledger.push(tx("t1", 101, 0, "0xaa", "0xbb"));
    let (mut engine, _, index) = engine_at(&ledger, 100);
    index.subscribe(addr("0xaa")).await;
    index.subscribe(addr("0xcc")).await;

    engine.on_new_height(101).await.unwrap();

    assert!(index.matches_for(&addr("0xcc")).await.unwrap().is_empty());
    assert_eq!(index.matches_for(&addr("0xaa")).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queries_and_subscriptions_during_ingestion() {
    let ledger = ScriptedLedger::with_head(300);
    let senders: Vec<Address> = (0..8).map(|i| addr(&format!("0xa{i}"))).collect();
    let recipients: Vec<Address> = (0..8).map(|i| addr(&format!("0xb{i}"))).collect();

    let mut expected: HashMap<Address, HashSet<String>> = HashMap::new();
    for b in 101..=300u64 {
        for i in 0..4u64 {
            let n = (b + i) as usize;
            let t = tx(
                &format!("t{b}-{i}"),
                b,
                i,
                senders[n % 8].as_str(),
                recipients[(n * 3) % 8].as_str(),
            );
            expected.entry(t.from.clone()).or_default().insert(t.hash.clone());
            if let Some(to) = &t.to {
                expected.entry(to.clone()).or_default().insert(t.hash.clone());
            }
            ledger.push(t);
        }
    }

    let (mut engine, store, index) = engine_at(&ledger, 100);
    let facade = QueryFacade::new(
        ledger.clone(),
        store.clone(),
        index.clone(),
        engine.subscribe_status(),
    );
    for sender in &senders {
        facade.subscribe(sender.clone()).await;
    }

    let pass = tokio::spawn(async move {
        engine.on_new_height(300).await?;
        Ok::<_, WatchError>(engine)
    });

    // Each reader registers a recipient mid-pass, then keeps querying.
    let mut readers = Vec::new();
    for (sender, recipient) in senders.iter().cloned().zip(recipients.iter().cloned()) {
        let facade = facade.clone();
        let store = store.clone();
        let index = index.clone();
        readers.push(tokio::spawn(async move {
            assert!(facade.subscribe(recipient.clone()).await);
            for _ in 0..50 {
                for address in [&sender, &recipient] {
                    let hashes = index.matches_for(address).await.unwrap();
                    for hash in &hashes {
                        assert!(store.exists(hash).await, "{hash} matched before it was stored");
                    }
                    let txs = facade.transactions_for(address).await.unwrap();
                    assert!(txs.len() >= hashes.len());
                    for t in &txs {
                        assert!(t.from == *address || t.to.as_ref() == Some(address));
                    }
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    let engine = pass.await.unwrap().unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    assert_eq!(engine.cursor(), 300);
    assert_eq!(store.len().await, 800);
    for sender in &senders {
        assert_eq!(index.matches_for(sender).await.unwrap(), expected[sender]);
    }
    for recipient in &recipients {
        let matched = index.matches_for(recipient).await.unwrap();
        assert!(matched.is_subset(&expected[recipient]));
    }
}
