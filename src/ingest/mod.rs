pub mod adapters;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info, trace, warn};

use crate::error::Error;
use crate::ingest::adapters::{FetchConfig, LedgerRpc, PoolSink};
use crate::protocols::locate_instruction;
use crate::protocols::raydium_amm::{PoolDescriptor, canonicalize, decode_pool};
use crate::types::TransactionEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// The node returned no transaction for the signature.
    TransactionNotFound,
    FetchFailed,
    NoPoolInstruction,
    MalformedInstruction,
    /// A resolved account could not be wrapped as an address. Not logged, only counted.
    AddressFault,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested(PoolDescriptor),
    Skipped(SkipReason),
}

impl IngestOutcome {
    pub fn pool(&self) -> Option<&PoolDescriptor> {
        match self {
            Self::Ingested(pool) => Some(pool),
            Self::Skipped(_) => None,
        }
    }
}

/// Per-pipeline counters. Shared between concurrent `ingest` calls.
#[derive(Debug, Default)]
pub struct IngestStats {
    ingested: AtomicU64,
    skipped: AtomicU64,
    address_faults: AtomicU64,
    write_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub ingested: u64,
    pub skipped: u64,
    pub address_faults: u64,
    pub write_failures: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ingested: self.ingested.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            address_faults: self.address_faults.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &IngestOutcome) {
        let counter = match outcome {
            IngestOutcome::Ingested(_) => &self.ingested,
            IngestOutcome::Skipped(SkipReason::AddressFault) => {
                self.address_faults.fetch_add(1, Ordering::Relaxed);
                &self.skipped
            }
            IngestOutcome::Skipped(_) => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fetch → locate → decode → persist, one signature at a time.
pub struct IngestPipeline {
    rpc: Arc<dyn LedgerRpc>,
    sink: Arc<dyn PoolSink>,
    program_id: String,
    fetch_config: FetchConfig,
    stats: Arc<IngestStats>,
}

impl IngestPipeline {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        sink: Arc<dyn PoolSink>,
        program_id: impl Into<String>,
    ) -> Self {
        Self {
            rpc,
            sink,
            program_id: program_id.into(),
            fetch_config: FetchConfig::default(),
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn with_fetch_config(mut self, fetch_config: FetchConfig) -> Self {
        self.fetch_config = fetch_config;
        self
    }

    pub fn program_id(&self) -> &str {
        &self.program_id
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    pub async fn ingest(&self, signature: &str) -> IngestOutcome {
        let outcome = match self.rpc.get_transaction(signature, &self.fetch_config).await {
            Ok(Some(tx)) => self.process_transaction(signature, tx).await,
            Ok(None) => {
                debug!(signature, "no transaction details found");
                IngestOutcome::Skipped(SkipReason::TransactionNotFound)
            }
            Err(e) => {
                error!(signature, error = %e, "error fetching transaction");
                IngestOutcome::Skipped(SkipReason::FetchFailed)
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    /// Everything after the fetch. Persists at most one pool.
    pub async fn process_transaction(
        &self,
        signature: &str,
        tx: TransactionEnvelope,
    ) -> IngestOutcome {
        let pool = match self.decode_transaction(tx) {
            Ok(Some(pool)) => pool,
            Ok(None) => return IngestOutcome::Skipped(SkipReason::NoPoolInstruction),
            Err(Error::MalformedInstruction { reason }) => {
                warn!(signature, %reason, "skipping malformed pool instruction");
                return IngestOutcome::Skipped(SkipReason::MalformedInstruction);
            }
            Err(Error::AddressWrap { offset, value }) => {
                trace!(signature, offset, %value, "address wrap fault, ignoring transaction");
                return IngestOutcome::Skipped(SkipReason::AddressFault);
            }
            Err(e) => {
                error!(signature, error = %e, "error processing transaction");
                return IngestOutcome::Skipped(SkipReason::Failed);
            }
        };

        self.persist(signature, &pool).await;
        IngestOutcome::Ingested(pool)
    }

    fn decode_transaction(&self, tx: TransactionEnvelope) -> Result<Option<PoolDescriptor>, Error> {
        let message = tx.into_message().resolve();
        debug!(
            accounts = ?message.account_keys,
            instructions = message.instructions.as_ref().map(Vec::len),
            "resolved transaction message"
        );

        let Some(ix) = locate_instruction(
            message.instructions.as_deref(),
            &message.account_keys,
            &self.program_id,
        ) else {
            return Ok(None);
        };

        decode_pool(ix, &message.account_keys).map(|pool| Some(canonicalize(pool)))
    }

    async fn persist(&self, signature: &str, pool: &PoolDescriptor) {
        match self.sink.insert(pool).await {
            Ok(ack) if ack.acknowledged => {
                info!(
                    signature,
                    amm_id = %pool.amm_id,
                    inserted_id = ack.inserted_id.as_deref().unwrap_or("-"),
                    "pool saved"
                );
            }
            Ok(_) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(signature, amm_id = %pool.amm_id, "pool write not acknowledged");
            }
            Err(e) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(signature, amm_id = %pool.amm_id, error = %e, "error saving pool");
            }
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use solana_pubkey::Pubkey;

    use super::*;
    use crate::ingest::adapters::InsertAck;
    use crate::protocols::{RAYDIUM_AMM_V4_PROGRAM_ID, WSOL_MINT};

    #[derive(Default)]
    struct FakeRpc {
        transactions: HashMap<String, serde_json::Value>,
        fail: bool,
    }

    #[async_trait]
    impl LedgerRpc for FakeRpc {
        async fn get_transaction(
            &self,
            signature: &str,
            _config: &FetchConfig,
        ) -> Result<Option<TransactionEnvelope>, Error> {
            if self.fail {
                return Err(Error::Rpc {
                    reason: "connection refused".into(),
                });
            }
            self.transactions
                .get(signature)
                .map(|v| serde_json::from_value(v.clone()).map_err(Error::from))
                .transpose()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        pools: Mutex<Vec<PoolDescriptor>>,
        mode: SinkMode,
    }

    #[derive(Default, Clone, Copy)]
    enum SinkMode {
        #[default]
        Ack,
        Unacknowledged,
        Fail,
    }

    #[async_trait]
    impl PoolSink for RecordingSink {
        async fn insert(&self, pool: &PoolDescriptor) -> Result<InsertAck, Error> {
            self.pools.lock().unwrap().push(pool.clone());
            match self.mode {
                SinkMode::Ack => Ok(InsertAck {
                    acknowledged: true,
                    inserted_id: Some("id".into()),
                }),
                SinkMode::Unacknowledged => Ok(InsertAck {
                    acknowledged: false,
                    inserted_id: None,
                }),
                SinkMode::Fail => Err(Error::Persistence {
                    reason: "write timed out".into(),
                }),
            }
        }
    }

    fn key(n: u8) -> String {
        Pubkey::new_from_array([n; 32]).to_string()
    }

    /// `[P, A1..A18]` with `P` the AMM program and WSOL at instruction offset 8.
    fn account_keys() -> Vec<String> {
        let mut keys = vec![RAYDIUM_AMM_V4_PROGRAM_ID.to_string()];
        keys.extend((1..=18).map(key));
        keys[8] = WSOL_MINT.to_string();
        keys
    }

    fn tx_json(account_keys: &[String], instructions: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "slot": 250_000_000,
            "blockTime": 1_700_000_000,
            "version": "legacy",
            "transaction": {
                "signatures": ["sig"],
                "message": { "accountKeys": account_keys, "instructions": instructions }
            },
            "meta": { "err": null }
        })
    }

    fn pool_ix(accounts: &[u8], data: &str) -> serde_json::Value {
        serde_json::json!({ "programIdIndex": 0, "accounts": accounts, "data": data })
    }

    fn pipeline(rpc: FakeRpc, sink: Arc<RecordingSink>) -> IngestPipeline {
        IngestPipeline::new(Arc::new(rpc), sink, RAYDIUM_AMM_V4_PROGRAM_ID)
    }

    fn rpc_with(signature: &str, tx: serde_json::Value) -> FakeRpc {
        FakeRpc {
            transactions: HashMap::from([(signature.to_string(), tx)]),
            fail: false,
        }
    }

    fn all_accounts() -> Vec<u8> {
        (0..18).collect()
    }

    #[tokio::test]
    async fn end_to_end_pool_creation_is_normalized_and_saved_once() {
        let keys = account_keys();
        let tx = tx_json(&keys, serde_json::json!([pool_ix(&all_accounts(), "2")]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        let outcome = pipeline.ingest("sig").await;
        let IngestOutcome::Ingested(pool) = &outcome else {
            panic!("expected Ingested, got {outcome:?}");
        };

        assert_eq!(pool.coin_mint, keys[9]);
        assert_eq!(pool.pc_mint, WSOL_MINT);
        assert_eq!(pool.coin_vault, keys[10]);
        assert_eq!(pool.pc_vault, keys[11]);
        assert_eq!(pool.program_id, RAYDIUM_AMM_V4_PROGRAM_ID);
        assert_eq!(pool.deployer, keys[17]);

        let saved = sink.pools.lock().unwrap();
        assert_eq!(saved.as_slice(), std::slice::from_ref(pool));
        assert_eq!(pipeline.stats().snapshot().ingested, 1);
    }

    #[tokio::test]
    async fn unknown_signature_is_skipped_without_write() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(FakeRpc::default(), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("missing").await,
            IngestOutcome::Skipped(SkipReason::TransactionNotFound)
        );
        assert!(sink.pools.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rpc_failure_is_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let rpc = FakeRpc {
            fail: true,
            ..FakeRpc::default()
        };
        let pipeline = pipeline(rpc, Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::FetchFailed)
        );
        assert!(sink.pools.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transaction_without_amm_instruction_is_skipped() {
        let keys = account_keys();
        let other_program = serde_json::json!({
            "programIdIndex": 1, "accounts": all_accounts(), "data": "2"
        });
        let empty_payload = pool_ix(&all_accounts(), "");
        let tx = tx_json(&keys, serde_json::json!([other_program, empty_payload]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::NoPoolInstruction)
        );
        assert!(sink.pools.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_instruction_list_is_skipped() {
        let tx = serde_json::json!({
            "slot": 1,
            "transaction": { "message": { "accountKeys": account_keys() } }
        });
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::NoPoolInstruction)
        );
    }

    #[tokio::test]
    async fn short_account_list_is_malformed_and_not_saved() {
        let keys = account_keys();
        let short: Vec<u8> = (0..17).collect();
        let tx = tx_json(&keys, serde_json::json!([pool_ix(&short, "2")]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::MalformedInstruction)
        );
        assert!(sink.pools.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn absent_account_list_is_malformed() {
        let keys = account_keys();
        let ix = serde_json::json!({ "programIdIndex": 0, "data": "2" });
        let tx = tx_json(&keys, serde_json::json!([ix]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::MalformedInstruction)
        );
    }

    #[tokio::test]
    async fn only_first_matching_instruction_is_decoded() {
        let keys = account_keys();
        let mut shifted = all_accounts();
        shifted.rotate_left(1);
        let tx = tx_json(
            &keys,
            serde_json::json!([pool_ix(&all_accounts(), "2"), pool_ix(&shifted, "3")]),
        );
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        let outcome = pipeline.ingest("sig").await;
        assert_eq!(outcome.pool().unwrap().amm_id, keys[4]);
        assert_eq!(sink.pools.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn address_fault_is_counted_not_saved() {
        let mut keys = account_keys();
        keys[4] = "not-an-address".to_string();
        let tx = tx_json(&keys, serde_json::json!([pool_ix(&all_accounts(), "2")]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::AddressFault)
        );
        assert!(sink.pools.lock().unwrap().is_empty());

        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.address_faults, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn undecodable_pool_payload_does_not_match() {
        let keys = account_keys();
        let tx = tx_json(&keys, serde_json::json!([pool_ix(&all_accounts(), "0OIl")]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::NoPoolInstruction)
        );
        assert!(sink.pools.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_payload_on_other_instruction_does_not_block_pool() {
        let keys = account_keys();
        let tx = tx_json(
            &keys,
            serde_json::json!([
                { "programIdIndex": 1, "accounts": [], "data": "0" },
                pool_ix(&all_accounts(), "2")
            ]),
        );
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        let outcome = pipeline.ingest("sig").await;
        assert_eq!(outcome.pool().unwrap().amm_id, keys[4]);
        assert_eq!(sink.pools.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn byte_array_payload_from_client_libraries_is_ingested() {
        let keys = account_keys();
        let tx = serde_json::json!({
            "slot": 250_000_000,
            "version": 0,
            "transaction": {
                "signatures": ["sig"],
                "message": {
                    "staticAccountKeys": keys,
                    "compiledInstructions": [
                        { "programIdIndex": 0, "accountKeyIndexes": all_accounts(), "data": [1] }
                    ],
                    "addressTableLookups": []
                }
            },
            "meta": { "err": null, "loadedAddresses": { "writable": [], "readonly": [] } }
        });
        let sink = Arc::new(RecordingSink::default());
        let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

        let outcome = pipeline.ingest("sig").await;
        let pool = outcome.pool().unwrap();
        assert_eq!(pool.pc_mint, WSOL_MINT);
        assert_eq!(pool.coin_mint, keys[9]);
        assert_eq!(sink.pools.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn write_failures_still_return_the_pool() {
        for mode in [SinkMode::Unacknowledged, SinkMode::Fail] {
            let keys = account_keys();
            let tx = tx_json(&keys, serde_json::json!([pool_ix(&all_accounts(), "2")]));
            let sink = Arc::new(RecordingSink {
                mode,
                ..RecordingSink::default()
            });
            let pipeline = pipeline(rpc_with("sig", tx), Arc::clone(&sink));

            let outcome = pipeline.ingest("sig").await;
            assert_eq!(outcome.pool().unwrap().pc_mint, WSOL_MINT);
            assert_eq!(sink.pools.lock().unwrap().len(), 1);

            let stats = pipeline.stats().snapshot();
            assert_eq!(stats.ingested, 1);
            assert_eq!(stats.write_failures, 1);
        }
    }

    #[tokio::test]
    async fn custom_program_id_is_respected() {
        let keys = account_keys();
        let tx = tx_json(&keys, serde_json::json!([pool_ix(&all_accounts(), "2")]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = IngestPipeline::new(
            Arc::new(rpc_with("sig", tx)),
            Arc::clone(&sink) as Arc<dyn PoolSink>,
            key(200),
        );

        assert_eq!(
            pipeline.ingest("sig").await,
            IngestOutcome::Skipped(SkipReason::NoPoolInstruction)
        );
    }
}
