use async_trait::async_trait;
use serde::Serialize;

use crate::error::Error;
use crate::protocols::raydium_amm::PoolDescriptor;
use crate::types::TransactionEnvelope;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    serde::Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// Parameters sent with `getTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchConfig {
    pub commitment: Commitment,
    pub max_supported_transaction_version: u8,
    pub encoding: &'static str,
}

impl FetchConfig {
    /// Accepts legacy and v0 transactions.
    pub fn inclusive(commitment: Commitment) -> Self {
        Self {
            commitment,
            max_supported_transaction_version: 0,
            encoding: "json",
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::inclusive(Commitment::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: Option<String>,
}

/// Read side: the ledger node.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `Ok(None)` when the node does not know the signature (unknown, unconfirmed, or pruned).
    async fn get_transaction(
        &self,
        signature: &str,
        config: &FetchConfig,
    ) -> Result<Option<TransactionEnvelope>, Error>;
}

/// Write side: where decoded pools go.
#[async_trait]
pub trait PoolSink: Send + Sync {
    async fn insert(&self, pool: &PoolDescriptor) -> Result<InsertAck, Error>;
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn commitment_roundtrip() {
        assert_eq!(
            "finalized".parse::<Commitment>().ok(),
            Some(Commitment::Finalized)
        );
        assert_eq!("max".parse::<Commitment>().ok(), None);
        assert_eq!(Commitment::Confirmed.to_string(), "confirmed");
    }

    #[test]
    fn default_fetch_config_is_most_inclusive() {
        let params = serde_json::to_value(FetchConfig::default()).unwrap();
        assert_eq!(
            params,
            serde_json::json!({
                "commitment": "confirmed",
                "maxSupportedTransactionVersion": 0,
                "encoding": "json"
            })
        );
    }
}
