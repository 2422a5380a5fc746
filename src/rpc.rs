use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcRequest;

use crate::error::Error;
use crate::ingest::adapters::{FetchConfig, LedgerRpc};
use crate::types::TransactionEnvelope;

/// [`LedgerRpc`] over a Solana JSON-RPC endpoint. Single attempt per call.
pub struct SolanaRpc {
    client: RpcClient,
}

impl SolanaRpc {
    pub fn new(rpc_url: String) -> Self {
        Self {
            client: RpcClient::new(rpc_url),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn get_transaction(
        &self,
        signature: &str,
        config: &FetchConfig,
    ) -> Result<Option<TransactionEnvelope>, Error> {
        self.client
            .send::<Option<TransactionEnvelope>>(
                RpcRequest::GetTransaction,
                serde_json::json!([signature, config]),
            )
            .await
            .map_err(|e| Error::Rpc {
                reason: format!("getTransaction {signature}: {e}"),
            })
    }
}
