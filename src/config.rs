use std::str::FromStr;

use serde::Deserialize;
use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::ingest::adapters::Commitment;
use crate::protocols::RAYDIUM_AMM_V4_PROGRAM_ID;

/// Process settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub solana_rpc_url: String,
    #[serde(default = "default_program_id")]
    pub raydium_amm_program_id: String,
    pub mongo_uri: Option<String>,
    #[serde(default = "default_database")]
    pub mongo_database: String,
    #[serde(default = "default_collection")]
    pub mongo_collection: String,
    #[serde(default)]
    pub commitment: Commitment,
}

fn default_program_id() -> String {
    RAYDIUM_AMM_V4_PROGRAM_ID.to_string()
}

fn default_database() -> String {
    "bot".to_string()
}

fn default_collection() -> String {
    "raydium_lp_transactions".to_string()
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        Pubkey::from_str(&self.raydium_amm_program_id).map_err(|e| Error::Parse {
            reason: format!(
                "RAYDIUM_AMM_PROGRAM_ID {} is not a pubkey: {e}",
                self.raydium_amm_program_id
            ),
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config =
            Config::from_vars(vars(&[("SOLANA_RPC_URL", "http://localhost:8899")])).unwrap();
        assert_eq!(config.solana_rpc_url, "http://localhost:8899");
        assert_eq!(config.raydium_amm_program_id, RAYDIUM_AMM_V4_PROGRAM_ID);
        assert_eq!(config.mongo_uri, None);
        assert_eq!(config.mongo_database, "bot");
        assert_eq!(config.mongo_collection, "raydium_lp_transactions");
        assert_eq!(config.commitment, Commitment::Confirmed);
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let config = Config::from_vars(vars(&[
            ("SOLANA_RPC_URL", "http://rpc"),
            ("MONGO_URI", "mongodb://localhost:27017"),
            ("MONGO_DATABASE", "pools"),
            ("COMMITMENT", "finalized"),
        ]))
        .unwrap();
        assert_eq!(config.mongo_uri.as_deref(), Some("mongodb://localhost:27017"));
        assert_eq!(config.mongo_database, "pools");
        assert_eq!(config.commitment, Commitment::Finalized);
    }

    #[test]
    fn missing_rpc_url_is_a_config_error() {
        let result = Config::from_vars(vars(&[("MONGO_URI", "mongodb://x")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn invalid_program_id_is_rejected() {
        let result = Config::from_vars(vars(&[
            ("SOLANA_RPC_URL", "http://rpc"),
            ("RAYDIUM_AMM_PROGRAM_ID", "nope"),
        ]));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
