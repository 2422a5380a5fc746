use tracing::debug;

use crate::error::Error;

/// A `getTransaction` result as returned by the JSON-RPC endpoint (`encoding: "json"`).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    /// Solana slot in which the transaction landed.
    pub slot: u64,
    /// Estimated production time (unix seconds), if the node knows it.
    pub block_time: Option<i64>,
    /// `"legacy"` or a numeric version (`0`). Absent on nodes without versioned transaction support.
    #[serde(default)]
    pub version: Option<serde_json::Value>,
    pub transaction: UiTransaction,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct UiTransaction {
    /// Transaction signatures (base58); the first one identifies the transaction.
    #[serde(default)]
    pub signatures: Vec<String>,
    pub message: UiMessage,
}

/// Wire form of a transaction message.
///
/// Legacy messages list every account in `accountKeys`. Versioned messages list only the
/// static keys there (`staticAccountKeys` in some client libraries) and pull the rest from
/// address lookup tables, reported in [`TransactionMeta::loaded_addresses`].
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    #[serde(alias = "staticAccountKeys")]
    pub account_keys: Vec<String>,
    /// Top-level instructions. `None` when the payload carries no instruction list at all.
    #[serde(default, alias = "compiledInstructions")]
    pub instructions: Option<Vec<UiCompiledInstruction>>,
    #[serde(default)]
    pub address_table_lookups: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiCompiledInstruction {
    /// Index of the invoked program in the account key table.
    pub program_id_index: u8,
    /// Indices into the account key table, in the order the program expects them.
    #[serde(default, alias = "accountKeyIndexes")]
    pub accounts: Option<Vec<u8>>,
    /// Instruction payload: base58 from the JSON-RPC endpoint, raw bytes from client libraries.
    #[serde(default)]
    pub data: InstructionPayload,
    #[serde(default)]
    pub stack_height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum InstructionPayload {
    Base58(String),
    Bytes(Vec<u8>),
}

impl Default for InstructionPayload {
    fn default() -> Self {
        Self::Base58(String::new())
    }
}

impl InstructionPayload {
    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Base58(encoded) => bs58::decode(encoded).into_vec().map_err(|e| Error::Parse {
                reason: format!("instruction data is not base58: {e}"),
            }),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub loaded_addresses: Option<LoadedAddresses>,
}

/// Addresses resolved from lookup tables, appended after the static keys (writable first).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct LoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}

/// The two message encodings a ledger node can hand back.
#[derive(Debug, Clone)]
pub enum TransactionMessage {
    Legacy {
        account_keys: Vec<String>,
        instructions: Option<Vec<UiCompiledInstruction>>,
    },
    Versioned {
        static_account_keys: Vec<String>,
        loaded_addresses: LoadedAddresses,
        instructions: Option<Vec<UiCompiledInstruction>>,
    },
}

/// A top-level instruction with its payload decoded, ready for the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    /// Index of the invoked program in the account key table.
    pub program_id_index: usize,
    /// Account indices, if the instruction carried a list.
    pub accounts: Option<Vec<usize>>,
    /// Raw instruction payload. Empty when the wire payload could not be decoded.
    pub data: Vec<u8>,
}

/// A message flattened to one ordered account key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub account_keys: Vec<String>,
    pub instructions: Option<Vec<RawInstruction>>,
}

impl TransactionEnvelope {
    pub fn is_versioned(&self) -> bool {
        matches!(self.version, Some(serde_json::Value::Number(_)))
    }

    pub fn into_message(self) -> TransactionMessage {
        let versioned = self.is_versioned();
        let UiMessage {
            account_keys,
            instructions,
            ..
        } = self.transaction.message;

        if versioned {
            let loaded_addresses = self
                .meta
                .and_then(|m| m.loaded_addresses)
                .unwrap_or_default();
            TransactionMessage::Versioned {
                static_account_keys: account_keys,
                loaded_addresses,
                instructions,
            }
        } else {
            TransactionMessage::Legacy {
                account_keys,
                instructions,
            }
        }
    }
}

impl TransactionMessage {
    pub fn resolve(self) -> ResolvedMessage {
        let (account_keys, instructions) = match self {
            Self::Legacy {
                account_keys,
                instructions,
            } => (account_keys, instructions),
            Self::Versioned {
                mut static_account_keys,
                loaded_addresses,
                instructions,
            } => {
                static_account_keys.extend(loaded_addresses.writable);
                static_account_keys.extend(loaded_addresses.readonly);
                (static_account_keys, instructions)
            }
        };

        let instructions =
            instructions.map(|list| list.into_iter().map(RawInstruction::from).collect());

        ResolvedMessage {
            account_keys,
            instructions,
        }
    }
}

impl From<UiCompiledInstruction> for RawInstruction {
    /// An undecodable payload becomes empty, so the locator never picks that instruction.
    fn from(ix: UiCompiledInstruction) -> Self {
        let data = ix.data.decode().unwrap_or_else(|e| {
            debug!(
                program_id_index = ix.program_id_index,
                error = %e,
                "dropping instruction payload"
            );
            Vec::new()
        });
        Self {
            program_id_index: usize::from(ix.program_id_index),
            accounts: ix
                .accounts
                .map(|list| list.into_iter().map(usize::from).collect()),
            data,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn envelope(value: serde_json::Value) -> TransactionEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn legacy_message_keeps_flat_key_table() {
        let tx = envelope(serde_json::json!({
            "slot": 1,
            "blockTime": null,
            "version": "legacy",
            "transaction": {
                "signatures": ["sig"],
                "message": {
                    "accountKeys": ["a", "b", "c"],
                    "instructions": [
                        { "programIdIndex": 2, "accounts": [0, 1], "data": "2" }
                    ]
                }
            },
            "meta": { "err": null, "loadedAddresses": { "writable": ["x"], "readonly": [] } }
        }));
        assert!(!tx.is_versioned());

        let resolved = tx.into_message().resolve();
        assert_eq!(resolved.account_keys, vec!["a", "b", "c"]);
        let instructions = resolved.instructions.unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].program_id_index, 2);
        assert_eq!(instructions[0].accounts, Some(vec![0, 1]));
        assert_eq!(instructions[0].data, vec![1]);
    }

    #[test]
    fn versioned_message_appends_loaded_addresses() {
        let tx = envelope(serde_json::json!({
            "slot": 1,
            "version": 0,
            "transaction": {
                "signatures": ["sig"],
                "message": {
                    "accountKeys": ["a", "b"],
                    "instructions": [],
                    "addressTableLookups": [{}]
                }
            },
            "meta": { "loadedAddresses": { "writable": ["w"], "readonly": ["r1", "r2"] } }
        }));
        assert!(tx.is_versioned());

        let resolved = tx.into_message().resolve();
        assert_eq!(resolved.account_keys, vec!["a", "b", "w", "r1", "r2"]);
        assert_eq!(resolved.instructions, Some(vec![]));
    }

    #[test]
    fn versioned_message_without_meta_uses_static_keys() {
        let tx = envelope(serde_json::json!({
            "slot": 1,
            "version": 0,
            "transaction": { "message": { "accountKeys": ["a"], "instructions": [] } }
        }));
        let resolved = tx.into_message().resolve();
        assert_eq!(resolved.account_keys, vec!["a"]);
    }

    #[test]
    fn client_library_field_names_are_accepted() {
        let tx = envelope(serde_json::json!({
            "slot": 1,
            "version": 0,
            "transaction": {
                "message": {
                    "staticAccountKeys": ["a", "b"],
                    "compiledInstructions": [
                        { "programIdIndex": 1, "accountKeyIndexes": [0], "data": [1] },
                        { "programIdIndex": 1, "accountKeyIndexes": [], "data": [] }
                    ]
                }
            }
        }));
        let resolved = tx.into_message().resolve();
        let instructions = resolved.instructions.unwrap();
        assert_eq!(instructions[0].accounts, Some(vec![0]));
        assert_eq!(instructions[0].data, vec![1]);
        assert!(instructions[1].data.is_empty());
    }

    #[test]
    fn missing_instruction_list_and_account_list_stay_absent() {
        let tx = envelope(serde_json::json!({
            "slot": 1,
            "transaction": { "message": { "accountKeys": ["a"] } }
        }));
        let resolved = tx.into_message().resolve();
        assert_eq!(resolved.instructions, None);

        let ix = RawInstruction::from(UiCompiledInstruction {
            program_id_index: 0,
            accounts: None,
            data: InstructionPayload::Base58("2".to_string()),
            stack_height: None,
        });
        assert_eq!(ix.accounts, None);
        assert_eq!(ix.data, vec![1]);
    }

    #[test]
    fn payload_forms_decode_to_bytes() {
        assert_eq!(
            InstructionPayload::Base58("2".to_string()).decode().unwrap(),
            vec![1]
        );
        assert_eq!(
            InstructionPayload::Bytes(vec![1, 254]).decode().unwrap(),
            vec![1, 254]
        );
        assert!(matches!(
            InstructionPayload::Base58("0OIl".to_string()).decode(),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn undecodable_payload_only_empties_its_own_instruction() {
        let tx = envelope(serde_json::json!({
            "slot": 1,
            "transaction": {
                "message": {
                    "accountKeys": ["pool_program", "other_program"],
                    "instructions": [
                        { "programIdIndex": 1, "accounts": [], "data": "0" },
                        { "programIdIndex": 0, "accounts": [0], "data": "2" }
                    ]
                }
            }
        }));
        let instructions = tx.into_message().resolve().instructions.unwrap();
        assert_eq!(instructions.len(), 2);
        assert!(instructions[0].data.is_empty());
        assert_eq!(instructions[1].data, vec![1]);
    }
}
