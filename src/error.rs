#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parse error: {reason}")]
    Parse { reason: String },

    #[error("malformed instruction: {reason}")]
    MalformedInstruction { reason: String },

    #[error("cannot wrap account at offset {offset} as an address: {value}")]
    AddressWrap { offset: usize, value: String },

    #[error("rpc error: {reason}")]
    Rpc { reason: String },

    #[error("persistence error: {reason}")]
    Persistence { reason: String },

    #[error("config error: {0}")]
    Config(#[from] envy::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
