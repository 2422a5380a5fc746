#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod protocols;
pub mod types;

#[cfg(feature = "rpc")]
pub mod rpc;
#[cfg(feature = "mongo")]
pub mod store;

pub use config::Config;
pub use error::Error;
pub use ingest::adapters::{Commitment, FetchConfig, InsertAck, LedgerRpc, PoolSink};
pub use ingest::{IngestOutcome, IngestPipeline, IngestStats, SkipReason, StatsSnapshot};
pub use protocols::raydium_amm::{PoolDescriptor, PoolField, canonicalize, decode_pool};
pub use protocols::{RAYDIUM_AMM_V4_PROGRAM_ID, WSOL_MINT, locate_instruction};
pub use types::{
    InstructionPayload, RawInstruction, ResolvedMessage, TransactionEnvelope, TransactionMessage,
};
