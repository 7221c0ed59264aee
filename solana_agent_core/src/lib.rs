//! Core of the Solana agent kit: actions, plugins, and the agent that
//! composes them.
//!
//! An [`Agent`] starts with a wallet, a chain client and an [`AgentConfig`].
//! Plugins are registered with [`Agent::use_plugin`]; each contributes bound
//! methods and schema-checked [`Action`]s. Callers (or an LLM tool runtime,
//! via [`Agent::tool_definitions`]) invoke actions by name or simile with
//! [`Agent::execute`] and always get an [`Envelope`] back.

pub mod actions;
pub mod agent;
pub mod chain;
pub mod config;
pub mod envelope;
pub mod error;
pub mod plugin;
pub mod schema;
pub mod transaction;
pub mod units;
pub mod wallet;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use actions::{Action, ActionExample, ActionMetadata, ActionRegistry, RegisteredAction};
pub use agent::{Agent, AgentBuilder};
pub use chain::{parse_pubkey, ChainClient};
pub use config::{AgentConfig, ConfigWarning};
pub use envelope::Envelope;
pub use error::{AgentError, AgentResult};
pub use plugin::{method_fn, BoundMethod, MethodFn, MethodTable, Plugin};
pub use schema::{Schema, SchemaError, Validation, Violation};
pub use transaction::{decode_transaction, encode_transaction, submit_encoded, TransactionSender, TxOutcome, WalletSender};
pub use wallet::{partial_sign, KeypairWallet, Wallet};

// Re-exported so plugin crates build transactions against the same SDK.
pub use solana_sdk;
