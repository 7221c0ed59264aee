//! Registration and resolution errors.
//!
//! Domain failures inside handlers are `anyhow` errors and never surface as
//! [`AgentError`]; they are rendered into an [`Envelope`](crate::Envelope) by
//! the invocation layer. `AgentError` covers the programming and configuration
//! mistakes that must fail loudly at `use_plugin` time.

use thiserror::Error;

use crate::schema::SchemaError;

/// Errors produced while composing or querying an [`Agent`](crate::Agent).
#[derive(Debug, Error)]
pub enum AgentError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    /// An action name collides with one already registered (or repeats
    /// inside the plugin being registered).
    #[error("action '{action}' from plugin '{plugin}' is already registered by '{existing}'")]
    DuplicateAction {
        action: String,
        plugin: String,
        existing: String,
    },

    /// The action's input schema is not a usable object schema.
    #[error("action '{action}' has an invalid input schema: {source}")]
    InvalidSchema {
        action: String,
        #[source]
        source: SchemaError,
    },

    /// One of the action's documented examples does not satisfy its schema.
    #[error("example #{index} of action '{action}' does not match its schema: {reason}")]
    InvalidExample {
        action: String,
        index: usize,
        reason: String,
    },

    /// The plugin's `initialize` hook failed; the registration was rolled back.
    #[error("plugin '{plugin}' failed to initialize: {reason}")]
    InitializationFailed { plugin: String, reason: String },

    /// `use_plugin` was called from inside another plugin's `initialize`.
    #[error("plugin '{0}' cannot be registered from inside another plugin's initialize")]
    NestedRegistration(String),

    /// No action matched the requested name or simile.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// No bound method with that name.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
