use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use anyhow::Result;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use tracing::{debug, info, warn};

use crate::actions::{ActionMetadata, ActionRegistry, RegisteredAction};
use crate::chain::ChainClient;
use crate::config::{AgentConfig, ConfigWarning};
use crate::envelope::Envelope;
use crate::error::{AgentError, AgentResult};
use crate::plugin::{BoundMethod, MethodTable, Plugin};
use crate::transaction::{TransactionSender, TxOutcome, WalletSender};
use crate::wallet::{KeypairWallet, Wallet};

#[derive(Default)]
struct Registry {
    plugins: Vec<Arc<dyn Plugin>>,
    actions: ActionRegistry,
    methods: HashMap<String, BoundMethod>,
}

impl Registry {
    fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Insert bound methods, returning `(method, previous plugin)` for every
    /// method taken over from another plugin.
    fn merge_methods(&mut self, plugin: &str, bound: Vec<BoundMethod>) -> Vec<(String, String)> {
        let mut overridden = Vec::new();
        for method in bound {
            if let Some(previous) = self.methods.insert(method.name().to_string(), method) {
                if previous.plugin() != plugin {
                    overridden.push((previous.name().to_string(), previous.plugin().to_string()));
                }
            }
        }
        overridden
    }
}

struct AgentInner {
    config: AgentConfig,
    chain: Arc<dyn ChainClient>,
    wallet: RwLock<Arc<dyn Wallet>>,
    sender: Arc<dyn TransactionSender>,
    registry: RwLock<Registry>,
    // Serializes `use_plugin` calls; the flag marks a registration in
    // progress on the holding thread.
    registering: ReentrantMutex<Cell<bool>>,
    warnings: Mutex<Vec<ConfigWarning>>,
}

/// Clears the registration flag however `register_plugin` exits.
struct InProgress<'a>(&'a Cell<bool>);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// core struct for interacting with the Solana blockchain.
///
/// Cheap to clone; clones share the wallet and the plugin registries.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

/// Non-owning handle used by bound methods.
#[derive(Clone)]
pub(crate) struct WeakAgent(Weak<AgentInner>);

impl WeakAgent {
    pub(crate) fn upgrade(&self) -> Option<Agent> {
        self.0.upgrade().map(|inner| Agent { inner })
    }
}

pub struct AgentBuilder {
    wallet: Arc<dyn Wallet>,
    chain: Arc<dyn ChainClient>,
    config: AgentConfig,
    sender: Arc<dyn TransactionSender>,
}

impl AgentBuilder {
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`WalletSender`].
    pub fn sender(mut self, sender: Arc<dyn TransactionSender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            inner: Arc::new(AgentInner {
                config: self.config,
                chain: self.chain,
                wallet: RwLock::new(self.wallet),
                sender: self.sender,
                registry: RwLock::new(Registry::default()),
                registering: ReentrantMutex::new(Cell::new(false)),
                warnings: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Agent {
    pub fn new(wallet: Arc<dyn Wallet>, rpc_url: &str, config: AgentConfig) -> Self {
        Self::builder(wallet, Arc::new(RpcClient::new(rpc_url.to_string())))
            .config(config)
            .build()
    }

    /// Agent backed by a base58 secret key.
    pub fn from_secret_key(secret: &str, rpc_url: &str, config: AgentConfig) -> Result<Self> {
        let wallet = KeypairWallet::from_base58(secret)?;
        Ok(Self::new(Arc::new(wallet), rpc_url, config))
    }

    pub fn builder(wallet: Arc<dyn Wallet>, chain: Arc<dyn ChainClient>) -> AgentBuilder {
        AgentBuilder {
            wallet,
            chain,
            config: AgentConfig::default(),
            sender: Arc::new(WalletSender),
        }
    }

    fn downgrade(&self) -> WeakAgent {
        WeakAgent(Arc::downgrade(&self.inner))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    pub fn chain(&self) -> &dyn ChainClient {
        self.inner.chain.as_ref()
    }

    /// The wallet in use right now.
    pub fn wallet(&self) -> Arc<dyn Wallet> {
        self.inner.wallet.read().clone()
    }

    pub fn pubkey(&self) -> Pubkey {
        self.wallet().pubkey()
    }

    /// Swap the wallet, returning the previous one. Methods and actions read
    /// the wallet per call, so the swap is visible to all of them.
    pub fn set_wallet(&self, wallet: Arc<dyn Wallet>) -> Arc<dyn Wallet> {
        let previous = std::mem::replace(&mut *self.inner.wallet.write(), wallet);
        info!(from = %previous.pubkey(), to = %self.pubkey(), "wallet swapped");
        previous
    }

    /// Sign (and unless `SIGN_ONLY`, submit) a transaction with the
    /// configured sender.
    pub async fn sign_or_send(&self, tx: VersionedTransaction) -> Result<TxOutcome> {
        let sender = self.inner.sender.clone();
        sender.sign_or_send(self, tx).await
    }

    /// Register a plugin. Its actions are checked and its methods bound off
    /// to the side, `initialize` runs, and only then is the whole
    /// contribution published under one write lock. Until that commit no
    /// caller can resolve the plugin's actions or methods; if `initialize`
    /// fails nothing is published and its warnings are discarded.
    ///
    /// Returns `&Self` so registrations chain:
    /// `agent.use_plugin(a)?.use_plugin(b)?`.
    pub fn use_plugin<P: Plugin + 'static>(&self, plugin: P) -> AgentResult<&Self> {
        self.use_shared(Arc::new(plugin))
    }

    pub fn use_shared(&self, plugin: Arc<dyn Plugin>) -> AgentResult<&Self> {
        let registering = self.inner.registering.lock();
        if registering.replace(true) {
            return Err(AgentError::NestedRegistration(plugin.name().to_string()));
        }
        let _in_progress = InProgress(&*registering);
        self.register_plugin(plugin)?;
        Ok(self)
    }

    fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> AgentResult<()> {
        let name = plugin.name().to_string();

        let prepared = {
            let registry = self.inner.registry.read();
            if registry.has_plugin(&name) {
                return Err(AgentError::DuplicatePlugin(name));
            }
            registry.actions.prepare(&name, plugin.actions())?
        };
        let methods = self.bind_methods(&name, plugin.methods());

        let warnings_before = self.inner.warnings.lock().len();
        if let Err(err) = plugin.initialize(self) {
            let mut warnings = self.inner.warnings.lock();
            let mut index = 0;
            warnings.retain(|w| {
                index += 1;
                index <= warnings_before || w.plugin != name
            });
            warn!(plugin = %name, error = %format!("{err:#}"), "plugin registration abandoned");
            return Err(AgentError::InitializationFailed {
                plugin: name,
                reason: format!("{err:#}"),
            });
        }

        let added = prepared.len();
        let (overridden, total_actions, total_methods) = {
            let mut registry = self.inner.registry.write();
            registry.actions.check_unclaimed(&name, &prepared)?;
            registry.actions.extend(prepared);
            registry.plugins.push(plugin);
            let overridden = registry.merge_methods(&name, methods);
            (overridden, registry.actions.len(), registry.methods.len())
        };
        self.record_overrides(&name, overridden);

        info!(
            plugin = %name,
            actions = added,
            total_actions,
            total_methods,
            "registered plugin"
        );
        Ok(())
    }

    /// Re-bind an already registered plugin's methods and run its
    /// `initialize` hook again. Actions are untouched.
    pub fn initialize_plugin(&self, plugin: &dyn Plugin) -> Result<()> {
        self.register_methods(plugin.name(), plugin.methods());
        plugin.initialize(self)
    }

    fn bind_methods(&self, plugin: &str, table: MethodTable) -> Vec<BoundMethod> {
        table
            .into_iter()
            .map(|(name, f)| BoundMethod::new(name, plugin.to_string(), self.downgrade(), f))
            .collect()
    }

    /// Bind every method in `table` to this agent and merge the result into
    /// the method registry. Later registrations win; each override of
    /// another plugin's method is logged and recorded as a warning.
    pub fn register_methods(&self, plugin: &str, table: MethodTable) {
        let bound = self.bind_methods(plugin, table);
        let overridden = self.inner.registry.write().merge_methods(plugin, bound);
        self.record_overrides(plugin, overridden);
    }

    fn record_overrides(&self, plugin: &str, overridden: Vec<(String, String)>) {
        for (method, previous_plugin) in overridden {
            self.warn_config(
                plugin,
                &method,
                format!("method '{method}' from plugin '{previous_plugin}' overridden by '{plugin}'"),
            );
        }
    }

    /// Look up an optional configuration key on behalf of `plugin`, warning
    /// (never failing) when it is missing.
    pub fn require_config(&self, plugin: &str, key: &str) -> Option<String> {
        let value = self.config().get(key).filter(|v| !v.is_empty());
        if value.is_none() {
            self.warn_config(plugin, key, format!("{key} is not configured; dependent actions will fail"));
        }
        value
    }

    pub fn warn_config(&self, plugin: &str, key: &str, message: impl Into<String>) {
        let warning = ConfigWarning {
            plugin: plugin.to_string(),
            key: key.to_string(),
            message: message.into(),
        };
        warn!(plugin = %warning.plugin, key = %warning.key, "{}", warning.message);
        self.inner.warnings.lock().push(warning);
    }

    pub fn warnings(&self) -> Vec<ConfigWarning> {
        self.inner.warnings.lock().clone()
    }

    /// Registered plugin names, in registration order.
    pub fn plugins(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .plugins
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Action metadata, in registration order.
    pub fn actions(&self) -> Vec<ActionMetadata> {
        self.inner.registry.read().actions.metadata()
    }

    pub fn action_count(&self) -> usize {
        self.inner.registry.read().actions.len()
    }

    pub fn resolve_action(&self, query: &str) -> Option<Arc<RegisteredAction>> {
        self.inner.registry.read().actions.resolve(query)
    }

    pub fn method(&self, name: &str) -> Option<BoundMethod> {
        self.inner.registry.read().methods.get(name).cloned()
    }

    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.registry.read().methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn call_method(&self, name: &str, input: Value) -> Result<Value> {
        let method = self
            .method(name)
            .ok_or_else(|| AgentError::UnknownMethod(name.to_string()))?;
        method.call(input).await
    }

    /// Resolve an action by name or simile and invoke it. Every outcome,
    /// including unknown actions and invalid input, is an [`Envelope`].
    pub async fn execute(&self, name: &str, input: Value) -> Envelope {
        let Some(entry) = self.resolve_action(name) else {
            warn!(action = name, "no action matched");
            return Envelope::error(AgentError::UnknownAction(name.to_string()).to_string());
        };
        debug!(query = name, action = entry.name(), plugin = entry.plugin(), "invoking action");
        entry.invoke(self, input).await
    }

    /// Execute a tool call whose arguments arrive as a raw JSON string.
    pub async fn execute_tool_call(&self, name: &str, arguments: &str) -> Envelope {
        let input = if arguments.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(arguments) {
                Ok(input) => input,
                Err(err) => return Envelope::error(format!("Invalid tool arguments for {name}: {err}")),
            }
        };
        self.execute(name, input).await
    }

    /// All actions as OpenAI function-calling tool definitions.
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.actions().iter().map(ActionMetadata::tool_definition).collect()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("wallet", &self.pubkey())
            .field("rpc", &self.chain().url())
            .field("plugins", &self.plugins())
            .finish()
    }
}
