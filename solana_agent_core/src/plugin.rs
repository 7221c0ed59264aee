//! Plugins: named bundles of methods and actions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use serde_json::Value;

use crate::actions::Action;
use crate::agent::{Agent, WeakAgent};

pub type MethodFuture = BoxFuture<'static, Result<Value>>;

/// An unbound method: takes the agent as its leading argument.
pub type MethodFn = Arc<dyn Fn(Agent, Value) -> MethodFuture + Send + Sync>;

/// Box an async closure into a [`MethodFn`].
pub fn method_fn<F, Fut>(f: F) -> MethodFn
where
    F: Fn(Agent, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |agent, input| Box::pin(f(agent, input)))
}

/// Ordered name → method table contributed by a plugin.
#[derive(Clone, Default)]
pub struct MethodTable {
    entries: Vec<(String, MethodFn)>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F, Fut>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Agent, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.insert(name, method_fn(f));
        self
    }

    /// Insert or replace a method, keeping its original position.
    pub fn insert(&mut self, name: &str, f: MethodFn) {
        match self.entries.iter().position(|(existing, _)| existing == name) {
            Some(i) => self.entries[i].1 = f,
            None => self.entries.push((name.to_string(), f)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl IntoIterator for MethodTable {
    type Item = (String, MethodFn);
    type IntoIter = std::vec::IntoIter<(String, MethodFn)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A method with its agent applied. Holds a weak reference so the agent's
/// own method registry does not keep it alive; wallet swaps are visible
/// because the agent is read at call time.
#[derive(Clone)]
pub struct BoundMethod {
    name: String,
    plugin: String,
    agent: WeakAgent,
    f: MethodFn,
}

impl BoundMethod {
    pub(crate) fn new(name: String, plugin: String, agent: WeakAgent, f: MethodFn) -> Self {
        Self {
            name,
            plugin,
            agent,
            f,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin that contributed this binding.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub async fn call(&self, input: Value) -> Result<Value> {
        let agent = self
            .agent
            .upgrade()
            .ok_or_else(|| anyhow!("agent behind method '{}' has been dropped", self.name))?;
        (self.f)(agent, input).await
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .field("plugin", &self.plugin)
            .finish()
    }
}

/// A bundle of methods and actions registered with [`Agent::use_plugin`].
///
/// `methods` are bound to the agent before `initialize` runs, but neither they
/// nor the actions are visible to callers until `initialize` returns `Ok`.
/// `initialize` should only warn about missing optional configuration
/// ([`Agent::require_config`]); returning an error aborts the registration.
/// It must not register other plugins: a nested [`Agent::use_plugin`] fails
/// with [`AgentError::NestedRegistration`](crate::AgentError::NestedRegistration).
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn methods(&self) -> MethodTable {
        MethodTable::new()
    }

    fn actions(&self) -> Vec<Arc<dyn Action>>;

    fn initialize(&self, _agent: &Agent) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_keeps_order_and_replaces_in_place() {
        let table = MethodTable::new()
            .with("a", |_, _| async { Ok(json!(1)) })
            .with("b", |_, _| async { Ok(json!(2)) })
            .with("a", |_, _| async { Ok(json!(3)) });

        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.len(), 2);
        assert_eq!(format!("{table:?}"), r#"["a", "b"]"#);
    }
}
