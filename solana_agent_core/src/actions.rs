use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::agent::Agent;
use crate::envelope::Envelope;
use crate::error::{AgentError, AgentResult};
use crate::schema::{join_violations, Schema, Validation};

/// Minimum word overlap for a fuzzy simile match.
const SIMILE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExample {
    pub input: Value,
    pub output: Value,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    pub name: String,
    pub similes: Vec<String>,
    pub description: String,
    pub examples: Vec<ActionExample>,
    pub input_schema: Value,
}

impl ActionMetadata {
    /// OpenAI-style function tool definition.
    pub fn tool_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// A unit of agent-invocable work.
///
/// `call` only ever sees input that passed `input_schema`, with defaults
/// filled in. It may fail freely: the invocation layer turns errors and
/// panics into error envelopes.
#[async_trait]
pub trait Action: Send + Sync {
    fn metadata(&self) -> &ActionMetadata;

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value>;
}

/// An action accepted into a registry, with its checked schema and owner.
pub struct RegisteredAction {
    action: Arc<dyn Action>,
    schema: Schema,
    plugin: String,
}

impl RegisteredAction {
    /// Check the action's schema and examples.
    pub fn new(plugin: &str, action: Arc<dyn Action>) -> AgentResult<Self> {
        let meta = action.metadata();
        let schema = Schema::new(meta.input_schema.clone()).map_err(|source| AgentError::InvalidSchema {
            action: meta.name.clone(),
            source,
        })?;

        for (index, example) in meta.examples.iter().enumerate() {
            if let Validation::Invalid(violations) = schema.validate(&example.input) {
                return Err(AgentError::InvalidExample {
                    action: meta.name.clone(),
                    index,
                    reason: join_violations(&violations),
                });
            }
        }

        Ok(Self {
            action,
            schema,
            plugin: plugin.to_string(),
        })
    }

    pub fn metadata(&self) -> &ActionMetadata {
        self.action.metadata()
    }

    pub fn name(&self) -> &str {
        &self.action.metadata().name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    /// Validate, run the handler, and wrap whatever comes back.
    pub async fn invoke(&self, agent: &Agent, input: Value) -> Envelope {
        let name = self.name();
        let input = match self.schema.validate(&input) {
            Validation::Valid(input) => input,
            Validation::Invalid(violations) => {
                debug!(action = name, violations = violations.len(), "rejected invalid input");
                return Envelope::error(join_violations(&violations));
            }
        };

        match AssertUnwindSafe(self.action.call(agent, input)).catch_unwind().await {
            Ok(Ok(value)) => Envelope::from_handler(value),
            Ok(Err(err)) => {
                warn!(action = name, error = %format!("{err:#}"), "action failed");
                Envelope::from_error(&err)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(action = name, %reason, "action panicked");
                Envelope::error(format!("{name} panicked: {reason}"))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Ordered action registry. Names are unique; registration order is kept
/// and decides simile ties.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: Vec<Arc<RegisteredAction>>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a plugin's whole contribution before anything is merged.
    pub fn prepare(
        &self,
        plugin: &str,
        actions: Vec<Arc<dyn Action>>,
    ) -> AgentResult<Vec<RegisteredAction>> {
        let prepared = actions
            .into_iter()
            .map(|action| RegisteredAction::new(plugin, action))
            .collect::<AgentResult<Vec<_>>>()?;
        self.check_unclaimed(plugin, &prepared)?;
        Ok(prepared)
    }

    /// Reject names already taken here or repeated within `entries`.
    pub fn check_unclaimed(&self, plugin: &str, entries: &[RegisteredAction]) -> AgentResult<()> {
        let mut seen = HashSet::new();
        for entry in entries {
            let name = entry.name();
            if let Some(existing) = self.get(name) {
                return Err(AgentError::DuplicateAction {
                    action: name.to_string(),
                    plugin: plugin.to_string(),
                    existing: existing.plugin().to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(AgentError::DuplicateAction {
                    action: name.to_string(),
                    plugin: plugin.to_string(),
                    existing: plugin.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Append entries returned by [`prepare`](Self::prepare).
    pub fn extend(&mut self, prepared: Vec<RegisteredAction>) {
        for entry in prepared {
            self.index.insert(entry.name().to_string(), self.actions.len());
            self.actions.push(Arc::new(entry));
        }
    }

    pub fn register<A>(&mut self, plugin: &str, action: A) -> AgentResult<()>
    where
        A: Action + 'static,
    {
        let prepared = self.prepare(plugin, vec![Arc::new(action) as Arc<dyn Action>])?;
        self.extend(prepared);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredAction>> {
        self.index.get(name).map(|&i| self.actions[i].clone())
    }

    /// Find an action by exact name, then normalized name (`get balance` →
    /// `GET_BALANCE`), then exact simile, then best simile word overlap.
    pub fn resolve(&self, query: &str) -> Option<Arc<RegisteredAction>> {
        let query = query.trim();
        if let Some(hit) = self.get(query) {
            return Some(hit);
        }
        if let Some(hit) = self.get(&normalize_name(query)) {
            return Some(hit);
        }

        let lowered = query.to_lowercase();
        if let Some(hit) = self.actions.iter().find(|entry| {
            entry
                .metadata()
                .similes
                .iter()
                .any(|simile| simile.trim().to_lowercase() == lowered)
        }) {
            return Some(hit.clone());
        }

        let words = word_set(&lowered);
        if words.is_empty() {
            return None;
        }
        let mut best: Option<(f64, &Arc<RegisteredAction>)> = None;
        for entry in &self.actions {
            for simile in &entry.metadata().similes {
                let score = overlap(&words, &word_set(&simile.to_lowercase()));
                if score >= SIMILE_THRESHOLD && best.map_or(true, |(top, _)| score > top) {
                    best = Some((score, entry));
                }
            }
        }
        best.map(|(_, entry)| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn all(&self) -> Vec<Arc<RegisteredAction>> {
        self.actions.clone()
    }

    /// Return metadata for all registered actions, in registration order.
    pub fn metadata(&self) -> Vec<ActionMetadata> {
        self.actions.iter().map(|a| a.metadata().clone()).collect()
    }
}

fn normalize_name(query: &str) -> String {
    query
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

fn word_set(text: &str) -> HashSet<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn overlap(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
