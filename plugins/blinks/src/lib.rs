//! Blinks plugin: execute Solana Actions with the agent's wallet.

pub mod actions;
pub mod client;

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use solana_agent_core::{Action, Agent, MethodTable, Plugin};

use crate::actions::ExecuteBlinkAction;
pub use crate::client::{action_url, ActionPostResponse, BlinksClient};

pub const PLUGIN_NAME: &str = "blinks";

#[derive(Debug, Clone, Default)]
pub struct BlinksPlugin {
    client: Arc<BlinksClient>,
}

impl BlinksPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            client: Arc::new(BlinksClient::new(http)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlinkArgs {
    action_url: String,
    #[serde(default)]
    params: Map<String, Value>,
}

impl Plugin for BlinksPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn methods(&self) -> MethodTable {
        let client = self.client.clone();
        MethodTable::new().with("execute_blink", move |agent: Agent, input: Value| {
            let client = client.clone();
            async move {
                let args: BlinkArgs = serde_json::from_value(input)?;
                let url = action_url(&args.action_url, &args.params)?;
                let (_, outcome) = client.execute(&agent, &url).await?;
                outcome.to_fields()
            }
        })
    }

    fn actions(&self) -> Vec<Arc<dyn Action>> {
        vec![Arc::new(ExecuteBlinkAction::new(self.client.clone()))]
    }

    fn initialize(&self, _agent: &Agent) -> Result<()> {
        Ok(())
    }
}
