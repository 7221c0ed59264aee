use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use solana_agent_core::{Action, ActionExample, ActionMetadata, Agent};

use crate::client::{action_url, BlinksClient};

// =============================================================================
// EXECUTE_BLINK - Run a Solana Action / blink with the agent's wallet
// =============================================================================

#[derive(Debug)]
pub struct ExecuteBlinkAction {
    meta: ActionMetadata,
    client: Arc<BlinksClient>,
}

impl ExecuteBlinkAction {
    pub fn new(client: Arc<BlinksClient>) -> Self {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "actionUrl": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Solana Action URL, solana-action: URI or blink link",
                },
                "params": {
                    "type": "object",
                    "additionalProperties": { "type": ["string", "number", "boolean"] },
                    "description": "Query parameters the action expects (e.g. amount)",
                },
            },
            "required": ["actionUrl"],
            "additionalProperties": false,
        });

        let examples = vec![ActionExample {
            input: json!({
                "actionUrl": "https://dial.to/?action=solana-action:https://jito.dial.to/stake",
                "params": { "amount": 1 },
            }),
            output: json!({
                "status": "success",
                "signature": "2ZE7Rz...",
                "message": "Staked 1 SOL with Jito",
            }),
            explanation: "Stake 1 SOL through the Jito staking blink".to_string(),
        }];

        let meta = ActionMetadata {
            name: "EXECUTE_BLINK".to_string(),
            similes: vec![
                "execute blink".to_string(),
                "run solana action".to_string(),
                "use blink".to_string(),
                "perform blink action".to_string(),
            ],
            description: "Execute a Solana Action (blink): request its transaction for the agent's wallet, then sign and send it".to_string(),
            examples,
            input_schema,
        };

        Self { meta, client }
    }
}

#[async_trait]
impl Action for ExecuteBlinkAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    async fn call(&self, agent: &Agent, input: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            action_url: String,
            #[serde(default)]
            params: Map<String, Value>,
        }

        let input: Input = serde_json::from_value(input)?;
        let url = action_url(&input.action_url, &input.params).context("Blink execution failed")?;
        let (reply, outcome) = self
            .client
            .execute(agent, &url)
            .await
            .context("Blink execution failed")?;

        let mut result = json!({
            "status": "success",
            "message": reply.message.unwrap_or_else(|| "Blink executed successfully".to_string()),
            "actionUrl": url.as_str(),
        });
        if let (Some(fields), Value::Object(tx)) = (result.as_object_mut(), outcome.to_fields()?) {
            fields.extend(tx);
        }
        Ok(result)
    }
}
