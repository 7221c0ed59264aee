use std::sync::Arc;

use serde_json::json;
use solana_agent_core::solana_sdk::signature::{Keypair, Signer};
use solana_agent_core::testing::{example_mismatches, stub_agent, StubChain};
use solana_agent_core::{decode_transaction, Agent, AgentConfig};
use solana_agent_plugin_token::TokenPlugin;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECIPIENT: &str = "8x2dR8Mpzuz2YqyZyZjUbYWKSWesBo5jMx2Q9Y86udVk";
const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

fn setup(chain: StubChain, config: AgentConfig) -> (Agent, Arc<StubChain>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let chain = Arc::new(chain);
    let agent = stub_agent(chain.clone(), config);
    agent.use_plugin(TokenPlugin::new()).unwrap();
    (agent, chain)
}

#[tokio::test]
async fn registers_every_action_and_method() {
    let (agent, _) = setup(StubChain::new(), AgentConfig::default());

    let names: Vec<String> = agent.actions().into_iter().map(|m| m.name).collect();
    assert_eq!(
        names,
        vec![
            "BALANCE_ACTION",
            "TOKEN_BALANCE_ACTION",
            "TRANSFER",
            "WALLET_ADDRESS",
            "REQUEST_FUNDS",
            "GET_TPS",
            "USE_WALLET",
        ]
    );
    assert_eq!(
        agent.method_names(),
        vec![
            "get_balance",
            "get_token_balances",
            "get_tps",
            "get_wallet_address",
            "request_faucet_funds",
            "transfer",
        ]
    );
    assert!(agent.warnings().is_empty());
}

#[tokio::test]
async fn balance_in_sol_and_tokens() {
    let (agent, _) = setup(StubChain::new().with_lamports(1_500_000_000), AgentConfig::default());

    let sol = agent.execute("BALANCE_ACTION", json!({})).await;
    assert!(sol.is_success(), "{sol:?}");
    assert_eq!(sol.get("balance"), Some(&json!(1.5)));
    assert_eq!(sol.get("token"), Some(&json!("SOL")));

    let usdc = agent.execute("check token balance", json!({ "tokenAddress": USDC })).await;
    assert_eq!(usdc.get("balance"), Some(&json!(42.5)));
    assert_eq!(usdc.get("token"), Some(&json!(USDC)));

    assert_eq!(agent.call_method("get_balance", json!(null)).await.unwrap(), json!(1.5));
}

#[tokio::test]
async fn balance_failure_is_prefixed() {
    let (agent, chain) = setup(StubChain::new(), AgentConfig::default());
    chain.fail_with("RPC down");

    let envelope = agent.execute("BALANCE_ACTION", json!({})).await;
    assert_eq!(envelope.message(), Some("Balance lookup failed: RPC down"));
}

#[tokio::test]
async fn negative_transfer_never_touches_the_chain() {
    let (agent, chain) = setup(StubChain::new(), AgentConfig::default());

    let envelope = agent.execute("TRANSFER", json!({ "to": "abc", "amount": -1 })).await;
    let message = envelope.message().unwrap();
    assert!(message.contains("must be positive"), "{message}");
    assert!(message.contains("minimum length 32"), "{message}");
    assert_eq!(chain.calls(), 0);
}

#[tokio::test]
async fn sol_transfer_is_signed_and_sent() {
    let (agent, chain) = setup(StubChain::new(), AgentConfig::default());

    let envelope = agent.execute("send sol", json!({ "to": RECIPIENT, "amount": 0.25 })).await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(envelope.get("token"), Some(&json!("SOL")));

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.instructions().len(), 1);
    assert_eq!(
        envelope.get("signature"),
        Some(&json!(sent[0].signatures[0].to_string()))
    );
    assert!(sent[0].verify_with_results().iter().all(|ok| *ok));
}

#[tokio::test]
async fn spl_transfer_creates_the_destination_account() {
    let (agent, chain) = setup(StubChain::new().with_decimals(6), AgentConfig::default());

    let envelope = agent
        .execute("TRANSFER", json!({ "to": RECIPIENT, "amount": 12.5, "mint": USDC }))
        .await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(envelope.get("token"), Some(&json!(USDC)));

    let sent = chain.sent();
    assert_eq!(sent[0].message.instructions().len(), 2);
}

#[tokio::test]
async fn sign_only_transfer_returns_the_transaction() {
    let (agent, chain) = setup(StubChain::new(), AgentConfig::default().with_option("SIGN_ONLY", "true"));

    let envelope = agent.execute("TRANSFER", json!({ "to": RECIPIENT, "amount": 1 })).await;
    assert!(chain.sent().is_empty());
    let encoded = envelope.get("signedTransaction").and_then(|v| v.as_str()).unwrap();
    let tx = decode_transaction(encoded).unwrap();
    assert_eq!(tx.message.static_account_keys()[0], agent.pubkey());
    assert!(envelope.get("signature").is_none());
}

#[tokio::test]
async fn bad_recipient_is_a_handler_error() {
    let (agent, _) = setup(StubChain::new(), AgentConfig::default());

    // 32+ characters, but not base58.
    let to = "0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl";
    let envelope = agent.execute("TRANSFER", json!({ "to": to, "amount": 1 })).await;
    assert!(envelope.message().unwrap().starts_with("invalid recipient address"));
}

#[tokio::test]
async fn tps_and_faucet() {
    let (agent, _) = setup(StubChain::new().with_tps(Some(2875.4)), AgentConfig::default());

    let tps = agent.execute("network tps", json!({})).await;
    assert_eq!(tps.get("message"), Some(&json!("Current network TPS: 2875")));

    let faucet = agent.execute("REQUEST_FUNDS", json!({})).await;
    assert!(faucet.is_success());
    assert_eq!(faucet.get("network"), Some(&json!("http://127.0.0.1:8899")));
}

#[tokio::test]
async fn missing_performance_samples() {
    let (agent, _) = setup(StubChain::new().with_tps(None), AgentConfig::default());

    let envelope = agent.execute("GET_TPS", json!({})).await;
    assert_eq!(
        envelope.message(),
        Some("TPS lookup failed: No performance samples available")
    );
}

#[tokio::test]
async fn use_wallet_swaps_for_every_later_call() {
    let (agent, _) = setup(StubChain::new(), AgentConfig::default());
    let address = agent.method("get_wallet_address").unwrap();

    let next = Keypair::new();
    let envelope = agent
        .execute("USE_WALLET", json!({ "secretKey": next.to_base58_string() }))
        .await;
    assert_eq!(envelope.get("address"), Some(&json!(next.pubkey().to_string())));

    assert_eq!(address.call(json!({})).await.unwrap(), json!(next.pubkey().to_string()));
    let shown = agent.execute("WALLET_ADDRESS", json!({})).await;
    assert_eq!(shown.get("address"), Some(&json!(next.pubkey().to_string())));
}

#[tokio::test]
async fn use_wallet_rejects_short_keys() {
    let (agent, _) = setup(StubChain::new(), AgentConfig::default());
    let before = agent.pubkey();

    let envelope = agent.execute("USE_WALLET", json!({ "secretKey": "short" })).await;
    assert_eq!(
        envelope.message(),
        Some("secretKey: must be a base58 encoded 64-byte keypair")
    );
    assert_eq!(agent.pubkey(), before);
}

#[tokio::test]
async fn token_balances_read_parsed_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getTokenAccountsByOwner" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "token-balances",
            "result": { "value": [
                {
                    "pubkey": "Acc1111111111111111111111111111111111111111",
                    "account": { "data": { "parsed": { "info": {
                        "mint": USDC,
                        "tokenAmount": { "uiAmount": 120.5, "decimals": 6 }
                    }}}}
                },
                {
                    "pubkey": "Acc2222222222222222222222222222222222222222",
                    "account": { "data": { "parsed": { "info": {
                        "mint": "So11111111111111111111111111111111111111112",
                        "tokenAmount": { "uiAmount": 0.0, "decimals": 9 }
                    }}}}
                }
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (agent, _) = setup(
        StubChain::new().with_url(server.uri()).with_lamports(5_500_000_000),
        AgentConfig::default(),
    );

    let envelope = agent.execute("TOKEN_BALANCE_ACTION", json!({})).await;
    assert!(envelope.is_success(), "{envelope:?}");
    let balance = envelope.get("balance").unwrap();
    assert_eq!(balance["sol"], json!(5.5));
    let tokens = balance["tokens"].as_array().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0]["tokenAddress"], json!(USDC));
    assert_eq!(tokens[0]["balance"], json!(120.5));
}

#[tokio::test]
async fn token_balances_surface_rpc_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "token-balances",
            "error": { "code": -32602, "message": "Invalid param" }
        })))
        .mount(&server)
        .await;

    let (agent, _) = setup(StubChain::new().with_url(server.uri()), AgentConfig::default());
    let envelope = agent.execute("TOKEN_BALANCE_ACTION", json!({})).await;
    assert_eq!(
        envelope.message(),
        Some("Token balance lookup failed: RPC error: Invalid param")
    );
}

#[tokio::test]
async fn documented_examples_match_live_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getTokenAccountsByOwner" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "token-balances",
            "result": { "value": [{
                "pubkey": "Acc1111111111111111111111111111111111111111",
                "account": { "data": { "parsed": { "info": {
                    "mint": USDC,
                    "tokenAmount": { "uiAmount": 120.5, "decimals": 6 }
                }}}}
            }]}
        })))
        .mount(&server)
        .await;
    let (agent, _) = setup(StubChain::new().with_url(server.uri()), AgentConfig::default());

    let mismatches = example_mismatches(&agent, |action, input| match action {
        "USE_WALLET" => json!({ "secretKey": Keypair::new().to_base58_string() }),
        _ => input,
    })
    .await;
    assert!(mismatches.is_empty(), "{mismatches:#?}");
}
