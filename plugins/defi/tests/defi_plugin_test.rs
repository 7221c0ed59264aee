use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;
use solana_agent_core::solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    system_instruction,
    transaction::VersionedTransaction,
};
use solana_agent_core::testing::{example_mismatches, stub_agent, StubChain};
use solana_agent_core::{encode_transaction, Agent, AgentConfig};
use solana_agent_plugin_defi::api::{referral_fee_account, SOL_MINT, USDC_MINT};
use solana_agent_plugin_defi::{DefiPlugin, Endpoints};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(server: &MockServer, config: AgentConfig) -> (Agent, Arc<StubChain>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let chain = Arc::new(StubChain::new());
    let agent = stub_agent(chain.clone(), config);
    agent
        .use_plugin(DefiPlugin::with_endpoints(Endpoints::all(&server.uri())))
        .unwrap();
    (agent, chain)
}

/// What a protocol API hands back: an unsigned transaction paid by `payer`.
fn api_transaction(payer: &Pubkey) -> String {
    let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 10);
    let message = v0::Message::try_compile(payer, &[ix], &[], Hash::default()).unwrap();
    encode_transaction(&VersionedTransaction {
        signatures: vec![],
        message: VersionedMessage::V0(message),
    })
    .unwrap()
}

async fn mount_swap(server: &MockServer, agent: &Agent) {
    Mock::given(method("POST"))
        .and(path("/swap"))
        .and(body_partial_json(json!({ "userPublicKey": agent.pubkey().to_string() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "swapTransaction": api_transaction(&agent.pubkey()),
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn missing_flexlend_key_warns_but_registers() {
    let server = MockServer::start().await;
    let (agent, _) = setup(&server, AgentConfig::default());

    let warnings = agent.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "FLEXLEND_API_KEY");
    assert_eq!(agent.action_count(), 4);
    assert_eq!(
        agent.method_names(),
        vec!["fetch_sanctum_prices", "lend_asset", "stake_with_solayer", "trade"]
    );
}

#[tokio::test]
async fn trade_quotes_then_swaps_with_default_slippage() {
    let server = MockServer::start().await;
    let (agent, chain) = setup(&server, AgentConfig::default());

    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("inputMint", SOL_MINT))
        .and(query_param("outputMint", USDC_MINT))
        .and(query_param("amount", "1500000000"))
        .and(query_param("slippageBps", "300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inputMint": SOL_MINT,
            "outputMint": USDC_MINT,
            "outAmount": "225000000",
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_swap(&server, &agent).await;

    let envelope = agent
        .execute("swap tokens", json!({ "outputMint": USDC_MINT, "inputAmount": 1.5 }))
        .await;

    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(envelope.get("inputToken"), Some(&json!(SOL_MINT)));
    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(envelope.get("signature"), Some(&json!(sent[0].signatures[0].to_string())));
    assert_ne!(*sent[0].message.recent_blockhash(), Hash::default());
}

#[tokio::test]
async fn trade_routes_referral_fees() {
    let server = MockServer::start().await;
    let referral = Pubkey::new_unique();
    let config = AgentConfig::default()
        .with_option("JUPITER_REFERRAL_ACCOUNT", referral.to_string())
        .with_option("JUPITER_FEE_BPS", "50");
    let (agent, _) = setup(&server, config);

    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("platformFeeBps", "50"))
        .and(query_param("amount", "25000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "outAmount": "1" })))
        .expect(1)
        .mount(&server)
        .await;

    let usdc = Pubkey::from_str(USDC_MINT).unwrap();
    let sol = Pubkey::from_str(SOL_MINT).unwrap();
    let fee_account = referral_fee_account(&referral, &sol).unwrap();
    Mock::given(method("POST"))
        .and(path("/swap"))
        .and(body_partial_json(json!({ "feeAccount": fee_account.to_string() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "swapTransaction": api_transaction(&agent.pubkey()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    // USDC has 6 decimals on the stub chain.
    let envelope = agent
        .execute(
            "TRADE",
            json!({ "outputMint": SOL_MINT, "inputAmount": 25, "inputMint": usdc.to_string() }),
        )
        .await;
    assert!(envelope.is_success(), "{envelope:?}");
}

#[tokio::test]
async fn trade_between_the_same_mint_is_refused_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (agent, _) = setup(&server, AgentConfig::default());

    let envelope = agent
        .execute("TRADE", json!({ "outputMint": SOL_MINT, "inputAmount": 1 }))
        .await;
    assert_eq!(envelope.message(), Some("Swap failed: input and output mints must differ"));
}

#[tokio::test]
async fn trade_reports_quote_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Could not find any route" })))
        .mount(&server)
        .await;
    let (agent, chain) = setup(&server, AgentConfig::default());

    let envelope = agent
        .execute("TRADE", json!({ "outputMint": USDC_MINT, "inputAmount": 1 }))
        .await;
    assert_eq!(
        envelope.message(),
        Some("Swap failed: Jupiter quote request failed: Could not find any route")
    );
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn lending_requires_the_api_key() {
    let server = MockServer::start().await;
    let (agent, _) = setup(&server, AgentConfig::default());

    let envelope = agent.execute("LEND_ASSET", json!({ "amount": 10 })).await;
    assert_eq!(envelope.message(), Some("Lending failed: FLEXLEND_API_KEY is not configured"));
}

#[tokio::test]
async fn lending_deposits_through_lulo() {
    let server = MockServer::start().await;
    let (agent, chain) = setup(&server, AgentConfig::default().with_option("FLEXLEND_API_KEY", "lulo-key"));
    assert!(agent.warnings().is_empty());

    Mock::given(method("POST"))
        .and(path("/generate/account/deposit"))
        .and(query_param("priorityFee", "50000"))
        .and(header("x-api-key", "lulo-key"))
        .and(header("x-wallet-pubkey", agent.pubkey().to_string().as_str()))
        .and(body_partial_json(json!({ "mintAddress": USDC_MINT, "depositAmount": 10.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "transactionMeta": [{ "transaction": api_transaction(&agent.pubkey()) }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = agent.execute("lend usdc", json!({ "amount": 10 })).await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test]
async fn sanctum_prices_by_symbol() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sol-value/current"))
        .and(query_param("lst", "INF"))
        .and(query_param("lst", "pwrsol"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "solValues": { "INF": "1303329251", "pwrsol": "1105899448" },
            "errs": {}
        })))
        .mount(&server)
        .await;
    let (agent, _) = setup(&server, AgentConfig::default());

    let envelope = agent
        .execute("GET_SANCTUM_PRICE", json!({ "mints": ["INF", "pwrsol"] }))
        .await;
    assert_eq!(
        envelope.get("prices"),
        Some(&json!({ "INF": "1303329251", "pwrsol": "1105899448" }))
    );

    let method_result = agent
        .call_method("fetch_sanctum_prices", json!({ "mints": ["INF", "pwrsol"] }))
        .await
        .unwrap();
    assert_eq!(method_result["INF"], json!("1303329251"));
}

#[tokio::test]
async fn sanctum_needs_at_least_one_mint() {
    let server = MockServer::start().await;
    let (agent, _) = setup(&server, AgentConfig::default());

    let envelope = agent.execute("GET_SANCTUM_PRICE", json!({ "mints": [] })).await;
    assert_eq!(envelope.message(), Some("mints: must contain at least 1 item(s)"));
}

#[tokio::test]
async fn sanctum_errors_carry_the_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "maintenance" })))
        .mount(&server)
        .await;
    let (agent, _) = setup(&server, AgentConfig::default());

    let envelope = agent.execute("lst price", json!({ "mints": ["INF"] })).await;
    assert_eq!(
        envelope.message(),
        Some("Failed to fetch Sanctum prices: Sanctum request failed: maintenance")
    );
}

#[tokio::test]
async fn solayer_stake_in_sign_only_mode() {
    let server = MockServer::start().await;
    let (agent, chain) = setup(&server, AgentConfig::default().with_option("SIGN_ONLY", "true"));

    Mock::given(method("POST"))
        .and(path("/api/action/restake/ssol"))
        .and(query_param("amount", "2"))
        .and(body_partial_json(json!({ "account": agent.pubkey().to_string() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transaction": api_transaction(&agent.pubkey()),
            "message": "Restake 2 SOL",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = agent.execute("STAKE_WITH_SOLAYER", json!({ "amount": 2 })).await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(
        envelope.get("message"),
        Some(&json!("Successfully staked 2 SOL for Solayer SOL (sSOL)"))
    );
    assert!(envelope.get("signedTransaction").is_some());
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn documented_examples_match_live_results() {
    let server = MockServer::start().await;
    let (agent, _) = setup(&server, AgentConfig::default().with_option("FLEXLEND_API_KEY", "lulo-key"));
    let transaction = api_transaction(&agent.pubkey());

    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "outAmount": "225000000" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/swap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "swapTransaction": transaction })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate/account/deposit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "transactionMeta": [{ "transaction": transaction }] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sol-value/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "solValues": {
                "INF": "1303329251",
                "pwrsol": "1105899448",
                "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So": "1273486711",
            },
            "errs": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/action/restake/ssol"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transaction": transaction })))
        .mount(&server)
        .await;

    let mismatches = example_mismatches(&agent, |_, input| input).await;
    assert!(mismatches.is_empty(), "{mismatches:#?}");
}
