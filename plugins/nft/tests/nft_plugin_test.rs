use std::sync::Arc;

use serde_json::json;
use solana_agent_core::solana_sdk::pubkey::Pubkey;
use solana_agent_core::testing::{example_mismatches, stub_agent, StubChain};
use solana_agent_core::{Agent, AgentConfig};
use solana_agent_plugin_nft::{NftApi, NftPlugin};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(chain: StubChain, config: AgentConfig, api: NftApi) -> (Agent, Arc<StubChain>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let chain = Arc::new(chain);
    let agent = stub_agent(chain.clone(), config);
    agent.use_plugin(NftPlugin::with_api(api)).unwrap();
    (agent, chain)
}

fn openai(server: &MockServer) -> NftApi {
    NftApi::new(reqwest::Client::new(), &server.uri())
}

#[tokio::test]
async fn missing_openai_key_is_only_a_warning() {
    let (agent, _) = setup(StubChain::new(), AgentConfig::default(), NftApi::default());

    let warnings = agent.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].plugin, "nft");
    assert_eq!(warnings[0].key, "OPENAI_API_KEY");
    assert_eq!(agent.action_count(), 3);
    assert_eq!(agent.method_names(), vec!["create_image", "get_asset", "mint_nft"]);

    let envelope = agent.execute("CREATE_IMAGE", json!({ "prompt": "a cat" })).await;
    assert_eq!(
        envelope.message(),
        Some("Image generation failed: OPENAI_API_KEY is not configured")
    );
}

#[tokio::test]
async fn mint_is_signed_by_the_wallet_and_the_mint() {
    let (agent, chain) = setup(StubChain::new(), AgentConfig::default(), NftApi::default());

    let envelope = agent
        .execute(
            "mint nft",
            json!({ "name": "Agent #1", "uri": "https://example.com/1.json" }),
        )
        .await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(envelope.get("symbol"), Some(&json!("")));
    assert_eq!(envelope.get("recipient"), Some(&json!(agent.pubkey().to_string())));

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert_eq!(tx.signatures.len(), 2);
    assert!(tx.verify_with_results().iter().all(|ok| *ok));
    assert_eq!(tx.message.instructions().len(), 6);

    let keys = tx.message.static_account_keys();
    assert_eq!(keys[0], agent.pubkey());
    assert_eq!(envelope.get("mint"), Some(&json!(keys[1].to_string())));
}

#[tokio::test]
async fn mint_to_another_recipient_in_sign_only_mode() {
    let (agent, chain) = setup(
        StubChain::new(),
        AgentConfig::default().with_option("SIGN_ONLY", "1"),
        NftApi::default(),
    );
    let recipient = Pubkey::new_unique();

    let envelope = agent
        .execute(
            "MINT_NFT",
            json!({
                "name": "Gift",
                "uri": "https://example.com/gift.json",
                "recipient": recipient.to_string(),
                "sellerFeeBasisPoints": 0,
            }),
        )
        .await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(envelope.get("recipient"), Some(&json!(recipient.to_string())));
    assert!(envelope.get("signedTransaction").is_some());
    assert!(chain.sent().is_empty());
}

#[tokio::test]
async fn royalties_are_capped() {
    let (agent, chain) = setup(StubChain::new(), AgentConfig::default(), NftApi::default());

    let envelope = agent
        .execute(
            "MINT_NFT",
            json!({ "name": "Greedy", "uri": "https://example.com/g.json", "sellerFeeBasisPoints": 10001 }),
        )
        .await;
    assert_eq!(envelope.message(), Some("sellerFeeBasisPoints: must be at most 10000"));
    assert_eq!(chain.calls(), 0);
}

#[tokio::test]
async fn get_asset_goes_through_das() {
    let server = MockServer::start().await;
    let asset_id = Pubkey::new_unique().to_string();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAsset", "params": { "id": asset_id } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "get-asset",
            "result": { "id": asset_id, "content": { "metadata": { "name": "Example NFT" } } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (agent, _) = setup(StubChain::new().with_url(server.uri()), AgentConfig::default(), NftApi::default());

    let envelope = agent.execute("get nft details", json!({ "assetId": asset_id })).await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(
        envelope.get("result").unwrap()["content"]["metadata"]["name"],
        json!("Example NFT")
    );
}

#[tokio::test]
async fn get_asset_reports_das_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "get-asset",
            "error": { "code": -32000, "message": "Asset Not Found" }
        })))
        .mount(&server)
        .await;
    let (agent, _) = setup(StubChain::new().with_url(server.uri()), AgentConfig::default(), NftApi::default());

    let envelope = agent
        .execute("GET_ASSET", json!({ "assetId": Pubkey::new_unique().to_string() }))
        .await;
    assert_eq!(envelope.message(), Some("Asset lookup failed: DAS API error: Asset Not Found"));
}

#[tokio::test]
async fn create_image_with_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "prompt": "a cat", "n": 1, "size": "1024x1024" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1,
            "data": [{ "url": "https://images.example.com/cat.png" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (agent, _) = setup(
        StubChain::new(),
        AgentConfig::default().with_option("OPENAI_API_KEY", "sk-test"),
        openai(&server),
    );
    assert!(agent.warnings().is_empty());

    let envelope = agent.execute("generate image", json!({ "prompt": "a cat" })).await;
    assert!(envelope.is_success(), "{envelope:?}");
    assert_eq!(envelope.get("imageUrl"), Some(&json!("https://images.example.com/cat.png")));
}

#[tokio::test]
async fn create_image_rejects_unknown_sizes() {
    let (agent, _) = setup(
        StubChain::new(),
        AgentConfig::default().with_option("OPENAI_API_KEY", "sk-test"),
        NftApi::default(),
    );

    let envelope = agent
        .execute("CREATE_IMAGE", json!({ "prompt": "a cat", "size": "640x480", "n": 11 }))
        .await;
    let message = envelope.message().unwrap();
    assert!(message.contains("size: must be one of: 256x256, 512x512, 1024x1024"), "{message}");
    assert!(message.contains("n: must be at most 10"), "{message}");
}

#[tokio::test]
async fn create_image_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;
    let (agent, _) = setup(
        StubChain::new(),
        AgentConfig::default().with_option("OPENAI_API_KEY", "sk-bad"),
        openai(&server),
    );

    let envelope = agent.execute("CREATE_IMAGE", json!({ "prompt": "a cat" })).await;
    assert_eq!(
        envelope.message(),
        Some("Image generation failed: OpenAI returned 401 Unauthorized: Incorrect API key provided")
    );
}

#[tokio::test]
async fn documented_examples_match_live_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAsset" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "get-asset",
            "result": { "name": "Example NFT", "symbol": "ENFT", "uri": "https://example.com/asset.json" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1,
            "data": [{ "url": "https://example.com/image.png" }]
        })))
        .mount(&server)
        .await;
    let (agent, _) = setup(
        StubChain::new().with_url(server.uri()),
        AgentConfig::default().with_option("OPENAI_API_KEY", "sk-test"),
        openai(&server),
    );

    let mismatches = example_mismatches(&agent, |_, input| input).await;
    assert!(mismatches.is_empty(), "{mismatches:#?}");
}
