//! Negotiation and chat relay between a matched pair.

mod common;

use common::client::TestClient;
use common::server::TestServer;
use serde_json::json;

async fn matched_pair(server: &TestServer) -> anyhow::Result<(TestClient, TestClient)> {
    let mut alice = TestClient::connect(&server.ws_url()).await?;
    let mut bob = TestClient::connect(&server.ws_url()).await?;
    alice.find_partner("Alice").await?;
    bob.find_partner("Bob").await?;
    alice.wait_for("partner-found").await?;
    bob.wait_for("partner-found").await?;
    Ok((alice, bob))
}

#[tokio::test]
async fn negotiation_frames_are_relayed_verbatim() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut alice, mut bob) = matched_pair(&server).await?;

    let offer = json!({"sdp": "v=0\r\no=- 46117 2 IN IP4 127.0.0.1", "type": "offer"});
    alice
        .send_json(json!({"type": "offer", "offer": offer}))
        .await?;
    let relayed = bob.wait_for("offer").await?;
    assert_eq!(relayed["offer"], offer);

    let answer = json!({"sdp": "v=0", "type": "answer"});
    bob.send_json(json!({"type": "answer", "answer": answer}))
        .await?;
    let relayed = alice.wait_for("answer").await?;
    assert_eq!(relayed["answer"], answer);

    let candidate = json!({"candidate": "candidate:1 1 UDP 2122252543 10.0.0.2 54321 typ host"});
    alice
        .send_json(json!({"type": "ice-candidate", "candidate": candidate}))
        .await?;
    let relayed = bob.wait_for("ice-candidate").await?;
    assert_eq!(relayed["candidate"], candidate);
    Ok(())
}

#[tokio::test]
async fn chat_is_trimmed_and_attributed() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut alice, mut bob) = matched_pair(&server).await?;

    alice.chat("  hello bob  ").await?;
    let chat = bob.wait_for("chat-message").await?;
    assert_eq!(chat["message"], "hello bob");
    assert_eq!(chat["sender"], "Alice");
    Ok(())
}

#[tokio::test]
async fn oversized_chat_is_rejected() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut alice, mut bob) = matched_pair(&server).await?;

    alice.chat(&"x".repeat(501)).await?;
    let error = alice.wait_for("error").await?;
    assert!(error["message"].as_str().unwrap().contains("500"));

    // Whitespace-only chat is silently dropped; the next real message is
    // the only thing the partner sees.
    alice.chat("   ").await?;
    alice.chat("still here").await?;
    let chat = bob.wait_for("chat-message").await?;
    assert_eq!(chat["message"], "still here");
    Ok(())
}

#[tokio::test]
async fn relay_without_a_partner_is_an_error() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut alice = TestClient::connect(&server.ws_url()).await?;
    alice.find_partner("Alice").await?;
    alice.wait_for("waiting").await?;

    alice
        .send_json(json!({"type": "offer", "offer": {"sdp": "v=0"}}))
        .await?;
    let error = alice.wait_for("error").await?;
    assert!(error["message"].as_str().unwrap().contains("Partner"));

    // The failed relay re-queues her automatically; after the delays she
    // is told she is waiting again.
    alice.wait_for("waiting").await?;
    Ok(())
}

#[tokio::test]
async fn unknown_types_are_ignored() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut alice, mut bob) = matched_pair(&server).await?;

    alice
        .send_json(json!({"type": "telemetry", "payload": [1, 2, 3]}))
        .await?;
    // The connection is unaffected.
    alice.chat("after the unknown frame").await?;
    let chat = bob.wait_for("chat-message").await?;
    assert_eq!(chat["message"], "after the unknown frame");
    Ok(())
}

#[tokio::test]
async fn malformed_frames_get_an_error_reply() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = TestClient::connect(&server.ws_url()).await?;

    client.send_raw("{this is not json").await?;
    let error = client.wait_for("error").await?;
    assert_eq!(error["message"], "Invalid message format.");

    // Well-formed JSON without a type is also malformed.
    client.send_json(json!({"username": "Alice"})).await?;
    let error = client.wait_for("error").await?;
    assert_eq!(error["message"], "Invalid message format.");
    Ok(())
}
