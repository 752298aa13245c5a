//! Test WebSocket client.
//!
//! A thin wrapper over tokio-tungstenite that speaks the server's JSON
//! protocol and can scan the inbound stream for a frame of interest,
//! since broadcasts (user counts, stats) interleave with replies.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a JSON frame.
    pub async fn send_json(&mut self, value: Value) -> anyhow::Result<()> {
        self.send_raw(&value.to_string()).await
    }

    pub async fn find_partner(&mut self, username: &str) -> anyhow::Result<()> {
        self.send_json(json!({"type": "find-partner", "username": username}))
            .await
    }

    #[allow(dead_code)]
    pub async fn find_partner_with_token(
        &mut self,
        username: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        self.send_json(json!({
            "type": "find-partner",
            "username": username,
            "token": token,
        }))
        .await
    }

    #[allow(dead_code)]
    pub async fn chat(&mut self, message: &str) -> anyhow::Result<()> {
        self.send_json(json!({"type": "chat-message", "message": message}))
            .await
    }

    /// Receive the next text frame as JSON.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .map_err(|_| anyhow::anyhow!("timed out waiting for a frame"))?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            if let Message::Text(text) = frame {
                return Ok(serde_json::from_str(&text)?);
            }
        }
    }

    /// Receive frames until the predicate matches; returns the match.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Value>
    where
        F: FnMut(&Value) -> bool,
    {
        // Bounded so a wrong expectation fails with context instead of
        // spinning until the outer timeout.
        for _ in 0..64 {
            let value = self.recv().await?;
            if predicate(&value) {
                return Ok(value);
            }
        }
        anyhow::bail!("predicate never matched within 64 frames")
    }

    /// Receive frames until one has the given `type`.
    pub async fn wait_for(&mut self, message_type: &str) -> anyhow::Result<Value> {
        self.recv_until(|v| v["type"] == message_type).await
    }

    /// Close the connection.
    #[allow(dead_code)]
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
