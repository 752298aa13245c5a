//! In-process test server.
//!
//! Runs the whole server on an ephemeral port inside the test's runtime,
//! with the matchmaking delays shortened so re-queue behavior is testable
//! without multi-second sleeps.

use duetd::config::Config;
use duetd::server::{self, Server};

pub struct TestServer {
    pub server: Server,
}

impl TestServer {
    /// Start a server with test-friendly settings.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Start a server after letting the caller adjust the config.
    #[allow(dead_code)]
    pub async fn spawn_with(adjust: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let mut config = Config::default();
        config.listen.address = "127.0.0.1:0".parse()?;
        config.server.status_port = 0;
        config.matchmaking.settle_delay_ms = 20;
        config.matchmaking.rematch_delay_ms = 20;
        config.sweep.interval_secs = 1;
        adjust(&mut config);

        let server = server::start(config).await?;
        Ok(Self { server })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.server.addr)
    }
}
