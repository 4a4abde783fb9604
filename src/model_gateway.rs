use anyhow::{Context, Result};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::config::AiConfig;
use crate::model::Message;
use crate::providers;

pub struct ModelGatewayRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGatewayResponse {
    pub content: String,
}

pub type ModelGatewayFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelGatewayResponse>> + 'a>>;

pub trait ModelGateway {
    fn chat<'a>(&'a self, request: ModelGatewayRequest) -> ModelGatewayFuture<'a>;
}

/// Gateway backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenAiGateway {
    client: Client,
    cfg: AiConfig,
}

impl OpenAiGateway {
    pub fn new(cfg: AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs()))
            .build()
            .context("Failed to initialize AI HTTP client")?;
        Ok(Self { client, cfg })
    }

    pub fn config(&self) -> &AiConfig {
        &self.cfg
    }
}

impl ModelGateway for OpenAiGateway {
    fn chat<'a>(&'a self, request: ModelGatewayRequest) -> ModelGatewayFuture<'a> {
        Box::pin(async move {
            let content =
                providers::openai::chat(&self.client, &self.cfg, &request.messages).await?;
            Ok(ModelGatewayResponse { content })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::{ModelGateway, ModelGatewayRequest, OpenAiGateway};
    use crate::config::AiConfig;
    use crate::model::Message;

    fn unreachable_config() -> AiConfig {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);

        AiConfig {
            base_url: format!("http://{addr}/v1"),
            api_key: "k".to_string(),
            model: "m".to_string(),
            temperature: 0.5,
            personality: "grumpy".to_string(),
            timeout_secs: Some(1),
            max_history: None,
        }
    }

    #[test]
    fn gateway_keeps_configuration() {
        let cfg = unreachable_config();
        let gateway = OpenAiGateway::new(cfg.clone()).expect("gateway should build");
        assert_eq!(gateway.config(), &cfg);
    }

    #[tokio::test]
    async fn gateway_propagates_transport_failures() {
        let gateway = OpenAiGateway::new(unreachable_config()).expect("gateway should build");

        let err = gateway
            .chat(ModelGatewayRequest {
                messages: vec![Message::user("ping")],
            })
            .await
            .expect_err("chat should fail");

        let msg = format!("{err:#}");
        assert!(msg.contains("ai.base_url"), "unexpected error message: {msg}");
    }
}
