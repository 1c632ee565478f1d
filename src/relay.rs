use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::template::InstructionTemplate;
use crate::types::{Payload, RelayRequest, RelayResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Forwards a captured payload to an external service.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn relay(&self, payload: &Payload) -> Result<RelayResponse, RelayError>;
}

/// Creates a remote conversation whose first message is the rendered
/// instruction template.
pub struct ConversationRelay {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    repository: String,
    selected_branch: String,
    template: InstructionTemplate,
}

impl ConversationRelay {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &RelayConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key() else {
            return Ok(None);
        };
        let repository = config
            .repository()
            .context("relay.repository is required when the relay is enabled")?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build relay HTTP client")?;

        Ok(Some(Self {
            client,
            endpoint: format!(
                "{}/api/conversations",
                config.base_url.trim_end_matches('/')
            ),
            api_key: api_key.to_string(),
            repository: repository.to_string(),
            selected_branch: config.selected_branch.clone(),
            template: InstructionTemplate::from_config(config)?,
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the outbound body for a payload.
    pub fn build_request(&self, payload: &Payload) -> Result<RelayRequest, RelayError> {
        Ok(RelayRequest {
            initial_user_msg: self.template.render(&payload.raw())?,
            repository: self.repository.clone(),
            selected_branch: self.selected_branch.clone(),
        })
    }
}

#[async_trait]
impl Relay for ConversationRelay {
    async fn relay(&self, payload: &Payload) -> Result<RelayResponse, RelayError> {
        let body = self.build_request(payload)?;
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(RelayError::Transport)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(RelayError::Status { status, body });
        }

        resp.json().await.map_err(RelayError::Decode)
    }
}
