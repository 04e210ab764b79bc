//! reqwest client for the agents platform REST API
//!
//! Paths are relative to the configured project endpoint and every request
//! carries the `api-version` query parameter:
//!
//! - `GET  /assistants/{agent_id}`
//! - `POST /threads`
//! - `POST /threads/{thread_id}/messages`
//! - `POST /threads/{thread_id}/runs`
//! - `GET  /threads/{thread_id}/runs/{run_id}`
//! - `GET  /threads/{thread_id}/messages?order=desc&limit=N`

use super::{poll_until_terminal, AgentsClient};
use crate::config::{AgentsConfig, PollConfig};
use crate::types::{
    AgentDescriptor, ListOrder, MessagePage, MessageRole, Run, ThreadHandle, ThreadMessage,
};
use crate::{QuipError, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// What a request addresses, for mapping 404s
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Agent(&'a str),
    Thread(&'a str),
    Collection,
}

/// HTTP implementation of [`AgentsClient`]
#[derive(Debug, Clone)]
pub struct HttpAgentsClient {
    client: reqwest::Client,
    /// Project endpoint without trailing slash
    base_url: String,
    api_version: String,
    api_key: Option<String>,
    poll: PollConfig,
}

impl HttpAgentsClient {
    /// Build a client from the agents configuration
    pub fn new(config: &AgentsConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint).map_err(|e| {
            QuipError::configuration_error(format!(
                "invalid agents endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                QuipError::configuration_error(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
            poll: config.poll.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .query(&[("api-version", self.api_version.as_str())]);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, target: Target<'_>) -> Result<T> {
        let response = request.send().await?;
        let response = check_status(response, target).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map a non-2xx response onto the error taxonomy
async fn check_status(response: Response, target: Target<'_>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read response".to_string());
    debug!(%status, body = %body, "Agents platform returned an error");

    Err(match (status.as_u16(), target) {
        (404, Target::Thread(thread_id)) => QuipError::invalid_thread(thread_id),
        (404, Target::Agent(agent_id)) => {
            QuipError::remote_rejected(404, format!("agent '{}' not found", agent_id))
        }
        (401 | 403, _) => QuipError::remote_unavailable(format!(
            "authentication with the agents platform failed ({}): {}",
            status, body
        )),
        (code, _) => QuipError::remote_rejected(code, body),
    })
}

#[async_trait]
impl AgentsClient for HttpAgentsClient {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let request = self.request(Method::GET, &format!("assistants/{}", agent_id));
        self.send(request, Target::Agent(agent_id)).await
    }

    async fn create_thread(&self) -> Result<ThreadHandle> {
        let request = self.request(Method::POST, "threads").json(&json!({}));
        let thread: ThreadHandle = self.send(request, Target::Collection).await?;
        debug!(thread_id = %thread.id, "Created thread");
        Ok(thread)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        let request = self
            .request(Method::POST, &format!("threads/{}/messages", thread_id))
            .json(&json!({ "role": role.as_str(), "content": content }));
        self.send(request, Target::Thread(thread_id)).await
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let request = self
            .request(Method::POST, &format!("threads/{}/runs", thread_id))
            .json(&json!({ "assistant_id": agent_id }));
        let run: Run = self.send(request, Target::Thread(thread_id)).await?;
        debug!(thread_id, run_id = %run.id, status = %run.status, "Started run");
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let request = self.request(Method::GET, &format!("threads/{}/runs/{}", thread_id, run_id));
        self.send(request, Target::Thread(thread_id)).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
        limit: usize,
    ) -> Result<MessagePage> {
        let request = self
            .request(Method::GET, &format!("threads/{}/messages", thread_id))
            .query(&[("order", order.as_str().to_string()), ("limit", limit.to_string())]);
        self.send(request, Target::Thread(thread_id)).await
    }

    async fn create_and_poll_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let run = self.create_run(thread_id, agent_id).await?;
        poll_until_terminal(self, thread_id, run, &self.poll).await
    }
}
