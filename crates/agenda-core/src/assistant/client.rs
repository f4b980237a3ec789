//! Assistant API HTTP client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::error::{Error, Result};

use super::types::*;
use super::AssistantApi;

const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

/// HTTP client for the hosted assistant service
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AssistantClient {
    /// Create a new client from configuration
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create with custom base URL (for testing or proxies)
    pub fn with_base_url(config: &AssistantConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .header("content-type", "application/json")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        let request = self.authorized(self.client.get(&url));
        self.send(request).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl serde::Serialize) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);
        let request = self.authorized(self.client.post(&url)).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(Error::Http)?;
        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Assistant API error: {} - {}", status, body);
            return Err(api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::AssistantApi(format!("Failed to parse response: {} - {}", e, body))
        })
    }
}

/// Build an error from a non-2xx response, preferring the service's own message
fn api_error(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => Error::AssistantApi(format!("{}: {}", status, parsed.error.message)),
        Err(_) => Error::AssistantApi(format!("{}: {}", status, body)),
    }
}

#[async_trait]
impl AssistantApi for AssistantClient {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<Assistant> {
        info!(name = %request.name, model = %request.model, "Creating assistant");
        self.post("assistants", request).await
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        self.get(&format!("assistants/{}", assistant_id)).await
    }

    async fn create_thread(&self) -> Result<Thread> {
        let thread: Thread = self.post("threads", &json!({})).await?;
        info!(thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<ThreadMessage> {
        let body = CreateMessageRequest {
            role: "user".to_string(),
            content: content.to_string(),
        };
        self.post(&format!("threads/{}/messages", thread_id), &body).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<Run> {
        let body = CreateRunRequest {
            assistant_id: assistant_id.to_string(),
            instructions: instructions.map(str::to_string),
        };
        let run: Run = self.post(&format!("threads/{}/runs", thread_id), &body).await?;
        info!(run_id = %run.id, status = ?run.status, "Run created");
        Ok(run)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get(&format!("threads/{}/runs/{}", thread_id, run_id)).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs.to_vec(),
        };
        self.post(
            &format!("threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &body,
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let list: ListResponse<ThreadMessage> =
            self.get(&format!("threads/{}/messages", thread_id)).await?;
        Ok(list.data)
    }
}
