use std::sync::Arc;

use crate::agents::{AgentDetail, instruction_body};
use crate::config::BackendConfig;
use crate::documents::DocumentItem;
use crate::envelope::Envelope;
use crate::errors::{ApiError, ClientError};
use crate::run::RunBuilder;
use crate::transport::{ChatTransport, HttpChatTransport};

/// Client for the agent backend.
///
/// Cloning is cheap; clones share the HTTP connection pool and the chat
/// transport.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    config: BackendConfig,
    transport: Arc<dyn ChatTransport>,
}

impl AgentClient {
    /// Creates a client for the given backend.
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        Self::builder().config(config).build()
    }

    /// Creates a client configured from the environment
    /// (`AGENTDESK_BACKEND_URL`).
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(BackendConfig::from_env())
    }

    /// Starts a builder for overriding the chat transport (fakes in tests,
    /// recording proxies in tools).
    pub fn builder() -> AgentClientBuilder {
        AgentClientBuilder::default()
    }

    /// Starts building a streamed chat run against `agent_name`.
    pub fn chat(&self, agent_name: impl Into<String>) -> RunBuilder {
        RunBuilder::new(self.transport.clone(), agent_name)
    }

    /// Lists the names of all configured agents.
    pub async fn list_agents(&self) -> Result<Vec<String>, ApiError> {
        self.send_envelope(self.http.get(self.config.agent_lists_url()))
            .await?
            .decode()
    }

    /// Fetches the full definition of one agent.
    pub async fn agent(&self, name: &str) -> Result<AgentDetail, ApiError> {
        self.send_envelope(self.http.get(self.config.agent_url(name)))
            .await?
            .decode()
    }

    /// Replaces an agent's definition and returns the stored version.
    pub async fn update_agent(&self, agent: &AgentDetail) -> Result<AgentDetail, ApiError> {
        self.send_envelope(self.http.post(self.config.agent_url(&agent.name)).json(agent))
            .await?
            .decode()
    }

    /// Updates only an agent's instruction text and returns the stored
    /// definition.
    pub async fn update_instruction(
        &self,
        name: &str,
        instruction: &str,
    ) -> Result<AgentDetail, ApiError> {
        self.send_envelope(
            self.http
                .post(self.config.agent_url(name))
                .json(&instruction_body(instruction)),
        )
        .await?
        .decode()
    }

    /// Lists the documents known to the backend.
    pub async fn list_documents(&self) -> Result<Vec<DocumentItem>, ApiError> {
        let paths: Vec<String> = self
            .send_envelope(self.http.get(self.config.documents_lists_url()))
            .await?
            .decode()?;
        Ok(paths.into_iter().map(DocumentItem::from_path).collect())
    }

    /// Fetches a document's markdown content.
    pub async fn document(&self, filename: &str) -> Result<String, ApiError> {
        self.send_envelope(
            self.http
                .get(self.config.documents_url())
                .query(&[("filename", filename)]),
        )
        .await?
        .decode()
    }

    /// Saves a document's markdown content and returns the stored version.
    pub async fn save_document(&self, filename: &str, content: &str) -> Result<String, ApiError> {
        self.send_envelope(
            self.http
                .post(self.config.documents_url())
                .query(&[("filename", filename)])
                .json(&serde_json::json!({ "content": content })),
        )
        .await?
        .decode()
    }

    /// Creates an empty document.
    pub async fn create_document(&self, filename: &str) -> Result<String, ApiError> {
        self.save_document(filename, "").await
    }

    /// Sends a request and parses the `{status, result}` envelope.
    ///
    /// Non-2xx responses keep the body text; the agent-update endpoint
    /// reports its validation problems there.
    async fn send_envelope(&self, request: reqwest::RequestBuilder) -> Result<Envelope, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str::<Envelope>(&body).map_err(|err| {
            tracing::warn!(payload = %body, "failed to parse response envelope");
            ApiError::parse(err.to_string())
        })
    }
}

/// Builder used to override the config or transport before creating an
/// `AgentClient`.
#[derive(Default)]
pub struct AgentClientBuilder {
    config: Option<BackendConfig>,
    transport: Option<Arc<dyn ChatTransport>>,
}

impl AgentClientBuilder {
    /// Sets the backend configuration.
    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Substitutes the chat transport.
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client, defaulting to the HTTP transport over the
    /// configured backend.
    pub fn build(self) -> Result<AgentClient, ClientError> {
        let config = self.config.unwrap_or_default();
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpChatTransport::new(http.clone(), config.clone())),
        };
        Ok(AgentClient {
            http,
            config,
            transport,
        })
    }
}
