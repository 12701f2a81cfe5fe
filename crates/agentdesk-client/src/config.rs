use std::time::Duration;

/// Base URL used when `AGENTDESK_BACKEND_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const BASE_URL_ENV: &str = "AGENTDESK_BACKEND_URL";

/// Configuration for the backend the client talks to.
///
/// An explicit value passed to `AgentClient::new` rather than global state,
/// so the client can be pointed at a mock endpoint in tests.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Base URL of the agent backend.
    pub base_url: String,
    /// Optional timeout applied to every HTTP request.
    ///
    /// The backend contract defines none; without one a hung connection
    /// blocks until the caller cancels.
    pub timeout: Option<Duration>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BackendConfig {
    /// Creates a config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    /// Builds a config from `AGENTDESK_BACKEND_URL`, falling back to
    /// `http://localhost:8000`.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_default();
        if base_url.trim().is_empty() {
            Self::default()
        } else {
            Self::new(base_url.trim())
        }
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the per-request HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn join(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// `POST /agent` — streamed agent invocation.
    pub(crate) fn run_url(&self) -> String {
        self.join("/agent")
    }

    /// `GET /agent/lists` — agent name listing.
    pub(crate) fn agent_lists_url(&self) -> String {
        self.join("/agent/lists")
    }

    /// `GET`/`POST /agent/{name}` — agent detail and update.
    pub(crate) fn agent_url(&self, name: &str) -> String {
        self.join(&format!("/agent/{name}"))
    }

    /// `GET /documents/lists` — document listing.
    pub(crate) fn documents_lists_url(&self) -> String {
        self.join("/documents/lists")
    }

    /// `GET`/`POST /documents` — document content, keyed by query parameter.
    pub(crate) fn documents_url(&self) -> String {
        self.join("/documents")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_localhost() {
        assert_eq!(BackendConfig::default().base_url, "http://localhost:8000");
        assert!(BackendConfig::default().timeout.is_none());
    }

    #[test]
    fn urls_tolerate_trailing_slash() {
        let config = BackendConfig::new("http://backend:9000/");
        assert_eq!(config.run_url(), "http://backend:9000/agent");
        assert_eq!(config.agent_lists_url(), "http://backend:9000/agent/lists");
        assert_eq!(config.agent_url("writer"), "http://backend:9000/agent/writer");
        assert_eq!(
            config.documents_lists_url(),
            "http://backend:9000/documents/lists"
        );
        assert_eq!(config.documents_url(), "http://backend:9000/documents");
    }
}
