/// Full definition of a configured agent.
///
/// The backend owns these; the client reads and updates them but never
/// validates names against the catalog locally.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentDetail {
    /// Unique agent name, also the path key on the agent endpoints.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Instruction text the agent runs with; the one field marketing staff
    /// edit routinely.
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub output_key: String,
    #[serde(default)]
    pub sub_agents: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Body for an instruction-only update (`POST /agent/{name}`).
pub(crate) fn instruction_body(instruction: &str) -> serde_json::Value {
    serde_json::json!({ "instruction": instruction })
}
