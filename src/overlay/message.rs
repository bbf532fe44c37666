use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEvent {
    StartNode,
    EndNode,
    RunEnd,
}

/// Final status of a node run, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Killed,
    Error,
}

/// One message of the execution push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMessage {
    #[serde(default)]
    pub node_id: String,
    pub event: ExecutionEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
}

impl ExecutionMessage {
    pub fn start(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            event: ExecutionEvent::StartNode,
            status: None,
        }
    }

    pub fn end(node_id: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            node_id: node_id.into(),
            event: ExecutionEvent::EndNode,
            status: Some(status),
        }
    }

    pub fn run_end() -> Self {
        Self {
            node_id: String::new(),
            event: ExecutionEvent::RunEnd,
            status: None,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
