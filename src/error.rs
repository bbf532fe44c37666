use thiserror::Error;

/// Errors that can occur while loading, validating or persisting a flow document.
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    #[error("Failed to parse document JSON: {0}")]
    JsonParseError(String),

    #[error("Failed to serialize document: {0}")]
    SerializeError(String),

    #[error("Snapshot encoding failed: {0}")]
    SnapshotError(String),

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Connection '{connection_id}' references missing {kind} '{missing_id}'")]
    DanglingConnection {
        connection_id: String,
        kind: &'static str,
        missing_id: String,
    },

    #[error("Group '{group_id}' references missing node '{node_id}'")]
    DanglingMember { group_id: String, node_id: String },

    #[error("Node '{node_id}' is a member of both group '{first}' and group '{second}'")]
    MultipleMembership {
        node_id: String,
        first: String,
        second: String,
    },
}

/// Errors raised by the aggregate-variable rename/add/remove reconciliation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromotionError {
    #[error("Node '{node_id}' has no variable with handle '{handle}'")]
    VariableNotFound { node_id: String, handle: String },

    #[error("Variable '{handle}' on node '{node_id}' is not an aggregate (dict) variable")]
    NotAggregate { node_id: String, handle: String },

    #[error(
        "Cannot decide how '{handle}' on node '{node_id}' was renamed: candidates {candidates:?} share its fingerprint"
    )]
    AmbiguousRename {
        node_id: String,
        handle: String,
        candidates: Vec<String>,
    },
}

/// Errors that can occur when converting a custom user format into a flowcanvas `Document`.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("Invalid custom data: {0}")]
    ValidationError(String),
}

/// Errors that can occur while loading a `CanvasConfig`.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid zoom range: min {min} must be positive and below max {max}")]
    InvalidZoomRange { min: f64, max: f64 },
}
