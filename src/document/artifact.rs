use super::definition::Document;
use crate::error::DocumentError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};

/// A point-in-time copy of a document, tagged with the flow and version it belongs to.
///
/// The envelope is bincode-encoded. The document itself travels as compact JSON
/// inside it because its variable values are self-describing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub flow_id: String,
    pub version: u64,
    payload: Vec<u8>,
}

impl DocumentSnapshot {
    /// Captures `document` as a snapshot of `flow_id` at `version`.
    pub fn capture(
        flow_id: impl Into<String>,
        version: u64,
        document: &Document,
    ) -> Result<Self, DocumentError> {
        let payload = serde_json::to_vec(document)
            .map_err(|e| DocumentError::SerializeError(e.to_string()))?;
        Ok(Self {
            flow_id: flow_id.into(),
            version,
            payload,
        })
    }

    /// Rebuilds the captured document.
    pub fn restore(&self) -> Result<Document, DocumentError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| DocumentError::JsonParseError(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        encode_to_vec(self, standard())
            .map_err(|e| DocumentError::SnapshotError(format!("Serialization failed: {}", e)))
    }

    /// Saves the snapshot to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), DocumentError> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: format!("Could not create file: {}", e),
        })?;
        file.write_all(&bytes).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: format!("Could not write to file: {}", e),
        })?;
        Ok(())
    }

    /// Loads a snapshot from a file.
    pub fn from_file(path: &str) -> Result<Self, DocumentError> {
        let mut file = fs::File::open(path).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: format!("Could not open file: {}", e),
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: format!("Could not read from file: {}", e),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Deserializes a snapshot from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        decode_from_slice(bytes, standard())
            .map(|(snapshot, _)| snapshot) // bincode 2 returns a tuple (data, bytes_read)
            .map_err(|e| DocumentError::SnapshotError(format!("Deserialization failed: {}", e)))
    }
}
