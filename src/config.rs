use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;

/// How the aggregate-variable diff resolves a removed handle that matches
/// more than one added handle by fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenamePolicy {
    /// Refuse the edit and report the ambiguity.
    #[default]
    Strict,
    /// Pair removed and added handles in document order.
    FirstMatch,
}

/// Tunables of the canvas engine.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom factor change per wheel delta unit.
    pub wheel_sensitivity: f64,
    pub default_node_width: f64,
    pub default_node_height: f64,
    pub min_node_width: f64,
    pub min_node_height: f64,
    /// Height of a node's title bar, above the first port row.
    pub header_height: f64,
    pub row_height: f64,
    pub port_size: f64,
    /// Side length of the resize grip in a node's bottom-right corner.
    pub resize_handle_size: f64,
    /// Padding between a group's members and its bounding box.
    pub group_padding: f64,
    /// Vertical distance between fanned-out wires on a collapsed group port.
    pub slot_spacing: f64,
    pub collapsed_group_width: f64,
    pub collapsed_group_height: f64,
    pub rename_policy: RenamePolicy,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 4.0,
            wheel_sensitivity: 0.0015,
            default_node_width: 240.0,
            default_node_height: 120.0,
            min_node_width: 120.0,
            min_node_height: 48.0,
            header_height: 32.0,
            row_height: 24.0,
            port_size: 10.0,
            resize_handle_size: 12.0,
            group_padding: 16.0,
            slot_spacing: 14.0,
            collapsed_group_width: 200.0,
            collapsed_group_height: 64.0,
            rename_policy: RenamePolicy::Strict,
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_zoom <= 0.0 || self.min_zoom >= self.max_zoom {
            return Err(ConfigError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        Ok(())
    }
}
