//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the
//! flowcanvas crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowcanvas::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/flow.json")?;
//! let mut store = GraphStore::from_document(Document::from_json(&json)?);
//!
//! let ids: Vec<String> = store.nodes().iter().take(2).map(|n| n.id.clone()).collect();
//! if let Some(group_id) = grouping::create_group(&mut store, &ids, "Pair", 16.0) {
//!     grouping::toggle_collapse(&mut store, &group_id);
//!     println!("{:?}", grouping::promoted_variables(&store, &group_id));
//! }
//! # Ok(())
//! # }
//! ```

// Container and configuration
pub use crate::canvas::{Canvas, CanvasBuilder, SceneRefresh, SettleReport};
pub use crate::config::{CanvasConfig, RenamePolicy};

// Data model
pub use crate::document::{
    Connection, Document, DocumentSnapshot, Group, IntoDocument, Node, NodeVariable, PortDirection,
    VariableValue,
};
pub use crate::geometry::{Point, Rect, Vector};
pub use crate::store::{GraphStore, StoreEvent};

// Geometry engines
pub use crate::grouping;
pub use crate::interaction::{Commit, HitTarget, InteractionController, Mode, Tool};
pub use crate::router::{BezierPath, ConnectorRouter, RouteUpdate, SceneIndex};
pub use crate::transform::{SelectionBox, Viewport, ViewportKey};

// Collaborators
pub use crate::catalog::{StaticCatalog, TemplateCatalog};
pub use crate::overlay::{ExecutionMessage, ExecutionOverlay, ExecutionStatus, OverlayChange};
pub use crate::service::{IdRemap, ServicePackage};

// Error types
pub use crate::error::{ConversionError, DocumentError, PromotionError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
