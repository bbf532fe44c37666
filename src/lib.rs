//! # flowcanvas - Node-Graph Canvas Engine
//!
//! **flowcanvas** is the editing core of a visual workflow builder: a canvas on
//! which nodes are placed, wired together, grouped and watched while a flow runs
//! elsewhere. It keeps a mutable graph consistent under continuous pointer
//! gestures and derives geometry (wire paths, group bounds, promoted variables)
//! without relaying out the whole document on every frame.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Document**: Parse a saved flow with `Document::from_json`, or
//!     implement the `IntoDocument` trait for your own format.
//! 2.  **Build a Canvas**: `Canvas::builder(document)` wires the graph store,
//!     viewports, connector router, interaction controller and execution overlay.
//! 3.  **Feed Input**: Forward pointer events, call `animation_frame` once per
//!     frame, and apply the returned `RouteUpdate`s to the rendered wires.
//! 4.  **Save**: `Canvas::save_json` returns the exact `{ nodes, connections }` shape.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowcanvas::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let json = std::fs::read_to_string("path/to/flow.json")?;
//!     let document = Document::from_json(&json)?;
//!
//!     let mut canvas = Canvas::builder(document)
//!         .with_config(CanvasConfig::default())
//!         .with_flow("flow-1", "draft")
//!         .build();
//!
//!     // Drag whatever lies under (120, 80) by 40 pixels to the right.
//!     canvas.pointer_down(Point::new(120.0, 80.0), false);
//!     canvas.pointer_move(Point::new(160.0, 80.0));
//!     for update in canvas.animation_frame().routes {
//!         if let Some(path) = update.path {
//!             println!("{} -> {}", update.connection_id, path);
//!         }
//!     }
//!     canvas.pointer_up(Point::new(160.0, 80.0));
//!
//!     // Watch a run.
//!     let sender = canvas.subscribe_execution("flow-1");
//!     sender.send(ExecutionMessage::start("node-1"))?;
//!     let changes = canvas.pump_execution();
//!     println!("{changes:?}");
//!
//!     std::fs::write("path/to/flow.json", canvas.save_json()?)?;
//!     Ok(())
//! }
//! ```

pub mod canvas;
pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod grouping;
pub mod ids;
pub mod interaction;
pub mod overlay;
pub mod prelude;
pub mod router;
pub mod service;
pub mod store;
pub mod transform;
