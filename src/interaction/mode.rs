use crate::document::PortDirection;
use crate::geometry::{Point, Vector};
use crate::router::PortKey;
use crate::transform::SelectionBox;

/// What lies under the pointer, topmost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Canvas,
    Node(String),
    Port {
        node_id: String,
        handle: String,
        direction: PortDirection,
    },
    ResizeHandle(String),
    /// The box of a collapsed group.
    Group(String),
}

impl HitTarget {
    pub fn port_key(&self) -> Option<PortKey> {
        match self {
            HitTarget::Port {
                node_id,
                handle,
                direction,
            } => Some(PortKey::new(node_id.as_str(), handle.as_str(), *direction)),
            _ => None,
        }
    }
}

/// Pointer tool picked in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Presses on nodes select and drag, presses on the background pan.
    #[default]
    Pointer,
    /// Presses anywhere but a port or a resize grip draw a selection box.
    BoxSelect,
}

/// The gesture in progress. Exactly one at a time.
///
/// Moves accumulate into `pending` and are applied once per animation frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Panning { last: Point, pending: Vector },
    DraggingSelection { last: Point, pending: Vector },
    BoxSelecting(SelectionBox),
    DrawingConnection { anchor: PortKey },
    ResizingNode {
        node_id: String,
        last: Point,
        pending: Vector,
    },
}

impl Mode {
    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }
}

/// What releasing the pointer committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Nothing,
    Panned,
    Moved(Vec<String>),
    Selected(Vec<String>),
    Connected(String),
    ConnectionCancelled,
    Resized(String),
}

/// Geometry applied by one animation-frame tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameUpdate {
    pub moved_nodes: Vec<String>,
    pub moved_groups: Vec<String>,
    pub resized_node: Option<String>,
    pub panned: bool,
}

impl FrameUpdate {
    pub fn is_empty(&self) -> bool {
        self.moved_nodes.is_empty()
            && self.moved_groups.is_empty()
            && self.resized_node.is_none()
            && !self.panned
    }
}
