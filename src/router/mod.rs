use crate::document::{Connection, PortDirection};
use crate::geometry::Point;
use crate::store::GraphStore;
use ahash::{AHashMap, AHashSet};
use tracing::{debug, trace};

mod path;
pub mod scene;

pub use path::BezierPath;
pub use scene::{PortKey, SceneIndex};

/// A changed wire, handed to the render layer so it can patch that one path
/// in place instead of re-rendering the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUpdate {
    pub connection_id: String,
    /// `None` when the wire must no longer be drawn.
    pub path: Option<BezierPath>,
}

/// A wire being drawn from a port towards the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWire {
    pub anchor: PortKey,
    pub pointer: Point,
}

/// Resolves connection endpoints to screen positions and keeps the current
/// bezier path of every visible wire.
///
/// Refreshing is idempotent: a second refresh without an intervening change
/// reports no updates.
#[derive(Debug, Clone)]
pub struct ConnectorRouter {
    paths: AHashMap<String, BezierPath>,
    pending: Option<PendingWire>,
    slot_spacing: f64,
}

impl ConnectorRouter {
    pub fn new(slot_spacing: f64) -> Self {
        Self {
            paths: AHashMap::new(),
            pending: None,
            slot_spacing,
        }
    }

    pub fn path(&self, connection_id: &str) -> Option<&BezierPath> {
        self.paths.get(connection_id)
    }

    pub fn paths(&self) -> &AHashMap<String, BezierPath> {
        &self.paths
    }

    /// Whether the wire is drawn at all: hidden system wiring and wires
    /// swallowed by a collapsed group are not.
    pub fn is_drawn(store: &GraphStore, connection: &Connection) -> bool {
        !connection.hidden && !store.is_connection_concealed(connection)
    }

    /// Connections fanned onto the boundary port of a collapsed group, in slot order.
    pub fn slot_members<'a>(
        store: &'a GraphStore,
        group_id: &str,
        direction: PortDirection,
    ) -> Vec<&'a Connection> {
        store
            .connections()
            .iter()
            .filter(|c| c.group_alias(direction) == Some(group_id))
            .filter(|c| Self::is_drawn(store, c))
            .collect()
    }

    /// Slot positions on one side of a collapsed group: one per attached wire
    /// plus a trailing empty slot, stacked vertically around the port center.
    pub fn group_slots(
        &self,
        store: &GraphStore,
        scene: &SceneIndex,
        group_id: &str,
        direction: PortDirection,
    ) -> Vec<Point> {
        let Some(port) = scene.group_port(group_id, direction) else {
            return Vec::new();
        };
        let count = Self::slot_members(store, group_id, direction).len();
        (0..=count)
            .map(|slot| self.slot_position(port.center(), slot, count, scene.scale()))
            .collect()
    }

    fn slot_position(&self, center: Point, slot: usize, count: usize, scale: f64) -> Point {
        let offset = (slot as f64 - count as f64 / 2.0) * self.slot_spacing * scale;
        Point::new(center.x, center.y + offset)
    }

    /// Screen position of one end of a wire. `Out` is the source end.
    ///
    /// An end attached to a collapsed group lands on that group's boundary
    /// port, in the slot assigned to this wire.
    pub fn resolve_endpoint(
        &self,
        store: &GraphStore,
        scene: &SceneIndex,
        connection: &Connection,
        direction: PortDirection,
    ) -> Option<Point> {
        if let Some(group_id) = connection.group_alias(direction) {
            let port = scene.group_port(group_id, direction)?;
            let members = Self::slot_members(store, group_id, direction);
            let slot = members.iter().position(|c| c.id == connection.id)?;
            return Some(self.slot_position(port.center(), slot, members.len(), scene.scale()));
        }
        let (node_id, handle) = connection.endpoint(direction);
        scene
            .port(node_id, handle, direction)
            .map(|rect| rect.center())
    }

    /// Computes the path of one connection, or `None` when an end is not
    /// rendered yet.
    pub fn route(
        &self,
        store: &GraphStore,
        scene: &SceneIndex,
        connection: &Connection,
    ) -> Option<BezierPath> {
        let start = self.resolve_endpoint(store, scene, connection, PortDirection::Out)?;
        let end = self.resolve_endpoint(store, scene, connection, PortDirection::In)?;
        Some(BezierPath::between(start, end))
    }

    /// Recomputes every wire.
    pub fn refresh(&mut self, store: &GraphStore, scene: &SceneIndex) -> Vec<RouteUpdate> {
        let mut updates = Vec::new();
        let live: AHashSet<&str> = store.connections().iter().map(|c| c.id.as_str()).collect();
        let stale: Vec<String> = self
            .paths
            .keys()
            .filter(|id| !live.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.paths.remove(&id);
            updates.push(RouteUpdate {
                connection_id: id,
                path: None,
            });
        }
        for connection in store.connections() {
            self.refresh_one(store, scene, connection, &mut updates);
        }
        trace!(updates = updates.len(), "Router refresh");
        updates
    }

    /// Recomputes only the wires attached to the given nodes.
    pub fn refresh_nodes<S: AsRef<str>>(
        &mut self,
        store: &GraphStore,
        scene: &SceneIndex,
        node_ids: &[S],
    ) -> Vec<RouteUpdate> {
        let moved: AHashSet<&str> = node_ids.iter().map(AsRef::as_ref).collect();
        let mut updates = Vec::new();
        for connection in store.connections().iter().filter(|c| {
            moved.contains(c.source_node_id.as_str()) || moved.contains(c.target_node_id.as_str())
        }) {
            self.refresh_one(store, scene, connection, &mut updates);
        }
        updates
    }

    fn refresh_one(
        &mut self,
        store: &GraphStore,
        scene: &SceneIndex,
        connection: &Connection,
        updates: &mut Vec<RouteUpdate>,
    ) {
        if !Self::is_drawn(store, connection) {
            if self.paths.remove(&connection.id).is_some() {
                updates.push(RouteUpdate {
                    connection_id: connection.id.clone(),
                    path: None,
                });
            }
            return;
        }
        let Some(path) = self.route(store, scene, connection) else {
            debug!(connection_id = %connection.id, "Endpoint not rendered, keeping previous path");
            return;
        };
        if self.paths.get(&connection.id) == Some(&path) {
            return;
        }
        self.paths.insert(connection.id.clone(), path);
        updates.push(RouteUpdate {
            connection_id: connection.id.clone(),
            path: Some(path),
        });
    }

    // --- Wire being drawn ---

    pub fn begin_pending(&mut self, anchor: PortKey, pointer: Point) {
        self.pending = Some(PendingWire { anchor, pointer });
    }

    pub fn update_pending(&mut self, pointer: Point) {
        if let Some(pending) = &mut self.pending {
            pending.pointer = pointer;
        }
    }

    pub fn clear_pending(&mut self) -> Option<PendingWire> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&PendingWire> {
        self.pending.as_ref()
    }

    /// Path of the wire being drawn. Its free end follows the pointer; a wire
    /// dragged out of an input port runs from the pointer to that port.
    pub fn pending_path(&self, scene: &SceneIndex) -> Option<BezierPath> {
        let pending = self.pending.as_ref()?;
        let anchor = scene
            .port(&pending.anchor.node_id, &pending.anchor.handle, pending.anchor.direction)?
            .center();
        Some(match pending.anchor.direction {
            PortDirection::Out => BezierPath::between(anchor, pending.pointer),
            PortDirection::In => BezierPath::between(pending.pointer, anchor),
        })
    }
}
