use crate::config::CanvasConfig;
use crate::document::{Connection, PortDirection};
use crate::geometry::{Point, Vector};
use crate::grouping;
use crate::ids;
use crate::router::{ConnectorRouter, PortKey};
use crate::store::GraphStore;
use crate::transform::{SelectionBox, Viewport};
use tracing::debug;

mod mode;

pub use mode::{Commit, FrameUpdate, HitTarget, Mode, Tool};

/// Nodes and collapsed groups currently selected, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub nodes: Vec<String>,
    pub groups: Vec<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.groups.clear();
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }

    pub fn contains_group(&self, id: &str) -> bool {
        self.groups.iter().any(|g| g == id)
    }

    fn toggle(list: &mut Vec<String>, id: &str) {
        match list.iter().position(|x| x == id) {
            Some(idx) => {
                list.remove(idx);
            }
            None => list.push(id.to_string()),
        }
    }
}

/// Pointer-gesture state machine.
///
/// `pointer_down` picks the gesture from the hit target and the active tool,
/// `pointer_move` only accumulates, [`frame`](Self::frame) applies the
/// accumulated change once per animation frame, and `pointer_up` (or
/// `pointer_leave`) commits and returns to [`Mode::Idle`].
#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: Mode,
    tool: Tool,
    selection: Selection,
    min_node_size: (f64, f64),
    group_padding: f64,
    wheel_sensitivity: f64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            mode: Mode::Idle,
            tool: Tool::default(),
            selection: Selection::default(),
            min_node_size: (config.min_node_width, config.min_node_height),
            group_padding: config.group_padding,
            wheel_sensitivity: config.wheel_sensitivity,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching tools mid-gesture has no effect on the gesture itself.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select_nodes<S: AsRef<str>>(&mut self, ids: &[S]) {
        self.selection.clear();
        self.selection.nodes = ids.iter().map(|id| id.as_ref().to_string()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selects every node that is not hidden inside a collapsed group, and
    /// every collapsed group that is itself visible.
    pub fn select_all(&mut self, store: &GraphStore) {
        self.selection.nodes = store
            .nodes()
            .iter()
            .filter(|n| store.visible_collapsed_ancestor(&n.id).is_none())
            .map(|n| n.id.clone())
            .collect();
        self.selection.groups = store
            .groups()
            .iter()
            .filter(|g| g.collapsed && !parent_collapsed(store, g.parent.as_deref()))
            .map(|g| g.id.clone())
            .collect();
    }

    /// Deletes the selected nodes (cascading to their connections) and the
    /// selected groups together with their content. Returns the removed node ids.
    pub fn delete_selection(&mut self, store: &mut GraphStore) -> Vec<String> {
        let mut doomed: Vec<String> = self.selection.nodes.clone();
        for group_id in &self.selection.groups {
            doomed.extend(store.descendant_nodes(group_id));
        }
        let mut removed = Vec::new();
        for id in doomed {
            if store.remove_node(&id).is_some() {
                removed.push(id);
            }
        }
        for group_id in std::mem::take(&mut self.selection.groups) {
            let nested: Vec<String> = store
                .groups()
                .iter()
                .filter(|g| is_nested_in(store, &g.id, &group_id))
                .map(|g| g.id.clone())
                .collect();
            for id in nested {
                store.remove_group(&id);
            }
            store.remove_group(&group_id);
        }
        self.selection.clear();
        debug!(removed = removed.len(), "Selection deleted");
        removed
    }

    // --- Pointer events ---

    /// Starts a gesture. Ignored (returns `false`) while another gesture is
    /// still in progress.
    pub fn pointer_down(
        &mut self,
        hit: HitTarget,
        screen: Point,
        viewport: &Viewport,
        router: &mut ConnectorRouter,
        additive: bool,
    ) -> bool {
        if !self.mode.is_idle() {
            debug!(mode = ?self.mode, "pointer_down ignored: gesture in progress");
            return false;
        }
        self.mode = match (hit, self.tool) {
            (hit @ HitTarget::Port { .. }, _) => {
                let Some(anchor) = hit.port_key() else {
                    return false;
                };
                router.begin_pending(anchor.clone(), screen);
                Mode::DrawingConnection { anchor }
            }
            (HitTarget::ResizeHandle(node_id), _) => Mode::ResizingNode {
                node_id,
                last: screen,
                pending: Vector::ZERO,
            },
            (_, Tool::BoxSelect) => {
                if !additive {
                    self.selection.clear();
                }
                Mode::BoxSelecting(SelectionBox::start(viewport, screen))
            }
            (HitTarget::Canvas, Tool::Pointer) if additive => {
                Mode::BoxSelecting(SelectionBox::start(viewport, screen))
            }
            (HitTarget::Canvas, Tool::Pointer) => {
                self.selection.clear();
                Mode::Panning {
                    last: screen,
                    pending: Vector::ZERO,
                }
            }
            (HitTarget::Node(id), Tool::Pointer) => {
                self.press_element(&id, additive, false);
                Mode::DraggingSelection {
                    last: screen,
                    pending: Vector::ZERO,
                }
            }
            (HitTarget::Group(id), Tool::Pointer) => {
                self.press_element(&id, additive, true);
                Mode::DraggingSelection {
                    last: screen,
                    pending: Vector::ZERO,
                }
            }
        };
        true
    }

    fn press_element(&mut self, id: &str, additive: bool, is_group: bool) {
        let already = if is_group {
            self.selection.contains_group(id)
        } else {
            self.selection.contains_node(id)
        };
        if additive {
            let list = if is_group {
                &mut self.selection.groups
            } else {
                &mut self.selection.nodes
            };
            Selection::toggle(list, id);
        } else if !already {
            self.selection.clear();
            if is_group {
                self.selection.groups.push(id.to_string());
            } else {
                self.selection.nodes.push(id.to_string());
            }
        }
    }

    /// Records pointer motion. Returns `false` while idle.
    pub fn pointer_move(
        &mut self,
        screen: Point,
        viewport: &Viewport,
        router: &mut ConnectorRouter,
    ) -> bool {
        match &mut self.mode {
            Mode::Idle => return false,
            Mode::Panning { last, pending } => {
                *pending += screen - *last;
                *last = screen;
            }
            Mode::DraggingSelection { last, pending }
            | Mode::ResizingNode { last, pending, .. } => {
                *pending += viewport.screen_delta_to_local(screen - *last);
                *last = screen;
            }
            Mode::BoxSelecting(selection_box) => selection_box.update(viewport, screen),
            Mode::DrawingConnection { .. } => router.update_pending(screen),
        }
        true
    }

    /// Applies whatever accumulated since the previous frame.
    ///
    /// Every selected node receives the same local delta; panning is applied
    /// in raw screen pixels, independent of the zoom factor.
    pub fn frame(&mut self, store: &mut GraphStore, viewport: &mut Viewport) -> FrameUpdate {
        let mut update = FrameUpdate::default();
        match &mut self.mode {
            Mode::Panning { pending, .. } if !pending.is_zero() => {
                viewport.pan_by(*pending);
                *pending = Vector::ZERO;
                update.panned = true;
            }
            Mode::DraggingSelection { pending, .. } if !pending.is_zero() => {
                let delta = std::mem::take(pending);
                for id in &self.selection.nodes {
                    if store.update_node_position(id, delta.dx, delta.dy) {
                        update.moved_nodes.push(id.clone());
                    }
                }
                for id in &self.selection.groups {
                    if grouping::move_group(store, id, delta, self.group_padding) {
                        update.moved_groups.push(id.clone());
                    }
                }
            }
            Mode::ResizingNode {
                node_id, pending, ..
            } if !pending.is_zero() => {
                let delta = std::mem::take(pending);
                if store.update_node_size(node_id, delta, self.min_node_size) {
                    update.resized_node = Some(node_id.clone());
                }
            }
            _ => {}
        }
        update
    }

    /// Ends the gesture and commits it. `hit` is what lies under the release point.
    pub fn pointer_up(
        &mut self,
        hit: &HitTarget,
        screen: Point,
        store: &mut GraphStore,
        viewport: &mut Viewport,
        router: &mut ConnectorRouter,
    ) -> Commit {
        self.pointer_move(screen, viewport, router);
        self.commit(hit, store, viewport, router)
    }

    /// Leaving the canvas commits like a release over empty background, at
    /// the last known pointer position.
    pub fn pointer_leave(
        &mut self,
        store: &mut GraphStore,
        viewport: &mut Viewport,
        router: &mut ConnectorRouter,
    ) -> Commit {
        self.commit(&HitTarget::Canvas, store, viewport, router)
    }

    fn commit(
        &mut self,
        hit: &HitTarget,
        store: &mut GraphStore,
        viewport: &mut Viewport,
        router: &mut ConnectorRouter,
    ) -> Commit {
        self.frame(store, viewport);
        let mode = std::mem::replace(&mut self.mode, Mode::Idle);
        match mode {
            Mode::Idle => Commit::Nothing,
            Mode::Panning { .. } => Commit::Panned,
            Mode::DraggingSelection { .. } => Commit::Moved(self.selection.nodes.clone()),
            Mode::ResizingNode { node_id, .. } => Commit::Resized(node_id),
            Mode::BoxSelecting(selection_box) => {
                for id in selection_box.select(store) {
                    if !self.selection.contains_node(&id) {
                        self.selection.nodes.push(id);
                    }
                }
                Commit::Selected(self.selection.nodes.clone())
            }
            Mode::DrawingConnection { anchor } => {
                router.clear_pending();
                match hit.port_key().and_then(|target| connect(store, &anchor, &target)) {
                    Some(id) => Commit::Connected(id),
                    None => Commit::ConnectionCancelled,
                }
            }
        }
    }

    /// Zooms around the cursor by a wheel delta. Works in any mode.
    pub fn wheel(&self, viewport: &mut Viewport, screen: Point, delta_y: f64) -> bool {
        let factor = (-delta_y * self.wheel_sensitivity).exp();
        viewport.zoom_at(screen, factor)
    }
}

fn parent_collapsed(store: &GraphStore, parent: Option<&str>) -> bool {
    let mut current = parent;
    let mut depth = 0;
    while let Some(id) = current {
        let Some(group) = store.group(id) else {
            return false;
        };
        if group.collapsed {
            return true;
        }
        depth += 1;
        if depth > store.groups().len() {
            return false;
        }
        current = group.parent.as_deref();
    }
    false
}

fn is_nested_in(store: &GraphStore, group_id: &str, ancestor: &str) -> bool {
    let mut current = store.group(group_id).and_then(|g| g.parent.as_deref());
    let mut depth = 0;
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        depth += 1;
        if depth > store.groups().len() {
            return false;
        }
        current = store.group(id).and_then(|g| g.parent.as_deref());
    }
    false
}

/// Whether two variable types may be wired together.
pub fn types_compatible(a: &str, b: &str) -> bool {
    a == b || a == "any" || b == "any"
}

/// Completes a wire drawn from `anchor` and released over `target`.
///
/// The target must be an opposite-direction port on another node with a
/// compatible type, and the same wire must not exist already.
fn connect(store: &mut GraphStore, anchor: &PortKey, target: &PortKey) -> Option<String> {
    if anchor.direction == target.direction || anchor.node_id == target.node_id {
        debug!(?anchor, ?target, "Connection rejected: same direction or same node");
        return None;
    }
    let (source, sink) = match anchor.direction {
        PortDirection::Out => (anchor, target),
        PortDirection::In => (target, anchor),
    };
    let source_var = store
        .node(&source.node_id)?
        .find_variable(&source.handle)
        .filter(|v| v.accepts(PortDirection::Out))?;
    let sink_var = store
        .node(&sink.node_id)?
        .find_variable(&sink.handle)
        .filter(|v| v.accepts(PortDirection::In))?;
    if !types_compatible(&source_var.var_type, &sink_var.var_type) {
        debug!(
            source = %source_var.var_type,
            target = %sink_var.var_type,
            "Connection rejected: incompatible types"
        );
        return None;
    }
    let duplicate = store.connections().iter().any(|c| {
        c.endpoint(PortDirection::Out) == (source.node_id.as_str(), source.handle.as_str())
            && c.endpoint(PortDirection::In) == (sink.node_id.as_str(), sink.handle.as_str())
    });
    if duplicate {
        return None;
    }
    let connection = Connection::new(
        ids::generate("conn"),
        (source.node_id.as_str(), source.handle.as_str()),
        (sink.node_id.as_str(), sink.handle.as_str()),
    );
    let id = connection.id.clone();
    store.add_connection(connection).then_some(id)
}
