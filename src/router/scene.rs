use crate::config::CanvasConfig;
use crate::document::{Node, PortDirection};
use crate::geometry::{Point, Rect};
use crate::interaction::HitTarget;
use crate::store::GraphStore;
use crate::transform::Viewport;
use ahash::AHashMap;

/// Addresses one port of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortKey {
    pub node_id: String,
    pub handle: String,
    pub direction: PortDirection,
}

impl PortKey {
    pub fn new(node_id: impl Into<String>, handle: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            node_id: node_id.into(),
            handle: handle.into(),
            direction,
        }
    }
}

/// Screen-space geometry of everything currently rendered.
///
/// The render layer owns this index and updates it as it draws; the router,
/// the hit tester and the execution overlay only read it. [`SceneIndex::layout`]
/// builds one from the store for headless use.
#[derive(Debug, Clone)]
pub struct SceneIndex {
    ports: AHashMap<PortKey, Rect>,
    node_bodies: AHashMap<String, Rect>,
    group_bodies: AHashMap<String, Rect>,
    /// Insertion order of bodies, bottom to top, for hit testing.
    node_order: Vec<String>,
    group_order: Vec<String>,
    group_ports: AHashMap<(String, PortDirection), Rect>,
    concealed: AHashMap<String, String>,
    scale: f64,
    resize_handle: f64,
}

impl Default for SceneIndex {
    fn default() -> Self {
        Self {
            ports: AHashMap::new(),
            node_bodies: AHashMap::new(),
            group_bodies: AHashMap::new(),
            node_order: Vec::new(),
            group_order: Vec::new(),
            group_ports: AHashMap::new(),
            concealed: AHashMap::new(),
            scale: 1.0,
            resize_handle: 12.0,
        }
    }
}

impl SceneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zoom factor the geometry was rendered at.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_port(&mut self, key: PortKey, rect: Rect) {
        self.ports.insert(key, rect);
    }

    pub fn port(&self, node_id: &str, handle: &str, direction: PortDirection) -> Option<Rect> {
        self.ports
            .get(&PortKey::new(node_id, handle, direction))
            .copied()
    }

    pub fn set_node_body(&mut self, node_id: &str, rect: Rect) {
        if self.node_bodies.insert(node_id.to_string(), rect).is_none() {
            self.node_order.push(node_id.to_string());
        }
    }

    pub fn node_body(&self, node_id: &str) -> Option<Rect> {
        self.node_bodies.get(node_id).copied()
    }

    /// Registers the box of a collapsed group.
    pub fn set_group_body(&mut self, group_id: &str, rect: Rect) {
        if self.group_bodies.insert(group_id.to_string(), rect).is_none() {
            self.group_order.push(group_id.to_string());
        }
    }

    pub fn group_body(&self, group_id: &str) -> Option<Rect> {
        self.group_bodies.get(group_id).copied()
    }

    pub fn set_group_port(&mut self, group_id: &str, direction: PortDirection, rect: Rect) {
        self.group_ports
            .insert((group_id.to_string(), direction), rect);
    }

    pub fn group_port(&self, group_id: &str, direction: PortDirection) -> Option<Rect> {
        self.group_ports
            .get(&(group_id.to_string(), direction))
            .copied()
    }

    /// Records that `node_id` is drawn as part of the collapsed group `group_id`.
    pub fn conceal(&mut self, node_id: &str, group_id: &str) {
        self.concealed
            .insert(node_id.to_string(), group_id.to_string());
    }

    /// The collapsed group rendering a hidden node, if it is itself on screen.
    pub fn visible_ancestor(&self, node_id: &str) -> Option<&str> {
        self.concealed
            .get(node_id)
            .map(String::as_str)
            .filter(|group_id| self.group_body(group_id).is_some())
    }

    /// Builds the scene headlessly from the store: one port row per variable
    /// (aggregate entries included) with inputs on the left edge and outputs on
    /// the right edge, and collapsed groups drawn as fixed-size boxes with one
    /// boundary port per side.
    pub fn layout(store: &GraphStore, viewport: &Viewport, config: &CanvasConfig) -> Self {
        let mut scene = Self {
            scale: viewport.zoom,
            resize_handle: config.resize_handle_size,
            ..Self::default()
        };

        for group in store.groups() {
            if !group.collapsed {
                continue;
            }
            let hidden = group
                .parent
                .as_deref()
                .is_some_and(|parent| group_is_hidden(store, parent));
            if hidden {
                continue;
            }
            let local = Rect::new(
                group.view.x,
                group.view.y,
                config.collapsed_group_width,
                config.collapsed_group_height,
            );
            let body = viewport.rect_to_screen(&local);
            scene.set_group_body(&group.id, body);
            let mid_y = local.y + local.height / 2.0;
            for (direction, x) in [
                (PortDirection::In, local.x),
                (PortDirection::Out, local.x + local.width),
            ] {
                let port = port_rect(Point::new(x, mid_y), config.port_size);
                scene.set_group_port(&group.id, direction, viewport.rect_to_screen(&port));
            }
        }

        for node in store.nodes() {
            if let Some(group_id) = store.visible_collapsed_ancestor(&node.id) {
                scene.conceal(&node.id, group_id);
                continue;
            }
            scene.set_node_body(&node.id, viewport.rect_to_screen(&node.rect()));
            for (key, local) in node_port_rects(node, config) {
                scene.set_port(key, viewport.rect_to_screen(&local));
            }
        }
        scene
    }

    /// Re-lays out one node that is already drawn, in place: its body and its
    /// ports move, draw order is kept. Returns `false` when the node is not
    /// drawn as itself (unknown, new, or hidden in a collapsed group), in which
    /// case only a full [`layout`](Self::layout) is correct.
    pub fn relayout_node(
        &mut self,
        store: &GraphStore,
        viewport: &Viewport,
        config: &CanvasConfig,
        node_id: &str,
    ) -> bool {
        let Some(node) = store.node(node_id) else {
            return false;
        };
        if !self.node_bodies.contains_key(node_id) {
            return false;
        }
        self.node_bodies
            .insert(node_id.to_string(), viewport.rect_to_screen(&node.rect()));
        for (key, local) in node_port_rects(node, config) {
            self.ports.insert(key, viewport.rect_to_screen(&local));
        }
        true
    }

    /// Finds the topmost element under a screen point.
    pub fn hit_test(&self, screen: Point) -> HitTarget {
        let port = self
            .ports
            .iter()
            .filter(|(_, rect)| rect.inflate(2.0).contains(screen))
            .min_by(|a, b| {
                a.1.center()
                    .distance(screen)
                    .total_cmp(&b.1.center().distance(screen))
            });
        if let Some((key, _)) = port {
            return HitTarget::Port {
                node_id: key.node_id.clone(),
                handle: key.handle.clone(),
                direction: key.direction,
            };
        }

        let grip = self.resize_handle * self.scale;
        for id in self.node_order.iter().rev() {
            let Some(body) = self.node_bodies.get(id) else {
                continue;
            };
            if !body.contains(screen) {
                continue;
            }
            let corner = body.max();
            if screen.x >= corner.x - grip && screen.y >= corner.y - grip {
                return HitTarget::ResizeHandle(id.clone());
            }
            return HitTarget::Node(id.clone());
        }

        for id in self.group_order.iter().rev() {
            if self.group_bodies.get(id).is_some_and(|body| body.contains(screen)) {
                return HitTarget::Group(id.clone());
            }
        }
        HitTarget::Canvas
    }
}

fn group_is_hidden(store: &GraphStore, group_id: &str) -> bool {
    let mut current = Some(group_id);
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

fn port_rect(center: Point, size: f64) -> Rect {
    Rect::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
}

/// Local-space port rectangles of a node. Collapsed nodes stack every port on
/// the middle of their title bar.
pub fn node_port_rects(node: &Node, config: &CanvasConfig) -> Vec<(PortKey, Rect)> {
    let view = &node.view;
    let mut out = Vec::new();
    for (row, variable) in node.flat_variables().into_iter().enumerate() {
        let y = if view.collapsed {
            view.y + config.header_height / 2.0
        } else {
            view.y + config.header_height + config.row_height * (row as f64 + 0.5)
        };
        if variable.has_in {
            out.push((
                PortKey::new(&node.id, &variable.handle, PortDirection::In),
                port_rect(Point::new(view.x, y), config.port_size),
            ));
        }
        if variable.has_out {
            out.push((
                PortKey::new(&node.id, &variable.handle, PortDirection::Out),
                port_rect(Point::new(view.x + view.width, y), config.port_size),
            ));
        }
    }
    out
}
