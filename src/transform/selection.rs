use super::viewport::Viewport;
use crate::geometry::{Point, Rect};
use crate::store::GraphStore;

/// Rubber-band selection rectangle, tracked in local coordinates.
///
/// Both corners are converted through the viewport as the pointer moves, so
/// the rectangle can be tested directly against node views at any zoom or pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBox {
    anchor: Point,
    current: Point,
}

impl SelectionBox {
    /// Starts a box at a pointer position.
    pub fn start(viewport: &Viewport, screen: Point) -> Self {
        let local = viewport.screen_to_local(screen);
        Self {
            anchor: local,
            current: local,
        }
    }

    pub fn update(&mut self, viewport: &Viewport, screen: Point) {
        self.current = viewport.screen_to_local(screen);
    }

    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.anchor, self.current)
    }

    /// Ids of every node whose view overlaps the box, in store order.
    pub fn select(&self, store: &GraphStore) -> Vec<String> {
        select_in_rect(store, &self.rect())
    }
}

/// Ids of every node whose view rectangle overlaps `rect` (local space).
/// Nodes hidden inside a collapsed group are not selectable.
pub fn select_in_rect(store: &GraphStore, rect: &Rect) -> Vec<String> {
    store
        .nodes()
        .iter()
        .filter(|node| node.rect().intersects(rect))
        .filter(|node| store.visible_collapsed_ancestor(&node.id).is_none())
        .map(|node| node.id.clone())
        .collect()
}
