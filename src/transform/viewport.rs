use crate::geometry::{Point, Rect, Vector};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Pan offset and zoom factor of one open document.
///
/// The render transform translates by `origin + pan` and then scales by `zoom`:
/// `screen = origin + pan + local * zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Screen position of the canvas element's top-left corner.
    pub origin: Point,
    pub pan: Vector,
    pub zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
}

const DEFAULT_MIN_ZOOM: f64 = 0.1;
const DEFAULT_MAX_ZOOM: f64 = 4.0;

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

impl Viewport {
    /// A viewport at zoom 1 (clamped into range). An inverted range is
    /// swapped, and a non-positive or non-finite bound falls back to the
    /// default one.
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        let bound = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        let (a, b) = (bound(min_zoom, DEFAULT_MIN_ZOOM), bound(max_zoom, DEFAULT_MAX_ZOOM));
        let (min_zoom, max_zoom) = if a <= b { (a, b) } else { (b, a) };
        Self {
            origin: Point::default(),
            pan: Vector::ZERO,
            zoom: 1.0_f64.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Recovers document coordinates from a pointer position.
    pub fn screen_to_local(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.origin.x - self.pan.dx) / self.zoom,
            (screen.y - self.origin.y - self.pan.dy) / self.zoom,
        )
    }

    pub fn local_to_screen(&self, local: Point) -> Point {
        Point::new(
            local.x * self.zoom + self.pan.dx + self.origin.x,
            local.y * self.zoom + self.pan.dy + self.origin.y,
        )
    }

    pub fn rect_to_screen(&self, local: &Rect) -> Rect {
        let min = self.local_to_screen(local.min());
        Rect::new(min.x, min.y, local.width * self.zoom, local.height * self.zoom)
    }

    /// Converts a pointer displacement into a document displacement.
    pub fn screen_delta_to_local(&self, delta: Vector) -> Vector {
        delta * (1.0 / self.zoom)
    }

    /// Multiplies the zoom by `factor` while keeping the document point under
    /// `screen` fixed. Returns `false` when the clamp left the zoom unchanged.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let anchor = self.screen_to_local(screen);
        let zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        self.pan = Vector::new(
            screen.x - self.origin.x - anchor.x * zoom,
            screen.y - self.origin.y - anchor.y * zoom,
        );
        true
    }

    /// Pans by a raw pointer delta. Screen-space panning is not rescaled by zoom.
    pub fn pan_by(&mut self, delta: Vector) {
        self.pan += delta;
    }

    /// Sets the zoom directly (clamped), keeping the canvas center fixed.
    pub fn set_zoom(&mut self, zoom: f64, canvas_center: Point) -> bool {
        self.zoom_at(canvas_center, zoom / self.zoom)
    }

}

/// Identifies an open document version; each one keeps its own viewport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportKey {
    pub flow_id: String,
    pub version: String,
}

impl ViewportKey {
    pub fn new(flow_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            version: version.into(),
        }
    }
}

/// Viewports of every document opened in this session, so switching back to
/// a document restores the view it was left in.
#[derive(Debug, Clone)]
pub struct ViewportRegistry {
    views: AHashMap<ViewportKey, Viewport>,
    active: Option<ViewportKey>,
    template: Viewport,
}

impl ViewportRegistry {
    /// `template` is the viewport handed to documents opened for the first time.
    pub fn new(template: Viewport) -> Self {
        Self {
            views: AHashMap::new(),
            active: None,
            template,
        }
    }

    /// Makes `key` the active document, creating its viewport if needed.
    pub fn activate(&mut self, key: ViewportKey) -> &mut Viewport {
        let template = self.template;
        self.active = Some(key.clone());
        self.views.entry(key).or_insert(template)
    }

    /// The active viewport, or the template when nothing is open.
    pub fn active(&self) -> &Viewport {
        self.active
            .as_ref()
            .and_then(|key| self.views.get(key))
            .unwrap_or(&self.template)
    }

    pub fn active_mut(&mut self) -> &mut Viewport {
        match &self.active {
            Some(key) => self.views.entry(key.clone()).or_insert(self.template),
            None => &mut self.template,
        }
    }

    pub fn get(&self, key: &ViewportKey) -> Option<&Viewport> {
        self.views.get(key)
    }
}
