use super::Canvas;
use crate::catalog::TemplateCatalog;
use crate::config::CanvasConfig;
use crate::document::Document;
use crate::geometry::Point;
use crate::interaction::InteractionController;
use crate::overlay::ExecutionOverlay;
use crate::router::{ConnectorRouter, SceneIndex};
use crate::store::GraphStore;
use crate::transform::{Viewport, ViewportKey, ViewportRegistry};
use ahash::AHashMap;
use tracing::warn;

pub struct CanvasBuilder {
    document: Document,
    config: CanvasConfig,
    catalog: Option<Box<dyn TemplateCatalog>>,
    flow: Option<ViewportKey>,
    origin: Point,
}

impl CanvasBuilder {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            config: CanvasConfig::default(),
            catalog: None,
            flow: None,
            origin: Point::default(),
        }
    }

    pub fn with_config(mut self, config: CanvasConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: impl TemplateCatalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    /// Opens the document under this flow/version, so its viewport is remembered.
    pub fn with_flow(mut self, flow_id: &str, version: &str) -> Self {
        self.flow = Some(ViewportKey::new(flow_id, version));
        self
    }

    /// Screen position of the canvas element's top-left corner.
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Builds the canvas and lays the document out. An invalid zoom range in
    /// the config is reported and normalised by the viewport.
    pub fn build(self) -> Canvas {
        if let Err(e) = self.config.validate() {
            warn!(error = %e, "Canvas config rejected, normalising zoom range");
        }
        let template =
            Viewport::new(self.config.min_zoom, self.config.max_zoom).with_origin(self.origin);
        let mut viewports = ViewportRegistry::new(template);
        if let Some(key) = self.flow {
            viewports.activate(key);
        }
        let mut canvas = Canvas {
            store: GraphStore::from_document(self.document),
            router: ConnectorRouter::new(self.config.slot_spacing),
            controller: InteractionController::new(&self.config),
            scene: SceneIndex::new(),
            scene_viewport: None,
            overlay: ExecutionOverlay::new(),
            promoted: AHashMap::new(),
            catalog: self.catalog,
            viewports,
            config: self.config,
        };
        canvas.settle();
        canvas
    }
}
