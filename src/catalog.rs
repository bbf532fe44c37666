use crate::document::Node;
use crate::error::DocumentError;
use crate::geometry::Point;
use crate::ids;
use crate::store::GraphStore;
use ahash::AHashMap;
use std::fs;
use tracing::debug;

/// Read-only lookup of canonical node templates, addressed by path
/// (for instance `"llm/openai"`).
pub trait TemplateCatalog {
    fn get_template_by_path(&self, path: &str) -> Option<Node>;
}

/// A catalog held in memory, typically loaded from a JSON object mapping
/// template paths to nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    templates: AHashMap<String, Node>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, path: impl Into<String>, node: Node) -> Self {
        self.templates.insert(path.into(), node);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let templates: AHashMap<String, Node> =
            serde_json::from_str(json).map_err(|e| DocumentError::JsonParseError(e.to_string()))?;
        Ok(Self { templates })
    }

    pub fn from_file(path: &str) -> Result<Self, DocumentError> {
        let json = fs::read_to_string(path).map_err(|e| DocumentError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateCatalog for StaticCatalog {
    fn get_template_by_path(&self, path: &str) -> Option<Node> {
        self.templates.get(path).cloned()
    }
}

impl GraphStore {
    /// Places a copy of a catalog template at local position `at` under a
    /// fresh id. The new node carries the transient "adding" flag until
    /// [`finish_adding`](GraphStore::finish_adding) is called.
    pub fn instantiate_template(
        &mut self,
        catalog: &dyn TemplateCatalog,
        path: &str,
        at: Point,
    ) -> Option<String> {
        let Some(mut node) = catalog.get_template_by_path(path) else {
            debug!(%path, "instantiate_template ignored: unknown template");
            return None;
        };
        let prefix = if node.node_type.is_empty() {
            "node"
        } else {
            node.node_type.as_str()
        };
        node.id = ids::generate(prefix);
        node.view.x = at.x;
        node.view.y = at.y;
        node.view.adding = true;
        let id = node.id.clone();
        self.add_node(node).then_some(id)
    }
}
