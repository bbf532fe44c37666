//! Primitives behind packaging a group as a reusable service and unpacking
//! one back onto the canvas.

use crate::document::{Connection, Document, Group, Node};
use crate::error::DocumentError;
use crate::geometry::{Point, Rect, Vector};
use crate::grouping::{PromotedVariables, promoted_variables};
use crate::ids;
use crate::store::GraphStore;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A self-contained sub-graph cut out of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePackage {
    pub name: String,
    pub nodes: Vec<Node>,
    /// Connections with both endpoints inside the package.
    pub connections: Vec<Connection>,
    /// The packaged group first, then its nested groups, parents before children.
    pub groups: Vec<Group>,
    /// Variables that were wired across the group boundary.
    pub boundary: PromotedVariables,
}

impl ServicePackage {
    /// Extracts the member nodes, internal connections and nested groups of
    /// `group_id`. Group-derived connection flags are cleared; they are
    /// recomputed wherever the package lands.
    pub fn extract(store: &GraphStore, group_id: &str) -> Option<Self> {
        let root = store.group(group_id)?;
        let members: AHashSet<String> = store.descendant_nodes(group_id).into_iter().collect();

        let nodes: Vec<Node> = store
            .nodes()
            .iter()
            .filter(|n| members.contains(&n.id))
            .cloned()
            .collect();
        let connections: Vec<Connection> = store
            .connections()
            .iter()
            .filter(|c| members.contains(&c.source_node_id) && members.contains(&c.target_node_id))
            .map(|c| {
                let mut c = c.clone();
                c.source_group_id = None;
                c.target_group_id = None;
                c.is_in_group = false;
                c
            })
            .collect();

        let mut groups = vec![Group {
            parent: None,
            ..root.clone()
        }];
        let mut cursor = 0;
        while cursor < groups.len() {
            let parent_id = groups[cursor].id.clone();
            for child in store.child_groups(&parent_id) {
                if let Some(group) = store.group(child)
                    && !groups.iter().any(|g| g.id == group.id)
                {
                    groups.push(group.clone());
                }
            }
            cursor += 1;
        }

        debug!(
            %group_id,
            nodes = nodes.len(),
            connections = connections.len(),
            "Service package extracted"
        );
        Some(Self {
            name: root.name.clone(),
            nodes,
            connections,
            groups,
            boundary: promoted_variables(store, group_id),
        })
    }

    /// The package contents as a plain document.
    pub fn to_document(&self) -> Document {
        Document {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            groups: self.groups.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(|e| DocumentError::SerializeError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::JsonParseError(e.to_string()))
    }

    /// Bounding box of the packaged nodes in their original local space.
    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(self.nodes.iter().map(Node::rect).collect::<Vec<_>>().iter())
    }

    /// A copy of the contents with every id replaced by a fresh one and every
    /// position shifted by `offset`.
    pub fn unpack(&self, offset: Vector) -> (Document, IdRemap) {
        let remap = IdRemap::fresh(&self.to_document());
        let mut document = remap.apply(self.to_document());
        for node in &mut document.nodes {
            node.view.x += offset.dx;
            node.view.y += offset.dy;
        }
        for group in &mut document.groups {
            group.view.x += offset.dx;
            group.view.y += offset.dy;
        }
        (document, remap)
    }

    /// Unpacks the package into a live store with its top-left corner at `at`.
    ///
    /// Returns the id mapping, or `None` when nothing could be inserted.
    pub fn unpack_into(&self, store: &mut GraphStore, at: Point) -> Option<IdRemap> {
        let origin = self.bounds()?.min();
        let (document, remap) = self.unpack(at - origin);

        let mut inserted = 0;
        for node in document.nodes {
            if store.add_node(node) {
                inserted += 1;
            }
        }
        for group in document.groups {
            store.add_group(group);
        }
        for connection in document.connections {
            store.add_connection(connection);
        }
        info!(name = %self.name, nodes = inserted, "Service package unpacked");
        (inserted > 0).then_some(remap)
    }
}

/// Old-to-new id mapping used when a sub-graph is copied into a document
/// that may already hold the original ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdRemap {
    nodes: AHashMap<String, String>,
    connections: AHashMap<String, String>,
    groups: AHashMap<String, String>,
}

impl IdRemap {
    /// Allocates a fresh id for every node, connection and group of `document`.
    pub fn fresh(document: &Document) -> Self {
        let mut remap = Self::default();
        for node in &document.nodes {
            let prefix = if node.node_type.is_empty() {
                "node"
            } else {
                node.node_type.as_str()
            };
            remap.nodes.insert(node.id.clone(), ids::generate(prefix));
        }
        for connection in &document.connections {
            remap
                .connections
                .insert(connection.id.clone(), ids::generate("conn"));
        }
        for group in &document.groups {
            remap.groups.insert(group.id.clone(), ids::generate("group"));
        }
        remap
    }

    pub fn node(&self, old: &str) -> Option<&str> {
        self.nodes.get(old).map(String::as_str)
    }

    pub fn connection(&self, old: &str) -> Option<&str> {
        self.connections.get(old).map(String::as_str)
    }

    pub fn group(&self, old: &str) -> Option<&str> {
        self.groups.get(old).map(String::as_str)
    }

    /// Rewrites every id in `document`. Connections and group members that
    /// point outside the mapping are dropped.
    pub fn apply(&self, document: Document) -> Document {
        let nodes = document
            .nodes
            .into_iter()
            .filter_map(|mut node| {
                node.id = self.nodes.get(&node.id)?.clone();
                Some(node)
            })
            .collect();
        let connections = document
            .connections
            .into_iter()
            .filter_map(|mut c| {
                c.id = self.connections.get(&c.id)?.clone();
                c.source_node_id = self.nodes.get(&c.source_node_id)?.clone();
                c.target_node_id = self.nodes.get(&c.target_node_id)?.clone();
                c.source_group_id = c.source_group_id.and_then(|g| self.groups.get(&g).cloned());
                c.target_group_id = c.target_group_id.and_then(|g| self.groups.get(&g).cloned());
                Some(c)
            })
            .collect();
        let groups = document
            .groups
            .into_iter()
            .filter_map(|mut group| {
                group.id = self.groups.get(&group.id)?.clone();
                group.nodes = group
                    .nodes
                    .iter()
                    .filter_map(|id| self.nodes.get(id).cloned())
                    .collect();
                group.parent = group.parent.and_then(|p| self.groups.get(&p).cloned());
                Some(group)
            })
            .collect();
        Document {
            nodes,
            connections,
            groups,
        }
    }
}
