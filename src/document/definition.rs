use crate::error::DocumentError;
use crate::geometry::Rect;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// The complete, canonical flow document exchanged with the save/load collaborator.
///
/// The wire shape is `{ "nodes": [...], "connections": [...] }`; `groups` is only
/// emitted when the document actually contains groups, so group-free documents
/// keep the two-key shape byte for byte.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
}

/// A single processing step placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub variables: Vec<NodeVariable>,
    #[serde(default)]
    pub view: NodeView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceRef>,
}

/// Position, size and display flags of a node, in document-local space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeView {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Set while a freshly instantiated node is still being placed. Never persisted.
    #[serde(skip)]
    pub adding: bool,
}

/// Reference to the reusable packaged sub-graph a node instantiates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A typed, optionally connectable variable of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeVariable {
    pub handle: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub var_type: String,
    #[serde(default)]
    pub value: VariableValue,
    #[serde(default)]
    pub has_in: bool,
    #[serde(default)]
    pub has_out: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dock: Option<DockConfig>,
}

/// The value held by a variable.
///
/// `Variables` holds the sub-variables of an aggregate (dict) variable; each of
/// them owns its own handle and can be wired independently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Variables(Vec<NodeVariable>),
    Files(Vec<FileRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub url: String,
}

/// Display configuration of a variable in the node dock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockConfig {
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_visible() -> bool {
    true
}

/// A directed wire from a source port (an output) to a target port (an input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub source_handle: String,
    pub target_node_id: String,
    pub target_handle: String,
    /// Collapsed group standing in for the source node on screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_group_id: Option<String>,
    /// Collapsed group standing in for the target node on screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group_id: Option<String>,
    #[serde(default)]
    pub is_in_group: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// A named, collapsible container of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub nodes: Vec<String>,
    /// Enclosing group when groups are nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Bounding box of the members. Recomputed, never authoritative.
    #[serde(default)]
    pub view: Rect,
    #[serde(default)]
    pub collapsed: bool,
}

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    In,
    Out,
}

impl PortDirection {
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::In => PortDirection::Out,
            PortDirection::Out => PortDirection::In,
        }
    }
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            category: String::new(),
            variables: Vec::new(),
            view: NodeView::default(),
            service: None,
        }
    }

    /// The node's view rectangle in local space.
    pub fn rect(&self) -> Rect {
        Rect::new(self.view.x, self.view.y, self.view.width, self.view.height)
    }

    /// Finds a variable by handle, searching nested aggregate variables too.
    pub fn find_variable(&self, handle: &str) -> Option<&NodeVariable> {
        find_in(&self.variables, handle)
    }

    pub fn find_variable_mut(&mut self, handle: &str) -> Option<&mut NodeVariable> {
        find_in_mut(&mut self.variables, handle)
    }

    /// Every variable of the node in depth-first order, aggregates before their entries.
    pub fn flat_variables(&self) -> Vec<&NodeVariable> {
        let mut out = Vec::new();
        collect_flat(&self.variables, &mut out);
        out
    }
}

fn find_in<'a>(variables: &'a [NodeVariable], handle: &str) -> Option<&'a NodeVariable> {
    for variable in variables {
        if variable.handle == handle {
            return Some(variable);
        }
        if let VariableValue::Variables(children) = &variable.value
            && let Some(found) = find_in(children, handle)
        {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(
    variables: &'a mut [NodeVariable],
    handle: &str,
) -> Option<&'a mut NodeVariable> {
    for variable in variables.iter_mut() {
        if variable.handle == handle {
            return Some(variable);
        }
        if let VariableValue::Variables(children) = &mut variable.value
            && let Some(found) = find_in_mut(children, handle)
        {
            return Some(found);
        }
    }
    None
}

fn collect_flat<'a>(variables: &'a [NodeVariable], out: &mut Vec<&'a NodeVariable>) {
    for variable in variables {
        out.push(variable);
        if let VariableValue::Variables(children) = &variable.value {
            collect_flat(children, out);
        }
    }
}

impl NodeVariable {
    pub fn new(handle: impl Into<String>, var_type: impl Into<String>) -> Self {
        let handle = handle.into();
        Self {
            name: handle.clone(),
            handle,
            var_type: var_type.into(),
            value: VariableValue::Null,
            has_in: false,
            has_out: false,
            published: false,
            group_name_override: None,
            dock: None,
        }
    }

    pub fn with_ports(mut self, has_in: bool, has_out: bool) -> Self {
        self.has_in = has_in;
        self.has_out = has_out;
        self
    }

    pub fn with_value(mut self, value: VariableValue) -> Self {
        self.value = value;
        self
    }

    pub fn accepts(&self, direction: PortDirection) -> bool {
        match direction {
            PortDirection::In => self.has_in,
            PortDirection::Out => self.has_out,
        }
    }

    /// Variables without dock configuration are shown in the dock.
    pub fn is_dock_visible(&self) -> bool {
        self.dock.as_ref().is_none_or(|dock| dock.visible)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.value, VariableValue::Variables(_))
    }

    /// The `(type, has_in, has_out)` triple used to recognise renamed entries.
    pub fn fingerprint(&self) -> (&str, bool, bool) {
        (self.var_type.as_str(), self.has_in, self.has_out)
    }

    /// Name shown when the variable is surfaced on a group boundary.
    pub fn boundary_name(&self) -> &str {
        self.group_name_override.as_deref().unwrap_or(&self.name)
    }
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source: (&str, &str),
        target: (&str, &str),
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.0.to_string(),
            source_handle: source.1.to_string(),
            target_node_id: target.0.to_string(),
            target_handle: target.1.to_string(),
            source_group_id: None,
            target_group_id: None,
            is_in_group: false,
            hidden: false,
        }
    }

    pub fn touches_node(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// Whether the connection is drawn to or from the boundary port of `group_id`.
    pub fn touches_group(&self, group_id: &str) -> bool {
        self.source_group_id.as_deref() == Some(group_id)
            || self.target_group_id.as_deref() == Some(group_id)
    }

    /// `(node id, handle)` of the endpoint on the given side of the wire.
    ///
    /// `Out` is the source end and `In` the target end.
    pub fn endpoint(&self, direction: PortDirection) -> (&str, &str) {
        match direction {
            PortDirection::Out => (&self.source_node_id, &self.source_handle),
            PortDirection::In => (&self.target_node_id, &self.target_handle),
        }
    }

    pub fn group_alias(&self, direction: PortDirection) -> Option<&str> {
        match direction {
            PortDirection::Out => self.source_group_id.as_deref(),
            PortDirection::In => self.target_group_id.as_deref(),
        }
    }
}

impl Group {
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|id| id == node_id)
    }
}

impl Document {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::JsonParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(|e| DocumentError::SerializeError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DocumentError::SerializeError(e.to_string()))
    }

    /// Checks referential integrity and reports the first violation found.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut node_ids = AHashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(DocumentError::DuplicateId {
                    kind: "node",
                    id: node.id.clone(),
                });
            }
        }

        let mut group_ids = AHashSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(DocumentError::DuplicateId {
                    kind: "group",
                    id: group.id.clone(),
                });
            }
        }

        let mut owner: AHashMap<&str, &str> = AHashMap::new();
        for group in &self.groups {
            for member in &group.nodes {
                if !node_ids.contains(member.as_str()) {
                    return Err(DocumentError::DanglingMember {
                        group_id: group.id.clone(),
                        node_id: member.clone(),
                    });
                }
                if let Some(first) = owner.insert(member, &group.id) {
                    return Err(DocumentError::MultipleMembership {
                        node_id: member.clone(),
                        first: first.to_string(),
                        second: group.id.clone(),
                    });
                }
            }
        }

        let mut connection_ids = AHashSet::new();
        for connection in &self.connections {
            if !connection_ids.insert(connection.id.as_str()) {
                return Err(DocumentError::DuplicateId {
                    kind: "connection",
                    id: connection.id.clone(),
                });
            }
            for node_id in [&connection.source_node_id, &connection.target_node_id] {
                if !node_ids.contains(node_id.as_str()) {
                    return Err(DocumentError::DanglingConnection {
                        connection_id: connection.id.clone(),
                        kind: "node",
                        missing_id: node_id.clone(),
                    });
                }
            }
            for group_id in [&connection.source_group_id, &connection.target_group_id]
                .into_iter()
                .flatten()
            {
                if !group_ids.contains(group_id.as_str()) {
                    return Err(DocumentError::DanglingConnection {
                        connection_id: connection.id.clone(),
                        kind: "group",
                        missing_id: group_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
