use crate::document::PortDirection;
use crate::store::GraphStore;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// A member variable surfaced on a group's boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotedVariable {
    pub node_id: String,
    pub handle: String,
    /// `group_name_override` when set, the variable's own name otherwise.
    pub name: String,
    pub var_type: String,
    pub published: bool,
    /// Boundary-crossing connections that caused the promotion.
    pub connection_ids: Vec<String>,
}

/// Editable surface of a collapsed group, split by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotedVariables {
    pub inputs: Vec<PromotedVariable>,
    pub outputs: Vec<PromotedVariable>,
}

impl PromotedVariables {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    pub fn side(&self, direction: PortDirection) -> &[PromotedVariable] {
        match direction {
            PortDirection::In => &self.inputs,
            PortDirection::Out => &self.outputs,
        }
    }

    /// Looks a promoted variable up by `(node id, handle)`.
    pub fn find(&self, node_id: &str, handle: &str) -> Option<&PromotedVariable> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .find(|v| v.node_id == node_id && v.handle == handle)
    }
}

/// Scans the members of a group (nested groups included) and collects every
/// dock-visible variable with a live connection crossing the group boundary.
///
/// Variables are visited once each, in store order and depth-first within a
/// node, so the lists are deduplicated by `(node id, handle)` and stable
/// between calls.
pub fn promoted_variables(store: &GraphStore, group_id: &str) -> PromotedVariables {
    let mut promoted = PromotedVariables::default();
    if store.group(group_id).is_none() {
        return promoted;
    }
    let members: AHashSet<String> = store.descendant_nodes(group_id).into_iter().collect();

    for node in store.nodes().iter().filter(|n| members.contains(&n.id)) {
        for variable in node.flat_variables() {
            if !variable.is_dock_visible() {
                continue;
            }
            for direction in [PortDirection::In, PortDirection::Out] {
                if !variable.accepts(direction) {
                    continue;
                }
                let crossing: Vec<String> = store
                    .connections_at_port(&node.id, &variable.handle, direction)
                    .into_iter()
                    .filter(|c| !c.hidden)
                    .filter(|c| {
                        let (far_node, _) = c.endpoint(direction.opposite());
                        !members.contains(far_node)
                    })
                    .map(|c| c.id.clone())
                    .collect();
                if crossing.is_empty() {
                    continue;
                }
                let entry = PromotedVariable {
                    node_id: node.id.clone(),
                    handle: variable.handle.clone(),
                    name: variable.boundary_name().to_string(),
                    var_type: variable.var_type.clone(),
                    published: variable.published,
                    connection_ids: crossing,
                };
                match direction {
                    PortDirection::In => promoted.inputs.push(entry),
                    PortDirection::Out => promoted.outputs.push(entry),
                }
            }
        }
    }
    promoted
}
