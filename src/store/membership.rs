use crate::document::Group;
use ahash::AHashMap;

/// Reverse lookups for group membership.
///
/// `Group::nodes` stays the authoritative member list; this index mirrors it
/// (node -> immediate group) together with the group nesting (group -> child
/// groups) so that hot paths never scan every group.
#[derive(Debug, Default, Clone)]
pub struct MembershipIndex {
    node_to_group: AHashMap<String, String>,
    children: AHashMap<String, Vec<String>>,
}

impl MembershipIndex {
    /// Rebuilds the index from scratch. A node claimed by several groups is
    /// kept in the first one and the later claims are reported back.
    pub fn rebuild(&mut self, groups: &[Group]) -> Vec<(String, String)> {
        self.node_to_group.clear();
        self.children.clear();
        let mut conflicts = Vec::new();
        for group in groups {
            for member in &group.nodes {
                if self.node_to_group.contains_key(member) {
                    conflicts.push((group.id.clone(), member.clone()));
                } else {
                    self.node_to_group.insert(member.clone(), group.id.clone());
                }
            }
            if let Some(parent) = &group.parent {
                self.children
                    .entry(parent.clone())
                    .or_default()
                    .push(group.id.clone());
            }
        }
        conflicts
    }

    pub fn group_of(&self, node_id: &str) -> Option<&str> {
        self.node_to_group.get(node_id).map(String::as_str)
    }

    pub fn assign(&mut self, node_id: &str, group_id: &str) {
        self.node_to_group
            .insert(node_id.to_string(), group_id.to_string());
    }

    pub fn unassign(&mut self, node_id: &str) -> Option<String> {
        self.node_to_group.remove(node_id)
    }

    pub fn child_groups(&self, group_id: &str) -> &[String] {
        self.children
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
