use crate::document::{Connection, Document, Group, Node, PortDirection, VariableValue};
use crate::geometry::{Rect, Vector};
use ahash::{AHashMap, AHashSet};
use tracing::{debug, info, warn};

mod events;
pub mod membership;

pub use events::StoreEvent;
use membership::MembershipIndex;

/// Pending events kept before the journal collapses into a single
/// [`StoreEvent::Overflowed`].
pub const JOURNAL_LIMIT: usize = 4096;

/// The canonical in-memory model of nodes, connections and groups.
///
/// Every mutation is synchronous and immediately visible to readers. Operations
/// that name an unknown id do nothing and report it through their return value,
/// because a fast gesture may still carry a reference to something that was
/// deleted a frame earlier.
///
/// Mutations are also recorded in a journal that the owner drains with
/// [`drain_events`](GraphStore::drain_events). A store used on its own should
/// drain it now and then; past [`JOURNAL_LIMIT`] undrained events it is
/// replaced by one [`StoreEvent::Overflowed`].
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    nodes: Vec<Node>,
    node_index: AHashMap<String, usize>,
    connections: Vec<Connection>,
    groups: Vec<Group>,
    membership: MembershipIndex,
    journal: Vec<StoreEvent>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a loaded document.
    ///
    /// Connections whose endpoints are missing and duplicate group claims are
    /// dropped with a warning rather than rejected, so a slightly damaged
    /// document still opens. Group-derived connection flags are re-derived
    /// from the loaded membership and collapse state; a document saved by
    /// this store already carries them, so its round-trip is unchanged.
    pub fn from_document(document: Document) -> Self {
        let mut store = Self::new();
        store.replace_document(document);
        store
    }

    /// Replaces the whole content of the store, as a full document load does.
    pub fn replace_document(&mut self, document: Document) {
        let Document {
            nodes,
            connections,
            groups,
        } = document;

        self.nodes.clear();
        self.node_index.clear();
        for node in nodes {
            if self.node_index.contains_key(&node.id) {
                warn!(node_id = %node.id, "Dropping node with duplicate id");
                continue;
            }
            self.node_index.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
        }

        self.groups = groups
            .into_iter()
            .map(|mut group| {
                group.nodes.retain(|id| self.node_index.contains_key(id));
                group
            })
            .collect();
        let known_groups: AHashSet<String> = self.groups.iter().map(|g| g.id.clone()).collect();
        for group in &mut self.groups {
            if group.parent.as_ref().is_some_and(|p| !known_groups.contains(p)) {
                group.parent = None;
            }
        }
        for (group_id, node_id) in self.membership.rebuild(&self.groups) {
            warn!(%group_id, %node_id, "Dropping duplicate group membership");
            if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
                group.nodes.retain(|id| *id != node_id);
            }
        }

        self.connections.clear();
        for connection in connections {
            let dangling = !self.node_index.contains_key(&connection.source_node_id)
                || !self.node_index.contains_key(&connection.target_node_id);
            if dangling {
                warn!(connection_id = %connection.id, "Dropping connection with missing endpoint");
                continue;
            }
            self.connections.push(connection);
        }

        info!(
            nodes = self.nodes.len(),
            connections = self.connections.len(),
            groups = self.groups.len(),
            "Document loaded"
        );
        self.journal.clear();
        self.record(StoreEvent::DocumentReplaced);
        self.sync_group_flags();
    }

    /// Serializes the store back into the exchange shape.
    pub fn to_document(&self) -> Document {
        Document {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            groups: self.groups.clone(),
        }
    }

    // --- Read access ---

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.node_index.get(id) {
            Some(&idx) => Some(&mut self.nodes[idx]),
            None => None,
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_mut(&mut self, id: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Returns the nodes with the given ids, silently skipping unknown ones.
    pub fn get_nodes_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Node> {
        ids.iter().filter_map(|id| self.node(id.as_ref())).collect()
    }

    /// Connections whose target is `node_id`.
    pub fn find_in_connections_by_node_id(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.target_node_id == node_id)
            .collect()
    }

    /// Connections whose source is `node_id`.
    pub fn find_out_connections_by_node_id(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.source_node_id == node_id)
            .collect()
    }

    /// Connections attached to one specific port.
    pub fn connections_at_port(
        &self,
        node_id: &str,
        handle: &str,
        direction: PortDirection,
    ) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.endpoint(direction) == (node_id, handle))
            .collect()
    }

    // --- Node mutations ---

    /// Adds a node. Returns `false` if a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            debug!(node_id = %node.id, "add_node ignored: duplicate id");
            return false;
        }
        let id = node.id.clone();
        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.record(StoreEvent::NodeAdded(id));
        true
    }

    /// Removes a node together with every connection that references it, and
    /// drops it from its group's member list.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let Some(idx) = self.node_index.remove(id) else {
            debug!(node_id = %id, "remove_node ignored: unknown id");
            return None;
        };
        let node = self.nodes.remove(idx);
        for (i, n) in self.nodes.iter().enumerate().skip(idx) {
            self.node_index.insert(n.id.clone(), i);
        }

        let before = self.connections.len();
        self.connections.retain(|c| !c.touches_node(id));
        if self.connections.len() != before {
            self.record(StoreEvent::ConnectionsChanged);
        }

        if let Some(group_id) = self.membership.unassign(id) {
            if let Some(group) = self.group_mut(&group_id) {
                group.nodes.retain(|member| member != id);
            }
            self.record(StoreEvent::GroupChanged(group_id));
        }

        self.record(StoreEvent::NodeRemoved(id.to_string()));
        Some(node)
    }

    /// Moves a node by a delta in local space. Deltas, not absolute positions,
    /// so that a multi-node drag applies the same offset to every node.
    pub fn update_node_position(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        let Some(node) = self.node_mut(id) else {
            debug!(node_id = %id, "update_node_position ignored: unknown id");
            return false;
        };
        node.view.x += dx;
        node.view.y += dy;
        self.record(StoreEvent::NodeMoved(id.to_string()));
        true
    }

    /// Resizes a node by a delta, never shrinking it below `min`.
    pub fn update_node_size(&mut self, id: &str, delta: Vector, min: (f64, f64)) -> bool {
        let Some(node) = self.node_mut(id) else {
            debug!(node_id = %id, "update_node_size ignored: unknown id");
            return false;
        };
        node.view.width = (node.view.width + delta.dx).max(min.0);
        node.view.height = (node.view.height + delta.dy).max(min.1);
        self.record(StoreEvent::NodeResized(id.to_string()));
        true
    }

    /// Replaces the value of a variable (nested aggregate entries included).
    pub fn update_node_variable(&mut self, id: &str, handle: &str, value: VariableValue) -> bool {
        let Some(variable) = self.node_mut(id).and_then(|n| n.find_variable_mut(handle)) else {
            debug!(node_id = %id, %handle, "update_node_variable ignored: unknown variable");
            return false;
        };
        variable.value = value;
        self.record(StoreEvent::VariableChanged {
            node_id: id.to_string(),
            handle: handle.to_string(),
        });
        true
    }

    pub fn set_node_disabled(&mut self, id: &str, disabled: bool) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.view.disabled = disabled;
        true
    }

    pub fn set_node_collapsed(&mut self, id: &str, collapsed: bool) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.view.collapsed = collapsed;
        self.record(StoreEvent::NodeResized(id.to_string()));
        true
    }

    /// Clears the transient "adding" flag once a new node has been placed.
    pub fn finish_adding(&mut self, id: &str) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.view.adding = false;
        true
    }

    // --- Connection mutations ---

    /// Adds a connection whose endpoints both exist. Group-derived flags are
    /// computed from the current grouping state.
    pub fn add_connection(&mut self, mut connection: Connection) -> bool {
        if self.connections.iter().any(|c| c.id == connection.id) {
            debug!(connection_id = %connection.id, "add_connection ignored: duplicate id");
            return false;
        }
        if !self.contains_node(&connection.source_node_id)
            || !self.contains_node(&connection.target_node_id)
        {
            debug!(connection_id = %connection.id, "add_connection ignored: missing endpoint");
            return false;
        }
        self.apply_group_flags(&mut connection);
        self.connections.push(connection);
        self.record(StoreEvent::ConnectionsChanged);
        true
    }

    /// Removes the connections with the given ids and returns how many were removed.
    pub fn remove_connections<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let doomed: AHashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let before = self.connections.len();
        self.connections.retain(|c| !doomed.contains(c.id.as_str()));
        let removed = before - self.connections.len();
        if removed > 0 {
            self.record(StoreEvent::ConnectionsChanged);
        }
        removed
    }

    /// Re-points every connection endpoint on `(node_id, old_handle)` to `new_handle`.
    pub(crate) fn retarget_handle(&mut self, node_id: &str, old_handle: &str, new_handle: &str) -> usize {
        let mut changed = 0;
        for connection in &mut self.connections {
            if connection.source_node_id == node_id && connection.source_handle == old_handle {
                connection.source_handle = new_handle.to_string();
                changed += 1;
            }
            if connection.target_node_id == node_id && connection.target_handle == old_handle {
                connection.target_handle = new_handle.to_string();
                changed += 1;
            }
        }
        if changed > 0 {
            self.record(StoreEvent::ConnectionsChanged);
        }
        changed
    }

    // --- Group mutations ---

    /// Adds a group. Every member must exist and must not already belong to a
    /// group; the parent, if any, must exist.
    pub fn add_group(&mut self, group: Group) -> bool {
        if self.group(&group.id).is_some() {
            debug!(group_id = %group.id, "add_group ignored: duplicate id");
            return false;
        }
        let members_ok = group
            .nodes
            .iter()
            .all(|id| self.contains_node(id) && self.membership.group_of(id).is_none());
        let parent_ok = group.parent.as_deref().is_none_or(|p| self.group(p).is_some());
        if !members_ok || !parent_ok {
            debug!(group_id = %group.id, "add_group ignored: invalid members or parent");
            return false;
        }
        let id = group.id.clone();
        self.groups.push(group);
        self.membership.rebuild(&self.groups);
        self.sync_group_flags();
        self.record(StoreEvent::GroupChanged(id));
        true
    }

    /// Removes a group record. Its members and child groups are handed to the
    /// enclosing group (or become top-level); the nodes themselves stay.
    pub fn remove_group(&mut self, id: &str) -> Option<Group> {
        let Some(idx) = self.groups.iter().position(|g| g.id == id) else {
            debug!(group_id = %id, "remove_group ignored: unknown id");
            return None;
        };
        let group = self.groups.remove(idx);
        for child in self.groups.iter_mut().filter(|g| g.parent.as_deref() == Some(id)) {
            child.parent = group.parent.clone();
        }
        if let Some(parent_id) = &group.parent
            && let Some(parent) = self.group_mut(parent_id)
        {
            parent.nodes.extend(group.nodes.iter().cloned());
            self.record(StoreEvent::GroupChanged(parent_id.clone()));
        }
        self.membership.rebuild(&self.groups);
        self.sync_group_flags();
        self.record(StoreEvent::GroupRemoved(id.to_string()));
        Some(group)
    }

    /// Moves a node into `group_id`, detaching it from its previous group.
    pub fn add_member(&mut self, group_id: &str, node_id: &str) -> bool {
        if !self.contains_node(node_id) || self.group(group_id).is_none() {
            debug!(%group_id, %node_id, "add_member ignored: unknown id");
            return false;
        }
        if self.membership.group_of(node_id) == Some(group_id) {
            return false;
        }
        if let Some(previous) = self.membership.unassign(node_id) {
            if let Some(group) = self.group_mut(&previous) {
                group.nodes.retain(|m| m != node_id);
            }
            self.record(StoreEvent::GroupChanged(previous));
        }
        if let Some(group) = self.group_mut(group_id) {
            group.nodes.push(node_id.to_string());
        }
        self.membership.assign(node_id, group_id);
        self.sync_group_flags();
        self.record(StoreEvent::GroupChanged(group_id.to_string()));
        true
    }

    /// Takes a node out of whatever group holds it, without re-homing it.
    pub(crate) fn detach_node(&mut self, node_id: &str) -> Option<String> {
        let group_id = self.membership.unassign(node_id)?;
        if let Some(group) = self.group_mut(&group_id) {
            group.nodes.retain(|m| m != node_id);
        }
        self.record(StoreEvent::GroupChanged(group_id.clone()));
        Some(group_id)
    }

    /// Detaches a node from `group_id`. The node is handed to the enclosing
    /// group if there is one.
    pub fn remove_member(&mut self, group_id: &str, node_id: &str) -> bool {
        if self.membership.group_of(node_id) != Some(group_id) {
            debug!(%group_id, %node_id, "remove_member ignored: not a member");
            return false;
        }
        let parent = self.group(group_id).and_then(|g| g.parent.clone());
        if let Some(group) = self.group_mut(group_id) {
            group.nodes.retain(|m| m != node_id);
        }
        self.membership.unassign(node_id);
        if let Some(parent_id) = parent {
            if let Some(parent_group) = self.group_mut(&parent_id) {
                parent_group.nodes.push(node_id.to_string());
            }
            self.membership.assign(node_id, &parent_id);
            self.record(StoreEvent::GroupChanged(parent_id));
        }
        self.sync_group_flags();
        self.record(StoreEvent::GroupChanged(group_id.to_string()));
        true
    }

    pub fn rename_group(&mut self, id: &str, name: impl Into<String>) -> bool {
        let Some(group) = self.group_mut(id) else {
            return false;
        };
        group.name = name.into();
        self.record(StoreEvent::GroupChanged(id.to_string()));
        true
    }

    /// Sets the collapsed flag and re-derives connection aliases.
    pub fn set_group_collapsed(&mut self, id: &str, collapsed: bool) -> bool {
        let Some(group) = self.group_mut(id) else {
            debug!(group_id = %id, "set_group_collapsed ignored: unknown id");
            return false;
        };
        if group.collapsed == collapsed {
            return false;
        }
        group.collapsed = collapsed;
        self.sync_group_flags();
        self.record(StoreEvent::GroupChanged(id.to_string()));
        true
    }

    /// Writes a recomputed bounding box. Emits `GroupViewChanged` only when it moved.
    pub fn set_group_view(&mut self, id: &str, view: Rect) -> bool {
        let Some(group) = self.group_mut(id) else {
            return false;
        };
        if group.view == view {
            return false;
        }
        group.view = view;
        self.record(StoreEvent::GroupViewChanged(id.to_string()));
        true
    }

    // --- Derived lookups ---

    pub fn is_node_in_group(&self, node_id: &str) -> bool {
        self.membership.group_of(node_id).is_some()
    }

    /// Immediate group of a node.
    pub fn group_of(&self, node_id: &str) -> Option<&str> {
        self.membership.group_of(node_id)
    }

    pub fn child_groups(&self, group_id: &str) -> &[String] {
        self.membership.child_groups(group_id)
    }

    /// Groups enclosing a node, innermost first.
    pub fn ancestor_groups(&self, node_id: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.membership.group_of(node_id);
        while let Some(group_id) = current {
            if chain.contains(&group_id) || chain.len() > self.groups.len() {
                break;
            }
            chain.push(group_id);
            current = self.group(group_id).and_then(|g| g.parent.as_deref());
        }
        chain
    }

    /// Whether `node_id` lives inside `group_id` at any nesting depth.
    pub fn group_contains_node(&self, group_id: &str, node_id: &str) -> bool {
        self.ancestor_groups(node_id).contains(&group_id)
    }

    /// Every node inside a group, nested groups included.
    pub fn descendant_nodes(&self, group_id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![group_id.to_string()];
        let mut seen = AHashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(group) = self.group(&current) {
                out.extend(group.nodes.iter().cloned());
            }
            stack.extend(self.membership.child_groups(&current).iter().cloned());
        }
        out
    }

    /// The collapsed group that visually stands in for a node, if any: the
    /// outermost collapsed ancestor.
    pub fn visible_collapsed_ancestor(&self, node_id: &str) -> Option<&str> {
        self.ancestor_groups(node_id)
            .into_iter()
            .rev()
            .find(|gid| self.group(gid).is_some_and(|g| g.collapsed))
    }

    /// Whether a connection is entirely swallowed by one collapsed group.
    pub fn is_connection_concealed(&self, connection: &Connection) -> bool {
        let source = self.ancestor_groups(&connection.source_node_id);
        let target = self.ancestor_groups(&connection.target_node_id);
        source
            .iter()
            .any(|gid| target.contains(gid) && self.group(gid).is_some_and(|g| g.collapsed))
    }

    // --- Group-derived connection state ---

    fn boundary_alias(&self, node_id: &str, other_node_id: &str) -> Option<String> {
        let other = self.ancestor_groups(other_node_id);
        self.ancestor_groups(node_id)
            .into_iter()
            .rev()
            .find(|gid| !other.contains(gid) && self.group(gid).is_some_and(|g| g.collapsed))
            .map(str::to_string)
    }

    fn group_flags(&self, connection: &Connection) -> (Option<String>, Option<String>, bool) {
        let source_group = self.boundary_alias(&connection.source_node_id, &connection.target_node_id);
        let target_group = self.boundary_alias(&connection.target_node_id, &connection.source_node_id);
        let source = self.ancestor_groups(&connection.source_node_id);
        let in_group = self
            .ancestor_groups(&connection.target_node_id)
            .iter()
            .any(|gid| source.contains(gid));
        (source_group, target_group, in_group)
    }

    fn apply_group_flags(&self, connection: &mut Connection) {
        let (source_group, target_group, in_group) = self.group_flags(connection);
        connection.source_group_id = source_group;
        connection.target_group_id = target_group;
        connection.is_in_group = in_group;
    }

    /// Re-derives `sourceGroupId`, `targetGroupId` and `isInGroup` for every
    /// connection from the current membership and collapse state. The result
    /// is a pure function of that state, so collapsing and expanding again
    /// restores the exact previous endpoints.
    pub fn sync_group_flags(&mut self) {
        let flags: Vec<_> = self
            .connections
            .iter()
            .map(|c| self.group_flags(c))
            .collect();
        let mut changed = false;
        for (connection, (source_group, target_group, in_group)) in
            self.connections.iter_mut().zip(flags)
        {
            if connection.source_group_id != source_group
                || connection.target_group_id != target_group
                || connection.is_in_group != in_group
            {
                connection.source_group_id = source_group;
                connection.target_group_id = target_group;
                connection.is_in_group = in_group;
                changed = true;
            }
        }
        if changed {
            self.record(StoreEvent::ConnectionsChanged);
        }
    }

    // --- Journal ---

    fn record(&mut self, event: StoreEvent) {
        if self.journal.first() == Some(&StoreEvent::Overflowed) {
            return;
        }
        if self.journal.len() >= JOURNAL_LIMIT {
            debug!(limit = JOURNAL_LIMIT, "Store journal overflowed");
            self.journal.clear();
            self.journal.push(StoreEvent::Overflowed);
            return;
        }
        self.journal.push(event);
    }

    /// Takes every change recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.journal)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.journal.is_empty()
    }
}
