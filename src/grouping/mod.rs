//! Group lifecycle on top of the [`GraphStore`]: creation from a selection,
//! collapse toggling, dissolve, membership moves and bounding-box upkeep.
//!
//! Promotion of member variables onto a collapsed group's boundary lives in
//! [`promotion`]; the rename-aware repair of aggregate variables in [`diff`].

use crate::document::{Connection, Group};
use crate::geometry::{Rect, Vector};
use crate::ids;
use crate::store::GraphStore;
use ahash::AHashSet;
use tracing::{debug, info};

pub mod diff;
pub mod promotion;

pub use diff::{EntryDiff, RepairReport, apply_aggregate_edit, diff_entries};
pub use promotion::{PromotedVariable, PromotedVariables, promoted_variables};

/// What a dissolve removed.
#[derive(Debug, Clone, PartialEq)]
pub struct DissolveReport {
    pub group: Group,
    pub dropped_connections: Vec<String>,
}

/// Turns a node selection into a new group and returns its id.
///
/// Unknown ids are skipped; an empty selection creates nothing. When every
/// selected node shares the same enclosing group, the new group is nested in
/// it, otherwise it is created at the top level.
pub fn create_group<S: AsRef<str>>(
    store: &mut GraphStore,
    node_ids: &[S],
    name: &str,
    padding: f64,
) -> Option<String> {
    let mut members: Vec<String> = Vec::new();
    for id in node_ids.iter().map(AsRef::as_ref) {
        if store.contains_node(id) && !members.iter().any(|m| m == id) {
            members.push(id.to_string());
        }
    }
    if members.is_empty() {
        debug!("create_group ignored: empty selection");
        return None;
    }

    let previous: AHashSet<Option<&str>> = members.iter().map(|id| store.group_of(id)).collect();
    let parent = match previous.into_iter().collect::<Vec<_>>().as_slice() {
        [Some(shared)] => Some(shared.to_string()),
        _ => None,
    };
    let view = Rect::bounding(
        store
            .get_nodes_by_ids(&members)
            .into_iter()
            .map(|n| n.rect())
            .collect::<Vec<_>>()
            .iter(),
    )
    .map(|r| r.inflate(padding))
    .unwrap_or_default();

    for id in &members {
        store.detach_node(id);
    }

    let group = Group {
        id: ids::generate("group"),
        name: name.to_string(),
        nodes: members,
        parent: parent.clone(),
        view,
        collapsed: false,
    };
    let id = group.id.clone();
    let count = group.nodes.len();
    if !store.add_group(group) {
        return None;
    }
    if let Some(parent_id) = &parent {
        refresh_bounds(store, parent_id, padding);
    }
    info!(group_id = %id, members = count, "Group created");
    Some(id)
}

/// Flips the collapsed flag and returns the new state.
pub fn toggle_collapse(store: &mut GraphStore, group_id: &str) -> Option<bool> {
    let collapsed = !store.group(group_id)?.collapsed;
    store.set_group_collapsed(group_id, collapsed);
    debug!(%group_id, collapsed, "Group collapse toggled");
    Some(collapsed)
}

/// Connections with exactly one endpoint inside the group (nested groups
/// included), plus any still aliased to it.
pub fn boundary_connections<'a>(store: &'a GraphStore, group_id: &str) -> Vec<&'a Connection> {
    let members: AHashSet<String> = store.descendant_nodes(group_id).into_iter().collect();
    store
        .connections()
        .iter()
        .filter(|c| {
            let source_in = members.contains(&c.source_node_id);
            let target_in = members.contains(&c.target_node_id);
            source_in != target_in || c.touches_group(group_id)
        })
        .collect()
}

/// Ungroups: drops every connection crossing the group boundary and deletes
/// the group record. Member nodes stay where they are.
///
/// Irreversible, so callers gate it behind a confirmation.
pub fn dissolve_group(store: &mut GraphStore, group_id: &str) -> Option<DissolveReport> {
    if store.group(group_id).is_none() {
        debug!(%group_id, "dissolve_group ignored: unknown id");
        return None;
    }
    let dropped: Vec<String> = boundary_connections(store, group_id)
        .into_iter()
        .map(|c| c.id.clone())
        .collect();
    store.remove_connections(&dropped);
    let group = store.remove_group(group_id)?;
    info!(%group_id, dropped = dropped.len(), "Group dissolved");
    Some(DissolveReport {
        group,
        dropped_connections: dropped,
    })
}

/// Moves a node into a group and refreshes the bounds of both the old and
/// the new group.
pub fn move_node_to_group(
    store: &mut GraphStore,
    node_id: &str,
    group_id: &str,
    padding: f64,
) -> bool {
    let previous = store.group_of(node_id).map(str::to_string);
    if !store.add_member(group_id, node_id) {
        return false;
    }
    if let Some(previous) = previous {
        refresh_bounds(store, &previous, padding);
    }
    refresh_bounds(store, group_id, padding);
    true
}

/// Takes a node out of a group (handing it to the enclosing group, if any)
/// and refreshes the bounds.
pub fn remove_node_from_group(
    store: &mut GraphStore,
    group_id: &str,
    node_id: &str,
    padding: f64,
) -> bool {
    if !store.remove_member(group_id, node_id) {
        return false;
    }
    refresh_bounds(store, group_id, padding);
    true
}

/// Union of the member views and nested group views, padded.
///
/// `None` for an unknown or empty group.
pub fn compute_bounds(store: &GraphStore, group_id: &str, padding: f64) -> Option<Rect> {
    let group = store.group(group_id)?;
    let mut rects: Vec<Rect> = store
        .get_nodes_by_ids(&group.nodes)
        .into_iter()
        .map(|n| n.rect())
        .collect();
    rects.extend(
        store
            .child_groups(group_id)
            .iter()
            .filter_map(|child| store.group(child))
            .map(|child| child.view),
    );
    Rect::bounding(rects.iter()).map(|r| r.inflate(padding))
}

/// Recomputes the bounds of a group and then of each enclosing group.
/// Returns the ids whose view actually changed.
pub fn refresh_bounds(store: &mut GraphStore, group_id: &str, padding: f64) -> Vec<String> {
    let mut changed = Vec::new();
    let mut visited = AHashSet::new();
    let mut current = Some(group_id.to_string());
    while let Some(id) = current {
        if !visited.insert(id.clone()) {
            break;
        }
        if let Some(bounds) = compute_bounds(store, &id, padding)
            && store.set_group_view(&id, bounds)
        {
            changed.push(id.clone());
        }
        current = store.group(&id).and_then(|g| g.parent.clone());
    }
    changed
}

/// Drags a whole group: every member node (nested ones included) moves by
/// the same local delta.
pub fn move_group(store: &mut GraphStore, group_id: &str, delta: Vector, padding: f64) -> bool {
    if store.group(group_id).is_none() || delta.is_zero() {
        return false;
    }
    for node_id in store.descendant_nodes(group_id) {
        store.update_node_position(&node_id, delta.dx, delta.dy);
    }
    let nested: Vec<String> = nested_groups(store, group_id);
    for id in nested.iter().rev() {
        if let Some(bounds) = compute_bounds(store, id, padding) {
            store.set_group_view(id, bounds);
        }
    }
    refresh_bounds(store, group_id, padding);
    true
}

/// Groups nested under `group_id`, parents before children.
fn nested_groups(store: &GraphStore, group_id: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut queue = vec![group_id.to_string()];
    let mut seen = AHashSet::new();
    while let Some(id) = queue.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        for child in store.child_groups(&id) {
            out.push(child.clone());
            queue.push(child.clone());
        }
    }
    out
}
