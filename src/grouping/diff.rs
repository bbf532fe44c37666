use crate::config::RenamePolicy;
use crate::document::{NodeVariable, VariableValue};
use crate::error::PromotionError;
use crate::store::GraphStore;
use ahash::AHashSet;
use itertools::Itertools;
use tracing::{info, warn};

/// How the entries of an aggregate variable changed between two edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDiff {
    /// `(old handle, new handle)` pairs recognised as renames.
    pub renamed: Vec<(String, String)>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl EntryDiff {
    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Outcome of applying an aggregate edit to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub diff: EntryDiff,
    /// Connections dropped because their handle was truly removed.
    pub dropped_connections: Vec<String>,
    /// Number of connection endpoints re-pointed to a renamed handle.
    pub retargeted_endpoints: usize,
}

/// Diffs the handle sets of two entry lists.
///
/// A handle present only in `old` is a rename when exactly one handle present
/// only in `new` carries the same `(type, has_in, has_out)` fingerprint and no
/// other removed handle claims that one. Otherwise it is a removal, unless
/// several candidates compete, which `RenamePolicy::Strict` reports as an
/// error and `RenamePolicy::FirstMatch` resolves by pairing in list order.
pub fn diff_entries(
    node_id: &str,
    old: &[NodeVariable],
    new: &[NodeVariable],
    policy: RenamePolicy,
) -> Result<EntryDiff, PromotionError> {
    let old_handles: AHashSet<&str> = old.iter().map(|v| v.handle.as_str()).collect();
    let new_handles: AHashSet<&str> = new.iter().map(|v| v.handle.as_str()).collect();
    let removed: Vec<&NodeVariable> = old
        .iter()
        .filter(|v| !new_handles.contains(v.handle.as_str()))
        .collect();
    let added: Vec<&NodeVariable> = new
        .iter()
        .filter(|v| !old_handles.contains(v.handle.as_str()))
        .collect();

    let mut diff = EntryDiff::default();
    let mut claimed: AHashSet<&str> = AHashSet::new();

    for gone in &removed {
        let candidates: Vec<&NodeVariable> = added
            .iter()
            .copied()
            .filter(|v| v.fingerprint() == gone.fingerprint())
            .filter(|v| !claimed.contains(v.handle.as_str()))
            .collect();

        let chosen = match (policy, candidates.as_slice()) {
            (_, []) => None,
            (RenamePolicy::Strict, [only]) => {
                let rivals = removed
                    .iter()
                    .filter(|r| r.fingerprint() == only.fingerprint())
                    .count();
                if rivals > 1 {
                    return Err(ambiguity(node_id, gone, &candidates));
                }
                Some(*only)
            }
            (RenamePolicy::Strict, _) => return Err(ambiguity(node_id, gone, &candidates)),
            (RenamePolicy::FirstMatch, [first, ..]) => Some(*first),
        };

        match chosen {
            Some(target) => {
                claimed.insert(target.handle.as_str());
                diff.renamed
                    .push((gone.handle.clone(), target.handle.clone()));
            }
            None => diff.removed.push(gone.handle.clone()),
        }
    }

    diff.added = added
        .iter()
        .filter(|v| !claimed.contains(v.handle.as_str()))
        .map(|v| v.handle.clone())
        .collect();
    Ok(diff)
}

fn ambiguity(node_id: &str, gone: &NodeVariable, candidates: &[&NodeVariable]) -> PromotionError {
    let candidates = candidates.iter().map(|v| v.handle.clone()).collect_vec();
    warn!(%node_id, handle = %gone.handle, ?candidates, "Ambiguous rename in aggregate edit");
    PromotionError::AmbiguousRename {
        node_id: node_id.to_string(),
        handle: gone.handle.clone(),
        candidates,
    }
}

/// Replaces the entries of the aggregate variable `handle` on `node_id` and
/// repairs the wiring: connections on truly removed entries (and anything
/// nested under them) are dropped, connections on renamed entries follow the
/// new handle, everything else is left alone.
///
/// Nothing is modified when an error is returned.
pub fn apply_aggregate_edit(
    store: &mut GraphStore,
    node_id: &str,
    handle: &str,
    entries: Vec<NodeVariable>,
    policy: RenamePolicy,
) -> Result<RepairReport, PromotionError> {
    let variable = store
        .node(node_id)
        .and_then(|n| n.find_variable(handle))
        .ok_or_else(|| PromotionError::VariableNotFound {
            node_id: node_id.to_string(),
            handle: handle.to_string(),
        })?;
    let VariableValue::Variables(old_entries) = &variable.value else {
        return Err(PromotionError::NotAggregate {
            node_id: node_id.to_string(),
            handle: handle.to_string(),
        });
    };

    let diff = diff_entries(node_id, old_entries, &entries, policy)?;

    let mut doomed_handles: AHashSet<String> = AHashSet::new();
    for gone in old_entries.iter().filter(|v| diff.removed.contains(&v.handle)) {
        doomed_handles.insert(gone.handle.clone());
        if let VariableValue::Variables(children) = &gone.value {
            collect_handles(children, &mut doomed_handles);
        }
    }

    let dropped: Vec<String> = store
        .connections()
        .iter()
        .filter(|c| {
            (c.source_node_id == node_id && doomed_handles.contains(&c.source_handle))
                || (c.target_node_id == node_id && doomed_handles.contains(&c.target_handle))
        })
        .map(|c| c.id.clone())
        .collect();
    store.remove_connections(&dropped);

    let mut retargeted = 0;
    for (from, to) in &diff.renamed {
        retargeted += store.retarget_handle(node_id, from, to);
    }

    store.update_node_variable(node_id, handle, VariableValue::Variables(entries));
    store.sync_group_flags();

    info!(
        %node_id,
        %handle,
        renamed = diff.renamed.len(),
        added = diff.added.len(),
        removed = diff.removed.len(),
        dropped = dropped.len(),
        "Aggregate variable edited"
    );
    Ok(RepairReport {
        diff,
        dropped_connections: dropped,
        retargeted_endpoints: retargeted,
    })
}

fn collect_handles(variables: &[NodeVariable], out: &mut AHashSet<String>) {
    for variable in variables {
        out.insert(variable.handle.clone());
        if let VariableValue::Variables(children) = &variable.value {
            collect_handles(children, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(handle: &str, var_type: &str, has_in: bool, has_out: bool) -> NodeVariable {
        NodeVariable::new(handle, var_type).with_ports(has_in, has_out)
    }

    fn handles(diff: &EntryDiff) -> (Vec<(&str, &str)>, Vec<&str>, Vec<&str>) {
        (
            diff.renamed
                .iter()
                .map(|(a, b)| (a.as_str(), b.as_str()))
                .collect(),
            diff.added.iter().map(String::as_str).collect(),
            diff.removed.iter().map(String::as_str).collect(),
        )
    }

    #[test]
    fn test_rename_detected_by_fingerprint() {
        let old = vec![
            entry("a", "string", true, false),
            entry("b", "string", false, false),
            entry("c", "number", false, true),
        ];
        let new = vec![
            entry("a2", "string", true, false),
            entry("b", "string", false, false),
            entry("c", "number", false, true),
        ];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap();
        assert_eq!(handles(&diff), (vec![("a", "a2")], vec![], vec![]));
    }

    #[test]
    fn test_fingerprint_mismatch_is_remove_plus_add() {
        let old = vec![entry("a", "string", true, false)];
        let new = vec![entry("a2", "number", true, false)];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap();
        assert_eq!(handles(&diff), (vec![], vec!["a2"], vec!["a"]));
    }

    #[test]
    fn test_port_flags_are_part_of_fingerprint() {
        let old = vec![entry("a", "string", true, false)];
        let new = vec![entry("a2", "string", true, true)];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap();
        assert_eq!(handles(&diff), (vec![], vec!["a2"], vec!["a"]));
    }

    #[test]
    fn test_pure_additions_and_removals() {
        let old = vec![entry("a", "string", true, false), entry("b", "number", true, false)];
        let new = vec![entry("a", "string", true, false), entry("z", "file", false, true)];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap();
        assert_eq!(handles(&diff), (vec![], vec!["z"], vec!["b"]));
    }

    #[test]
    fn test_unchanged_entries_produce_empty_diff() {
        let old = vec![entry("a", "string", true, false)];
        let diff = diff_entries("n1", &old, &old.clone(), RenamePolicy::Strict).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_reordering_is_not_a_change() {
        let old = vec![entry("a", "string", true, false), entry("b", "string", true, false)];
        let new = vec![entry("b", "string", true, false), entry("a", "string", true, false)];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_two_candidates_are_ambiguous_under_strict() {
        let old = vec![entry("a", "string", true, false)];
        let new = vec![entry("x", "string", true, false), entry("y", "string", true, false)];
        let err = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap_err();
        assert_eq!(
            err,
            PromotionError::AmbiguousRename {
                node_id: "n1".to_string(),
                handle: "a".to_string(),
                candidates: vec!["x".to_string(), "y".to_string()],
            }
        );
    }

    #[test]
    fn test_two_removed_competing_for_one_candidate_are_ambiguous() {
        let old = vec![entry("a", "string", true, false), entry("b", "string", true, false)];
        let new = vec![entry("x", "string", true, false)];
        assert!(matches!(
            diff_entries("n1", &old, &new, RenamePolicy::Strict),
            Err(PromotionError::AmbiguousRename { .. })
        ));
    }

    #[test]
    fn test_first_match_pairs_in_order() {
        let old = vec![entry("a", "string", true, false), entry("b", "string", true, false)];
        let new = vec![
            entry("x", "string", true, false),
            entry("y", "string", true, false),
            entry("z", "string", true, false),
        ];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::FirstMatch).unwrap();
        assert_eq!(
            handles(&diff),
            (vec![("a", "x"), ("b", "y")], vec!["z"], vec![])
        );
    }

    #[test]
    fn test_first_match_leftover_removed_entry_is_removal() {
        let old = vec![entry("a", "string", true, false), entry("b", "string", true, false)];
        let new = vec![entry("x", "string", true, false)];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::FirstMatch).unwrap();
        assert_eq!(handles(&diff), (vec![("a", "x")], vec![], vec!["b"]));
    }

    #[test]
    fn test_distinct_fingerprints_rename_independently() {
        let old = vec![entry("a", "string", true, false), entry("b", "number", true, false)];
        let new = vec![entry("b2", "number", true, false), entry("a2", "string", true, false)];
        let diff = diff_entries("n1", &old, &new, RenamePolicy::Strict).unwrap();
        assert_eq!(
            handles(&diff),
            (vec![("a", "a2"), ("b", "b2")], vec![], vec![])
        );
    }
}
