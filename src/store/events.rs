/// A change recorded by the [`GraphStore`](super::GraphStore).
///
/// The store only records; the canvas drains the journal once per settle and
/// decides what has to be recomputed (group bounds, connector paths).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DocumentReplaced,
    /// The journal hit its cap without being drained; earlier events were
    /// discarded and everything derived must be recomputed.
    Overflowed,
    NodeAdded(String),
    NodeRemoved(String),
    NodeMoved(String),
    NodeResized(String),
    VariableChanged { node_id: String, handle: String },
    ConnectionsChanged,
    GroupChanged(String),
    GroupRemoved(String),
    GroupViewChanged(String),
}

impl StoreEvent {
    /// The node whose geometry changed in place (moved or resized), if the
    /// event is about one.
    pub fn moved_node(&self) -> Option<&str> {
        match self {
            StoreEvent::NodeMoved(id) | StoreEvent::NodeResized(id) => Some(id),
            _ => None,
        }
    }
}
