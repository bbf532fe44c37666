use crate::router::SceneIndex;
use ahash::{AHashMap, AHashSet};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

mod message;

pub use message::{ExecutionEvent, ExecutionMessage, ExecutionStatus};

/// Presentation state of one rendered element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementState {
    pub executing: bool,
    pub status: Option<ExecutionStatus>,
}

/// A visual change the render layer has to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayChange {
    Started(String),
    Ended {
        element_id: String,
        status: ExecutionStatus,
    },
    Cleared,
}

/// Maps execution events onto rendered elements.
///
/// Nodes hidden inside a collapsed group are represented by that group: the
/// group glows while at least one of its hidden members is in flight and
/// stops when the last one ends. Only presentation state lives here; the
/// graph itself is never touched.
#[derive(Debug, Default)]
pub struct ExecutionOverlay {
    flow_id: Option<String>,
    elements: AHashMap<String, ElementState>,
    in_flight: AHashMap<String, AHashSet<String>>,
    worst: AHashMap<String, ExecutionStatus>,
    receiver: Option<UnboundedReceiver<ExecutionMessage>>,
}

impl ExecutionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh channel for `flow_id` and returns its sending half.
    ///
    /// Any previous subscription is dropped, so messages still sent for
    /// another flow are ignored. State is reset.
    pub fn subscribe(&mut self, flow_id: impl Into<String>) -> UnboundedSender<ExecutionMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let flow_id = flow_id.into();
        debug!(%flow_id, "Execution overlay subscribed");
        self.flow_id = Some(flow_id);
        self.receiver = Some(receiver);
        self.clear();
        sender
    }

    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    /// Applies every message already waiting on the channel, without blocking.
    pub fn pump(&mut self, scene: &SceneIndex) -> Vec<OverlayChange> {
        let mut pending = Vec::new();
        if let Some(receiver) = &mut self.receiver {
            while let Ok(message) = receiver.try_recv() {
                pending.push(message);
            }
        }
        pending
            .into_iter()
            .flat_map(|message| self.apply(&message, scene))
            .collect()
    }

    /// Parses and applies a raw message. Malformed input is logged and dropped.
    pub fn apply_json(&mut self, raw: &str, scene: &SceneIndex) -> Vec<OverlayChange> {
        match ExecutionMessage::from_json(raw) {
            Ok(message) => self.apply(&message, scene),
            Err(e) => {
                warn!(error = %e, "Dropping malformed execution message");
                Vec::new()
            }
        }
    }

    pub fn apply(&mut self, message: &ExecutionMessage, scene: &SceneIndex) -> Vec<OverlayChange> {
        trace!(node_id = %message.node_id, event = ?message.event, "Execution message");
        match message.event {
            ExecutionEvent::RunEnd => {
                self.clear();
                vec![OverlayChange::Cleared]
            }
            ExecutionEvent::StartNode => self.start(&message.node_id, scene).into_iter().collect(),
            ExecutionEvent::EndNode => {
                let status = message.status.unwrap_or(ExecutionStatus::Success);
                self.end(&message.node_id, status, scene)
            }
        }
    }

    fn start(&mut self, node_id: &str, scene: &SceneIndex) -> Option<OverlayChange> {
        if scene.node_body(node_id).is_some() {
            self.elements.insert(
                node_id.to_string(),
                ElementState {
                    executing: true,
                    status: None,
                },
            );
            return Some(OverlayChange::Started(node_id.to_string()));
        }
        let Some(group_id) = scene.visible_ancestor(node_id) else {
            debug!(%node_id, "start_node dropped: element not rendered");
            return None;
        };
        let members = self.in_flight.entry(group_id.to_string()).or_default();
        if !members.insert(node_id.to_string()) || members.len() != 1 {
            return None;
        }
        self.worst.remove(group_id);
        self.elements.insert(
            group_id.to_string(),
            ElementState {
                executing: true,
                status: None,
            },
        );
        Some(OverlayChange::Started(group_id.to_string()))
    }

    fn end(&mut self, node_id: &str, status: ExecutionStatus, scene: &SceneIndex) -> Vec<OverlayChange> {
        let mut changes = Vec::new();
        if scene.node_body(node_id).is_some() {
            self.elements.insert(
                node_id.to_string(),
                ElementState {
                    executing: false,
                    status: Some(status),
                },
            );
            changes.push(OverlayChange::Ended {
                element_id: node_id.to_string(),
                status,
            });
        }

        let mut drained = Vec::new();
        for (group_id, members) in &mut self.in_flight {
            if !members.remove(node_id) {
                continue;
            }
            let worst = self.worst.entry(group_id.clone()).or_insert(status);
            *worst = (*worst).max(status);
            if members.is_empty() {
                drained.push(group_id.clone());
            }
        }
        for group_id in drained {
            self.in_flight.remove(&group_id);
            let status = self.worst.remove(&group_id).unwrap_or(status);
            self.elements.insert(
                group_id.clone(),
                ElementState {
                    executing: false,
                    status: Some(status),
                },
            );
            changes.push(OverlayChange::Ended {
                element_id: group_id,
                status,
            });
        }

        if changes.is_empty() {
            debug!(%node_id, "end_node dropped: nothing in flight for it");
        }
        changes
    }

    /// Drops every glow, status and counter.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.in_flight.clear();
        self.worst.clear();
    }

    pub fn state(&self, element_id: &str) -> ElementState {
        self.elements.get(element_id).copied().unwrap_or_default()
    }

    pub fn is_executing(&self, element_id: &str) -> bool {
        self.state(element_id).executing
    }

    /// Number of hidden members of a group currently in flight.
    pub fn in_flight(&self, group_id: &str) -> usize {
        self.in_flight.get(group_id).map_or(0, |members| members.len())
    }
}
