//! The injectable state container tying the engine together.
//!
//! A [`Canvas`] owns the store, the per-document viewports, the scene index,
//! the router, the interaction controller and the execution overlay. Callers
//! mutate through it (or through [`Canvas::store_mut`]) and call
//! [`Canvas::settle`] to bring derived state back in line.

use crate::catalog::TemplateCatalog;
use crate::config::CanvasConfig;
use crate::document::{Document, DocumentSnapshot, Group, NodeVariable};
use crate::error::{DocumentError, PromotionError};
use crate::geometry::Point;
use crate::grouping::{self, DissolveReport, PromotedVariables, RepairReport};
use crate::interaction::{Commit, InteractionController};
use crate::overlay::{ExecutionMessage, ExecutionOverlay, OverlayChange};
use crate::router::{ConnectorRouter, RouteUpdate, SceneIndex};
use crate::service::{IdRemap, ServicePackage};
use crate::store::{GraphStore, StoreEvent};
use crate::transform::{Viewport, ViewportKey, ViewportRegistry};
use ahash::{AHashMap, AHashSet};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

mod builder;

pub use builder::CanvasBuilder;

/// Upper bound on journal passes per settle. Bounds updates only ever emit
/// `GroupViewChanged`, which triggers nothing, so two passes normally suffice.
const MAX_SETTLE_PASSES: usize = 8;

/// How much of the scene a settle rebuilt.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SceneRefresh {
    #[default]
    Unchanged,
    /// Only these nodes were re-laid out; every other element kept its geometry.
    Nodes(Vec<String>),
    Full,
}

/// Derived state that changed during one settle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettleReport {
    pub routes: Vec<RouteUpdate>,
    pub resized_groups: Vec<String>,
    pub promoted_changed: Vec<String>,
    pub scene: SceneRefresh,
}

impl SettleReport {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
            && self.resized_groups.is_empty()
            && self.promoted_changed.is_empty()
            && self.scene == SceneRefresh::Unchanged
    }
}

pub struct Canvas {
    store: GraphStore,
    config: CanvasConfig,
    viewports: ViewportRegistry,
    scene: SceneIndex,
    /// Viewport the scene was last fully laid out for.
    scene_viewport: Option<Viewport>,
    router: ConnectorRouter,
    controller: InteractionController,
    overlay: ExecutionOverlay,
    catalog: Option<Box<dyn TemplateCatalog>>,
    promoted: AHashMap<String, PromotedVariables>,
}

impl Canvas {
    pub fn builder(document: Document) -> CanvasBuilder {
        CanvasBuilder::new(document)
    }

    // --- Accessors ---

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Direct store access. Call [`settle`](Self::settle) after mutating.
    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewports.active()
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        self.viewports.active_mut()
    }

    pub fn scene(&self) -> &SceneIndex {
        &self.scene
    }

    pub fn router(&self) -> &ConnectorRouter {
        &self.router
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    pub fn overlay(&self) -> &ExecutionOverlay {
        &self.overlay
    }

    /// Promoted variables of a collapsed group, as of the last settle.
    pub fn promoted(&self, group_id: &str) -> Option<&PromotedVariables> {
        self.promoted.get(group_id)
    }

    // --- Documents ---

    /// Switches to another open document version, restoring its viewport.
    pub fn open_flow(&mut self, flow_id: &str, version: &str, document: Document) -> SettleReport {
        self.viewports.activate(ViewportKey::new(flow_id, version));
        self.load_document(document)
    }

    /// Replaces the whole document. Selection, pending wire and overlay state
    /// are reset.
    pub fn load_document(&mut self, document: Document) -> SettleReport {
        self.store.replace_document(document);
        self.controller.clear_selection();
        self.router = ConnectorRouter::new(self.config.slot_spacing);
        self.overlay.clear();
        self.promoted.clear();
        self.settle()
    }

    pub fn load_json(&mut self, json: &str) -> Result<SettleReport, DocumentError> {
        let document = Document::from_json(json)?;
        Ok(self.load_document(document))
    }

    pub fn save_json(&self) -> Result<String, DocumentError> {
        let json = self.store.to_document().to_json()?;
        info!(bytes = json.len(), "Document saved");
        Ok(json)
    }

    pub fn snapshot(&self, flow_id: &str, version: u64) -> Result<DocumentSnapshot, DocumentError> {
        DocumentSnapshot::capture(flow_id, version, &self.store.to_document())
    }

    pub fn restore_snapshot(&mut self, snapshot: &DocumentSnapshot) -> Result<SettleReport, DocumentError> {
        let document = snapshot.restore()?;
        Ok(self.load_document(document))
    }

    // --- Derived state ---

    /// Drains the store journal and recomputes what it invalidated: group
    /// bounds, promoted variable sets, the scene and the wire paths.
    ///
    /// Each group's bounds are recomputed at most once per settle, and the
    /// view updates that recomputation produces do not feed back into it.
    /// When only drawn nodes moved or resized and the viewport is the one the
    /// scene was laid out for, just those nodes and their wires are redone.
    pub fn settle(&mut self) -> SettleReport {
        let mut report = SettleReport::default();
        let mut refreshed: AHashSet<String> = AHashSet::new();
        let mut promotion_dirty: AHashSet<String> = AHashSet::new();
        let mut all_promotions = false;
        let mut full_layout = self.scene_viewport.as_ref() != Some(self.viewports.active());
        let mut moved: Vec<String> = Vec::new();
        let mut seen_moved: AHashSet<String> = AHashSet::new();

        for _ in 0..MAX_SETTLE_PASSES {
            let events = self.store.drain_events();
            if events.is_empty() {
                break;
            }
            let mut dirty_bounds: Vec<String> = Vec::new();
            for event in &events {
                if let Some(id) = event.moved_node() {
                    if seen_moved.insert(id.to_string()) {
                        moved.push(id.to_string());
                    }
                } else if let StoreEvent::GroupViewChanged(id) = event {
                    // Expanded groups are not drawn by the scene.
                    if self.scene.group_body(id).is_some() {
                        full_layout = true;
                    }
                } else {
                    full_layout = true;
                }
                match event {
                    StoreEvent::DocumentReplaced | StoreEvent::Overflowed => {
                        self.store.sync_group_flags();
                        dirty_bounds.extend(self.store.groups().iter().map(|g| g.id.clone()));
                        all_promotions = true;
                    }
                    StoreEvent::NodeAdded(id) | StoreEvent::NodeMoved(id) | StoreEvent::NodeResized(id) => {
                        if let Some(group_id) = self.store.group_of(id) {
                            dirty_bounds.push(group_id.to_string());
                        }
                    }
                    StoreEvent::VariableChanged { node_id, .. } => {
                        promotion_dirty.extend(
                            self.store
                                .ancestor_groups(node_id)
                                .into_iter()
                                .map(str::to_string),
                        );
                    }
                    StoreEvent::NodeRemoved(_) | StoreEvent::ConnectionsChanged => {
                        all_promotions = true;
                    }
                    StoreEvent::GroupChanged(id) => {
                        dirty_bounds.push(id.clone());
                        promotion_dirty.insert(id.clone());
                    }
                    StoreEvent::GroupRemoved(id) => {
                        if self.promoted.remove(id).is_some() {
                            report.promoted_changed.push(id.clone());
                        }
                    }
                    StoreEvent::GroupViewChanged(_) => {}
                }
            }
            for group_id in dirty_bounds {
                if refreshed.insert(group_id.clone()) {
                    let changed =
                        grouping::refresh_bounds(&mut self.store, &group_id, self.config.group_padding);
                    for id in changed {
                        if !report.resized_groups.contains(&id) {
                            report.resized_groups.push(id);
                        }
                    }
                }
            }
        }

        if all_promotions {
            promotion_dirty.extend(self.store.groups().iter().map(|g| g.id.clone()));
        }
        for group_id in promotion_dirty {
            if self.refresh_promoted(&group_id) {
                report.promoted_changed.push(group_id);
            }
        }

        if !full_layout && !moved.is_empty() {
            let viewport = self.viewports.active();
            full_layout = !moved.iter().all(|id| {
                self.scene
                    .relayout_node(&self.store, viewport, &self.config, id)
            });
        }
        if full_layout {
            self.layout_scene();
            report.routes = self.router.refresh(&self.store, &self.scene);
            report.scene = SceneRefresh::Full;
        } else if !moved.is_empty() {
            report.routes = self.router.refresh_nodes(&self.store, &self.scene, &moved);
            report.scene = SceneRefresh::Nodes(moved);
        }
        debug!(
            routes = report.routes.len(),
            resized = report.resized_groups.len(),
            full = full_layout,
            "Canvas settled"
        );
        report
    }

    fn layout_scene(&mut self) {
        let viewport = *self.viewports.active();
        self.scene = SceneIndex::layout(&self.store, &viewport, &self.config);
        self.scene_viewport = Some(viewport);
    }

    fn refresh_promoted(&mut self, group_id: &str) -> bool {
        let collapsed = self.store.group(group_id).is_some_and(|g| g.collapsed);
        if !collapsed {
            return self.promoted.remove(group_id).is_some();
        }
        let fresh = grouping::promoted_variables(&self.store, group_id);
        if self.promoted.get(group_id) == Some(&fresh) {
            return false;
        }
        self.promoted.insert(group_id.to_string(), fresh);
        true
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, screen: Point, additive: bool) -> bool {
        let hit = self.scene.hit_test(screen);
        self.controller.pointer_down(
            hit,
            screen,
            self.viewports.active(),
            &mut self.router,
            additive,
        )
    }

    pub fn pointer_move(&mut self, screen: Point) -> bool {
        self.controller
            .pointer_move(screen, self.viewports.active(), &mut self.router)
    }

    /// One animation-frame tick: applies the accumulated gesture and settles.
    pub fn animation_frame(&mut self) -> SettleReport {
        let update = self
            .controller
            .frame(&mut self.store, self.viewports.active_mut());
        if update.is_empty() && !self.store.has_pending_events() {
            return SettleReport::default();
        }
        self.settle()
    }

    pub fn pointer_up(&mut self, screen: Point) -> (Commit, SettleReport) {
        let hit = self.scene.hit_test(screen);
        let commit = self.controller.pointer_up(
            &hit,
            screen,
            &mut self.store,
            self.viewports.active_mut(),
            &mut self.router,
        );
        (commit, self.settle())
    }

    pub fn pointer_leave(&mut self) -> (Commit, SettleReport) {
        let commit = self.controller.pointer_leave(
            &mut self.store,
            self.viewports.active_mut(),
            &mut self.router,
        );
        (commit, self.settle())
    }

    /// Wheel zoom around the cursor.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) -> SettleReport {
        if !self
            .controller
            .wheel(self.viewports.active_mut(), screen, delta_y)
        {
            return SettleReport::default();
        }
        self.settle()
    }

    // --- Editing ---

    pub fn select_all(&mut self) {
        self.controller.select_all(&self.store);
    }

    pub fn delete_selection(&mut self) -> Vec<String> {
        let removed = self.controller.delete_selection(&mut self.store);
        self.settle();
        removed
    }

    /// Places a catalog template at a local position.
    pub fn add_template(&mut self, path: &str, at: Point) -> Option<String> {
        let catalog = self.catalog.as_deref()?;
        let id = self.store.instantiate_template(catalog, path, at)?;
        self.settle();
        Some(id)
    }

    pub fn create_group<S: AsRef<str>>(&mut self, node_ids: &[S], name: &str) -> Option<String> {
        let id = grouping::create_group(&mut self.store, node_ids, name, self.config.group_padding)?;
        self.settle();
        Some(id)
    }

    /// Groups the currently selected nodes.
    pub fn group_selection(&mut self, name: &str) -> Option<String> {
        let ids = self.controller.selection().nodes.clone();
        let id = self.create_group(&ids, name)?;
        self.controller.clear_selection();
        Some(id)
    }

    pub fn toggle_collapse(&mut self, group_id: &str) -> Option<bool> {
        let collapsed = grouping::toggle_collapse(&mut self.store, group_id)?;
        self.settle();
        Some(collapsed)
    }

    /// Dissolves a group once `confirm` agrees. The group is passed to the
    /// callback so it can describe what is about to be lost.
    pub fn dissolve_group<F>(&mut self, group_id: &str, confirm: F) -> Option<DissolveReport>
    where
        F: FnOnce(&Group) -> bool,
    {
        let group = self.store.group(group_id)?;
        if !confirm(group) {
            debug!(%group_id, "Dissolve declined");
            return None;
        }
        let report = grouping::dissolve_group(&mut self.store, group_id)?;
        self.settle();
        Some(report)
    }

    pub fn move_node_to_group(&mut self, node_id: &str, group_id: &str) -> bool {
        let moved =
            grouping::move_node_to_group(&mut self.store, node_id, group_id, self.config.group_padding);
        if moved {
            self.settle();
        }
        moved
    }

    pub fn remove_node_from_group(&mut self, group_id: &str, node_id: &str) -> bool {
        let removed = grouping::remove_node_from_group(
            &mut self.store,
            group_id,
            node_id,
            self.config.group_padding,
        );
        if removed {
            self.settle();
        }
        removed
    }

    /// Edits the entries of an aggregate variable with rename-aware rewiring,
    /// using the configured rename policy.
    pub fn edit_aggregate(
        &mut self,
        node_id: &str,
        handle: &str,
        entries: Vec<NodeVariable>,
    ) -> Result<RepairReport, PromotionError> {
        let report = grouping::apply_aggregate_edit(
            &mut self.store,
            node_id,
            handle,
            entries,
            self.config.rename_policy,
        )?;
        self.settle();
        Ok(report)
    }

    // --- Services ---

    pub fn package_group(&self, group_id: &str) -> Option<ServicePackage> {
        ServicePackage::extract(&self.store, group_id)
    }

    pub fn unpack_service(&mut self, package: &ServicePackage, at: Point) -> Option<IdRemap> {
        let remap = package.unpack_into(&mut self.store, at)?;
        self.settle();
        Some(remap)
    }

    // --- Execution overlay ---

    /// Subscribes the overlay to a flow's execution channel.
    pub fn subscribe_execution(&mut self, flow_id: &str) -> UnboundedSender<ExecutionMessage> {
        self.overlay.subscribe(flow_id)
    }

    /// Applies pending execution messages against the current scene.
    pub fn pump_execution(&mut self) -> Vec<OverlayChange> {
        self.overlay.pump(&self.scene)
    }
}
