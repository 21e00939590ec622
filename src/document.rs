//! The façade type wiring every crate in the workspace into one handle a
//! host application owns per open document.

use canopy_command::{Command, History, HistoryConfig, HistorySubscriptionId};
use canopy_hittest::{HitResult, HitTestOptions, HitTester, RectHitMode, ResolvedBox};
use canopy_layout::{ComputedLayout, LayoutEngine, LayoutOptions};
use canopy_scene::{ChangeEvent, Node, NodeId, SceneGraph, SubscriptionId};
use canopy_transform::TransformEngine;
use indexmap::IndexMap;
use kurbo::{Affine, Point, Rect, Vec2};

use crate::geometry::{self, GeometryCache, NodeGeometry};

/// A single open document: the scene graph plus every engine that reads
/// or mutates it, behind one handle.
///
/// The source this engine reimplements keeps `Geometry`/`HitTester`/
/// `History` as process-wide singletons; `Document` instead owns one of
/// each so a host can open more than one document at a time (§9's
/// "pass engine handles explicitly" guidance).
#[derive(Debug)]
pub struct Document {
    scene: SceneGraph,
    transforms: TransformEngine,
    layout: LayoutEngine,
    hit_tester: HitTester,
    history: History,
    geometry_cache: GeometryCache,
    layout_options: LayoutOptions,
    viewport_offset: Vec2,
    viewport_scale: f64,
}

impl Document {
    /// Creates an empty document with default history configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_config(HistoryConfig::default())
    }

    /// Creates an empty document, overriding the history manager's
    /// configuration (coalesce window, max history, etc).
    #[must_use]
    pub fn with_history_config(history_config: HistoryConfig) -> Self {
        Self {
            scene: SceneGraph::new(),
            transforms: TransformEngine::new(),
            layout: LayoutEngine::new(),
            hit_tester: HitTester::new(),
            history: History::new(history_config),
            geometry_cache: IndexMap::new(),
            layout_options: LayoutOptions::default(),
            viewport_offset: Vec2::ZERO,
            viewport_scale: 1.0,
        }
    }

    // --- Scene-graph read access -----------------------------------

    /// Looks up a node by id.
    #[must_use]
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.scene.get(id)
    }

    /// Iterates over every node in insertion order.
    pub fn iterate(&self) -> impl Iterator<Item = &Node> {
        self.scene.iterate()
    }

    /// Iterates over root nodes in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.scene.roots()
    }

    /// Direct read access to the underlying scene graph, for collaborators
    /// (renderers, a live-publish adapter) that need a broader view than
    /// the convenience methods above expose.
    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Registers a raw scene-graph change listener, bypassing the history
    /// manager's own [`Document::subscribe_history`]. Most callers should
    /// prefer the history subscription, which additionally reports
    /// undo/redo availability.
    pub fn subscribe_scene(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        self.scene.subscribe(listener)
    }

    // --- Document lifecycle -------------------------------------------

    /// Adds a node directly to the scene graph, bypassing the history
    /// manager. Intended for authoring a document's initial contents (or
    /// restoring a snapshot) before any user edits happen — interactive
    /// mutation should go through [`Document::execute`] instead, so it is
    /// undoable.
    pub fn add_node(&mut self, node: Node) -> bool {
        self.scene.add(node)
    }

    /// Replaces the document's scene graph wholesale (for example, when
    /// restoring a snapshot) and re-syncs transforms, layout, and the
    /// geometry cache. Does not touch the undo/redo stacks; pair with
    /// [`Document::load_history`] if history should be restored too.
    pub fn load_scene(&mut self, scene: SceneGraph) {
        self.scene = scene;
        self.sync_from_scene_graph();
    }

    // --- Mutation: every change is a command ------------------------

    /// Applies `command` to the scene graph through the history manager,
    /// then re-syncs transforms, layout, and the geometry cache. Returns
    /// `false` if the command's target(s) no longer resolve.
    pub fn execute(&mut self, command: Command) -> bool {
        let applied = self.history.execute(&mut self.scene, command);
        if applied {
            self.sync_from_scene_graph();
        }
        applied
    }

    /// Reverts the most recent undo entry and re-syncs derived state.
    pub fn undo(&mut self) -> bool {
        let applied = self.history.undo(&mut self.scene);
        if applied {
            self.sync_from_scene_graph();
        }
        applied
    }

    /// Re-applies the most recently undone entry and re-syncs derived state.
    pub fn redo(&mut self) -> bool {
        let applied = self.history.redo(&mut self.scene);
        if applied {
            self.sync_from_scene_graph();
        }
        applied
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of entries currently on the undo stack.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Begins a drag session: `initial` is applied immediately. Call
    /// [`Document::record_drag_update`] for subsequent live updates and
    /// [`Document::finalize_drag_session`] or
    /// [`Document::cancel_drag_session`] to end it.
    pub fn start_drag_session(&mut self, initial: Command) -> bool {
        let started = self.history.start_drag_session(&mut self.scene, initial);
        if started {
            self.sync_from_scene_graph();
        }
        started
    }

    /// Records a further live update within the active drag session.
    pub fn record_drag_update(&mut self, update: Command) -> bool {
        let applied = self.history.record_drag_update(&mut self.scene, update);
        if applied {
            self.sync_from_scene_graph();
        }
        applied
    }

    /// Commits the active drag session as a single undo entry.
    pub fn finalize_drag_session(&mut self) -> bool {
        self.history.finalize_drag_session()
    }

    /// Reverts the active drag session's effect entirely, without an undo entry.
    pub fn cancel_drag_session(&mut self) -> bool {
        let reverted = self.history.cancel_drag_session(&mut self.scene);
        if reverted {
            self.sync_from_scene_graph();
        }
        reverted
    }

    /// Begins a transaction grouping subsequent
    /// [`Document::record_in_transaction`] calls into one undo entry.
    pub fn begin_transaction(&mut self, description: impl Into<String>) -> bool {
        self.history.begin_transaction(description)
    }

    /// Applies `command` and buffers it in the active transaction.
    pub fn record_in_transaction(&mut self, command: Command) -> bool {
        let applied = self.history.record_in_transaction(&mut self.scene, command);
        if applied {
            self.sync_from_scene_graph();
        }
        applied
    }

    /// Commits the active transaction as a single `BATCH` undo entry.
    pub fn commit_transaction(&mut self, id: impl Into<String>, timestamp: u64) -> bool {
        self.history.commit_transaction(id, timestamp)
    }

    /// Reverts every command recorded in the active transaction and
    /// discards it without an undo entry.
    pub fn rollback_transaction(&mut self) -> bool {
        let reverted = self.history.rollback_transaction(&mut self.scene);
        if reverted {
            self.sync_from_scene_graph();
        }
        reverted
    }

    /// Registers a listener called after every history-stack-changing
    /// operation (execute, coalesce, undo, redo, clear).
    pub fn subscribe_history(
        &mut self,
        listener: impl FnMut(&canopy_command::HistoryChangeEvent) + 'static,
    ) -> HistorySubscriptionId {
        self.history.subscribe(listener)
    }

    /// Whether a host binding should wire Ctrl/Cmd+Z / Ctrl/Cmd+Shift+Z
    /// (or Ctrl/Cmd+Y) to [`Document::undo`]/[`Document::redo`].
    #[must_use]
    pub fn shortcuts_enabled(&self) -> bool {
        self.history.shortcuts_enabled()
    }

    /// Serializes the undo stack for persistence.
    #[must_use]
    pub fn save_history(&self, timestamp: u64) -> canopy_command::HistoryEnvelope {
        self.history.save(timestamp)
    }

    /// Restores undo/redo capability from a previously saved envelope.
    /// Does not replay the commands against the scene graph — the caller
    /// is responsible for having already restored the scene to match.
    pub fn load_history(&mut self, envelope: &canopy_command::HistoryEnvelope) -> bool {
        self.history.load(envelope).is_ok()
    }

    // --- Layout ------------------------------------------------------

    /// Sets the options used by [`Document::compute_layout`].
    pub fn set_layout_options(&mut self, options: LayoutOptions) {
        self.layout_options = options;
    }

    /// Runs the layout engine over the current scene graph, returning the
    /// resolved `{id -> ComputedLayout}` map. An alias for
    /// [`Document::compute_from_scene_graph`], since `Document` always
    /// owns exactly one scene graph.
    pub fn compute_layout(&mut self) -> &IndexMap<NodeId, ComputedLayout> {
        self.layout.compute(&self.scene, self.layout_options)
    }

    /// See [`Document::compute_layout`].
    pub fn compute_from_scene_graph(&mut self) -> &IndexMap<NodeId, ComputedLayout> {
        self.compute_layout()
    }

    /// The last computed layout for a single node, if any.
    #[must_use]
    pub fn get_layout(&self, id: &str) -> Option<&ComputedLayout> {
        self.layout.get(id)
    }

    /// Recomputes layout for `id` and its subtree, falling back to a full
    /// [`Document::compute_layout`] pass if `id` has no cached parent
    /// layout entry to anchor the incremental pass on.
    pub fn recompute_layout_subtree(&mut self, id: &str) {
        self.layout.recompute_subtree(&self.scene, id, self.layout_options);
    }

    /// Linearizes the scene graph into painter's-algorithm draw order.
    #[must_use]
    pub fn compute_draw_order(&self) -> Vec<ResolvedBox> {
        canopy_hittest::compute_draw_order(&self.scene, &self.transforms)
    }

    // --- Geometry service ---------------------------------------------

    /// Re-registers every node's local transform and size with the
    /// transform engine, recomputes every world transform, and rebuilds
    /// the entire geometry cache.
    ///
    /// Call this after any mutation that isn't already routed through
    /// [`Document::execute`]/[`Document::undo`]/[`Document::redo`] (those
    /// call it automatically).
    pub fn sync_from_scene_graph(&mut self) {
        for node in self.scene.iterate() {
            self.transforms.register_node(
                node.id.clone(),
                node.parent_id.as_deref(),
                node.local_transform.to_affine(),
                (node.size.width, node.size.height),
            );
        }
        self.transforms.recompute_all_world_transforms(&mut self.scene);

        self.geometry_cache.clear();
        let ids: Vec<NodeId> = self.scene.iterate().map(|n| n.id.clone()).collect();
        for id in ids {
            self.refresh_geometry_entry(&id);
        }
    }

    fn refresh_geometry_entry(&mut self, id: &str) {
        let Some(node) = self.scene.get(id) else { return };
        let world = self.transforms.get_world_transform(id).unwrap_or(Affine::IDENTITY);
        let geometry = geometry::build(world, node.size.width, node.size.height);
        self.geometry_cache.insert(id.to_owned(), geometry);
    }

    /// Updates a single node's local transform, recomputes world
    /// transforms, and refreshes only that node's geometry cache entry.
    ///
    /// This single-entry invalidation is the documented behavior even
    /// though descendants of `id` are also affected by the recompute —
    /// callers that reposition an interior node should follow up with
    /// [`Document::sync_from_scene_graph`] if descendant geometry is
    /// read afterward.
    pub fn update_node_transform(&mut self, id: &str, transform: canopy_scene::Transform) {
        let Some(node) = self.scene.get_mut(id) else { return };
        node.local_transform = transform;
        self.transforms.set_local_transform(id, transform.to_affine());
        self.transforms.recompute_all_world_transforms(&mut self.scene);
        self.refresh_geometry_entry(id);
    }

    /// The cached geometry for a single node.
    #[must_use]
    pub fn get_geometry(&self, id: &str) -> Option<&NodeGeometry> {
        self.geometry_cache.get(id)
    }

    /// The union of `ids`' world AABBs, or `None` if `ids` is empty or
    /// none resolve — used to draw a multi-selection's bounding frame.
    #[must_use]
    pub fn get_selection_frame(&self, ids: &[NodeId]) -> Option<Rect> {
        ids.iter()
            .filter_map(|id| self.geometry_cache.get(id))
            .map(|g| g.world_aabb)
            .reduce(|a, b| a.union(b))
    }

    // --- Hit-testing ---------------------------------------------------

    /// Point hit test; see [`canopy_hittest::hit_test_point`] for the
    /// exact traversal order.
    #[must_use]
    pub fn hit_test(&self, point: Point, options: &HitTestOptions) -> Vec<HitResult> {
        canopy_hittest::hit_test_point(&self.scene, &self.transforms, point, options)
    }

    /// Rectangle ("marquee") hit test.
    #[must_use]
    pub fn find_nodes_in_rect(&self, rect: Rect, mode: RectHitMode, options: &HitTestOptions) -> Vec<HitResult> {
        canopy_hittest::find_nodes_in_rect(&self.scene, &self.transforms, rect, mode, options)
    }

    /// The topmost visible, unlocked node at `point`.
    #[must_use]
    pub fn find_selectable_node(&self, point: Point) -> Option<NodeId> {
        self.hit_tester.find_selectable_node(&self.scene, &self.transforms, point)
    }

    /// The topmost `FRAME` node at `point`.
    #[must_use]
    pub fn find_container_frame(&self, point: Point) -> Option<NodeId> {
        self.hit_tester.find_container_frame(&self.scene, &self.transforms, point)
    }

    /// The topmost `FRAME` node at `point`, excluding `exclude_id`.
    #[must_use]
    pub fn find_parent_frame_for_point(&self, point: Point, exclude_id: &str) -> Option<NodeId> {
        self.hit_tester.find_parent_frame_for_point(&self.scene, &self.transforms, point, exclude_id)
    }

    /// Returns `true` if `id` is a (possibly indirect) descendant of `ancestor_id`.
    #[must_use]
    pub fn is_descendant_of(&self, id: &str, ancestor_id: &str) -> bool {
        self.scene.is_descendant_of(id, ancestor_id)
    }

    // --- Coordinate conversion ------------------------------------------

    /// Sets the current viewport offset and zoom scale used by
    /// [`Document::screen_to_world`]/[`Document::world_to_screen`].
    pub fn set_viewport(&mut self, offset: Vec2, scale: f64) {
        self.viewport_offset = offset;
        self.viewport_scale = scale;
    }

    /// Converts a screen-space point to world space under the current viewport.
    #[must_use]
    pub fn screen_to_world(&self, point: Point) -> Point {
        TransformEngine::screen_to_world(point, self.viewport_offset, self.viewport_scale)
    }

    /// Converts a world-space point to screen space under the current viewport.
    #[must_use]
    pub fn world_to_screen(&self, point: Point) -> Point {
        TransformEngine::world_to_screen(point, self.viewport_offset, self.viewport_scale)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
