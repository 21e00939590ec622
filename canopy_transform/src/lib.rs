//! Canopy Transform: world-transform propagation, bounds caching, and
//! coordinate conversion.
//!
//! [`TransformEngine`] maintains its own lightweight mirror of the scene
//! graph's parent/child topology (nodes register themselves explicitly via
//! [`TransformEngine::register_node`]) so that world-transform propagation
//! doesn't need a borrow of [`canopy_scene::SceneGraph`] while it runs. The
//! engine writes its results back into the scene graph's `world_transform`
//! field through [`canopy_scene::SceneGraph::get_mut`] — see
//! [`TransformEngine::recompute_all_world_transforms`].
//!
//! Child order within this engine's own bookkeeping does not need to match
//! the scene graph's `children` list: nothing here reads draw order, only
//! parent/child composition, so any order that respects "a parent is
//! processed before its children" during the BFS pass is correct.

use std::collections::{HashSet, VecDeque};

use canopy_geometry::{Axis, SnapGuide, SnapSettings, aabb_from_affine, snap_value, world_corners};
use canopy_scene::{NodeId, SceneGraph};
use indexmap::IndexMap;
use kurbo::{Affine, Point, Rect, Vec2};

struct Entry {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Affine,
    size: (f64, f64),
    world: Affine,
}

/// Propagates local transforms into cached world transforms, and answers
/// bounds/coordinate-conversion queries against that cache.
///
/// A node must be [registered](TransformEngine::register_node) before any
/// other method will recognize its id; every read method returns `None` for
/// an unregistered or since-removed id rather than panicking, matching the
/// engine's "stale reference" error-handling convention.
#[derive(Debug, Default)]
pub struct TransformEngine {
    entries: IndexMap<NodeId, Entry>,
    dirty: HashSet<NodeId>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl TransformEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node's topology, local transform, and size, or updates
    /// them if the id is already registered (idempotent upsert).
    ///
    /// Marks the node dirty; its world transform is stale until the next
    /// [`TransformEngine::recompute_all_world_transforms`] call.
    pub fn register_node(
        &mut self,
        id: impl Into<NodeId>,
        parent_id: Option<&str>,
        local_transform: Affine,
        size: (f64, f64),
    ) {
        let id = id.into();
        let previous_parent = self.entries.get(&id).and_then(|e| e.parent.clone());
        if previous_parent.as_deref() != parent_id {
            if let Some(old_parent) = previous_parent.as_deref()
                && let Some(old) = self.entries.get_mut(old_parent)
            {
                old.children.retain(|child| child != &id);
            }
            if let Some(new_parent) = parent_id
                && let Some(new) = self.entries.get_mut(new_parent)
                && !new.children.contains(&id)
            {
                new.children.push(id.clone());
            }
        }

        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.parent = parent_id.map(str::to_owned);
                entry.local = local_transform;
                entry.size = size;
            }
            None => {
                self.entries.insert(
                    id.clone(),
                    Entry {
                        parent: parent_id.map(str::to_owned),
                        children: Vec::new(),
                        local: local_transform,
                        size,
                        world: local_transform,
                    },
                );
            }
        }
        self.dirty.insert(id);
    }

    /// Removes a node from the engine's bookkeeping entirely. Descendants
    /// are left registered but referencing a parent id that no longer
    /// resolves, mirroring [`canopy_scene::SceneGraph::remove`].
    pub fn unregister_node(&mut self, id: &str) {
        if let Some(entry) = self.entries.shift_remove(id) {
            if let Some(parent_id) = entry.parent
                && let Some(parent) = self.entries.get_mut(&parent_id)
            {
                parent.children.retain(|child| child != id);
            }
            self.dirty.remove(id);
        }
    }

    /// Updates a node's local transform. A no-op if the id isn't registered.
    pub fn set_local_transform(&mut self, id: &str, local_transform: Affine) {
        let Some(entry) = self.entries.get_mut(id) else {
            log::warn!("transform engine: set_local_transform on unregistered node {id}");
            return;
        };
        entry.local = local_transform;
        self.dirty.insert(id.to_owned());
    }

    /// Updates a node's size. A no-op if the id isn't registered.
    pub fn set_size(&mut self, id: &str, size: (f64, f64)) {
        let Some(entry) = self.entries.get_mut(id) else {
            log::warn!("transform engine: set_size on unregistered node {id}");
            return;
        };
        entry.size = size;
        self.dirty.insert(id.to_owned());
    }

    /// Drains and returns the set of node ids touched since the last call,
    /// for collaborators (such as a geometry cache) that want to invalidate
    /// only what changed rather than resyncing everything.
    pub fn take_dirty(&mut self) -> Vec<NodeId> {
        self.dirty.drain().collect()
    }

    /// Recomputes every registered node's world transform in a single
    /// top-down pass from the roots, writing the result back into `scene`.
    ///
    /// Traversal is breadth-first: each root's world transform is its local
    /// transform, and each other node's world transform is
    /// `parent.world * node.local`. A full pass is run unconditionally
    /// (dirty tracking exists only to report invalidations downstream, per
    /// crate docs) so this method is always correct even if dirty-marking
    /// was skipped or under-reported.
    pub fn recompute_all_world_transforms(&mut self, scene: &mut SceneGraph) {
        let roots: Vec<NodeId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.parent.is_none())
            .map(|(id, _)| id.clone())
            .collect();

        let mut queue: VecDeque<NodeId> = roots.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            let parent_world = self
                .entries
                .get(&id)
                .and_then(|e| e.parent.as_deref())
                .and_then(|p| self.entries.get(p))
                .map(|p| p.world);
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            entry.world = match parent_world {
                Some(parent_world) => parent_world * entry.local,
                None => entry.local,
            };
            let world = entry.world;
            queue.extend(entry.children.iter().cloned());

            if let Some(node) = scene.get_mut(&id) {
                node.world_transform = canopy_scene::Transform::from_affine(world);
            }
        }
    }

    /// Returns a node's cached world transform, or `None` if unregistered.
    #[must_use]
    pub fn get_world_transform(&self, id: &str) -> Option<Affine> {
        self.entries.get(id).map(|e| e.world)
    }

    /// Returns a node's world-space axis-aligned bounding box.
    #[must_use]
    pub fn get_world_bounds(&self, id: &str) -> Option<Rect> {
        let entry = self.entries.get(id)?;
        Some(aabb_from_affine(entry.world, entry.size.0, entry.size.1))
    }

    /// Returns a node's four world-space corners, in the order `(0,0)`,
    /// `(w,0)`, `(w,h)`, `(0,h)`.
    #[must_use]
    pub fn get_world_corners(&self, id: &str) -> Option<[Point; 4]> {
        let entry = self.entries.get(id)?;
        Some(world_corners(entry.world, entry.size.0, entry.size.1))
    }

    /// Converts a world-space point into `id`'s local space.
    #[must_use]
    pub fn world_to_local_point(&self, id: &str, point: Point) -> Option<Point> {
        let world = self.get_world_transform(id)?;
        Some(world.inverse() * point)
    }

    /// Converts a point in `id`'s local space into world space.
    #[must_use]
    pub fn local_to_world_point(&self, id: &str, point: Point) -> Option<Point> {
        let world = self.get_world_transform(id)?;
        Some(world * point)
    }

    /// Converts a screen-space point to world space, given the current
    /// viewport offset and uniform zoom scale.
    #[must_use]
    pub fn screen_to_world(point: Point, viewport_offset: Vec2, viewport_scale: f64) -> Point {
        Point::new(
            (point.x - viewport_offset.x) / viewport_scale,
            (point.y - viewport_offset.y) / viewport_scale,
        )
    }

    /// Converts a world-space point to screen space, the inverse of
    /// [`TransformEngine::screen_to_world`].
    #[must_use]
    pub fn world_to_screen(point: Point, viewport_offset: Vec2, viewport_scale: f64) -> Point {
        Point::new(
            point.x * viewport_scale + viewport_offset.x,
            point.y * viewport_scale + viewport_offset.y,
        )
    }

    /// Snaps a single world-space point against every other registered
    /// node's bounds (excluding `exclude_ids`) and, if configured, a grid.
    #[must_use]
    pub fn snap(
        &self,
        point: Point,
        exclude_ids: &[NodeId],
        settings: SnapSettings,
    ) -> (Point, Vec<SnapGuide>) {
        let (xs, ys) = self.peer_edges(exclude_ids);
        let (x, guide_x) = snap_value(point.x, &xs, Axis::Vertical, settings);
        let (y, guide_y) = snap_value(point.y, &ys, Axis::Horizontal, settings);
        let guides = [guide_x, guide_y].into_iter().flatten().collect();
        (Point::new(x, y), guides)
    }

    /// Snaps each edge of `bounds` independently against peer edges and, if
    /// configured, a grid. Each of the four edges may be pulled onto a
    /// different guide; width/height are recomputed from the snapped edges.
    #[must_use]
    pub fn snap_bounds(
        &self,
        bounds: Rect,
        exclude_ids: &[NodeId],
        settings: SnapSettings,
    ) -> (Rect, Vec<SnapGuide>) {
        let (xs, ys) = self.peer_edges(exclude_ids);
        let (x0, g0) = snap_value(bounds.x0, &xs, Axis::Vertical, settings);
        let (x1, g1) = snap_value(bounds.x1, &xs, Axis::Vertical, settings);
        let (y0, g2) = snap_value(bounds.y0, &ys, Axis::Horizontal, settings);
        let (y1, g3) = snap_value(bounds.y1, &ys, Axis::Horizontal, settings);
        let guides = [g0, g1, g2, g3].into_iter().flatten().collect();
        (Rect::new(x0, y0, x1, y1), guides)
    }

    fn peer_edges(&self, exclude_ids: &[NodeId]) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (id, entry) in &self.entries {
            if exclude_ids.iter().any(|excluded| excluded == id) {
                continue;
            }
            let bounds = aabb_from_affine(entry.world, entry.size.0, entry.size.1);
            xs.push(bounds.x0);
            xs.push(bounds.x1);
            ys.push(bounds.y0);
            ys.push(bounds.y1);
        }
        (xs, ys)
    }
}
