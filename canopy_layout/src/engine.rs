//! The layout engine: resolves `{x, y, width, height, worldX, worldY}` for
//! every node under the ABSOLUTE, AUTO_LAYOUT, and FLEX regimes.
//!
//! The engine is read-only over [`SceneGraph`] — it never mutates a node.
//! "Intrinsic" position and size, referenced throughout this module, mean
//! a node's own `localTransform.tx/ty` and `size.width/height`: the layout
//! engine's only notion of where a node currently sits before a parent's
//! flow or constraint math repositions it.
//!
//! Sizing and placement are resolved together, node by node, top-down: a
//! container estimates each flow/absolute child's contribution (via
//! [`pre_size`] or the FLEX basis rule) to run its own placement math, then
//! recurses into that child. Only after recursion does a HUG-sized node's
//! own reported width/height get overridden by its children's bounding
//! box — siblings already placed against the pre-recursion estimate keep
//! their positions, which is the same "no re-flow loop" simplification the
//! flex algorithm's min/max clamp uses.

use canopy_scene::{
    AlignSelf, AutoKeyword, CounterAlign, Direction, FlexBasis, HorizontalConstraint, LayoutMode,
    Node, NodeId, PrimaryAlign, SceneGraph, SizingMode, VerticalConstraint,
};
use indexmap::IndexMap;

use crate::types::{ComputedLayout, LayoutOptions};

/// Which axis, if any, a FILL-sized node should defer resolving because its
/// parent's own flow will set it (see `computeSize`'s FILL branch).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AxisDefer {
    None,
    Row,
    Column,
}

type Placement = (NodeId, f64, f64, f64, f64, (bool, bool));

fn clamp_dim(mut value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    if let Some(min) = min {
        value = value.max(min);
    }
    if let Some(max) = max {
        value = value.min(max);
    }
    value
}

/// Resolves a node's own `(width, height)` against an offered size, per
/// `computeSize`'s FIXED/FILL branches. HUG is reported via the returned
/// flags rather than resolved here — it needs this node's own children laid
/// out first.
fn pre_size(node: &Node, offered: (Option<f64>, Option<f64>), defer: AxisDefer) -> (f64, f64, bool, bool) {
    let intrinsic_w = node.size.width;
    let intrinsic_h = node.size.height;
    let sizing = node.layout.sizing;

    let (w, hug_w) = match sizing.horizontal {
        SizingMode::Fixed => (intrinsic_w, false),
        SizingMode::Hug => (intrinsic_w, true),
        SizingMode::Fill => {
            if defer == AxisDefer::Row {
                (intrinsic_w, false)
            } else {
                (offered.0.unwrap_or(intrinsic_w), false)
            }
        }
    };
    let (h, hug_h) = match sizing.vertical {
        SizingMode::Fixed => (intrinsic_h, false),
        SizingMode::Hug => (intrinsic_h, true),
        SizingMode::Fill => {
            if defer == AxisDefer::Column {
                (intrinsic_h, false)
            } else {
                (offered.1.unwrap_or(intrinsic_h), false)
            }
        }
    };
    (w, h, hug_w, hug_h)
}

fn effective_counter_align(align_self: AlignSelf, container: CounterAlign) -> CounterAlign {
    match align_self {
        AlignSelf::Auto => container,
        AlignSelf::Start => CounterAlign::Start,
        AlignSelf::Center => CounterAlign::Center,
        AlignSelf::End => CounterAlign::End,
        AlignSelf::Stretch => CounterAlign::Stretch,
        // No font metrics at this layer; BASELINE is the documented START fallback.
        AlignSelf::Baseline => CounterAlign::Start,
    }
}

/// Resolves one item's counter-axis position and size given the container's
/// (or line's) counter extent. `STRETCH` places at `0` with the full extent.
fn place_on_counter_axis(align: CounterAlign, item_size: f64, extent: f64) -> (f64, f64) {
    match align {
        CounterAlign::Start | CounterAlign::Baseline => (0.0, item_size),
        CounterAlign::Center => ((extent - item_size) / 2.0, item_size),
        CounterAlign::End => (extent - item_size, item_size),
        CounterAlign::Stretch => (0.0, extent),
    }
}

fn sizing_min_primary(node: &Node, direction: Direction) -> Option<f64> {
    match direction {
        Direction::Row => node.layout.sizing.min_width,
        Direction::Column => node.layout.sizing.min_height,
    }
}

fn sizing_max_primary(node: &Node, direction: Direction) -> Option<f64> {
    match direction {
        Direction::Row => node.layout.sizing.max_width,
        Direction::Column => node.layout.sizing.max_height,
    }
}

/// ABSOLUTE mode with resize constraints. `children` must already be
/// filtered to existing, visible nodes.
fn place_absolute(children: &[&Node], content: (f64, f64)) -> Vec<Placement> {
    let (cw, ch) = content;
    children
        .iter()
        .map(|child| {
            let (ix, iy) = (child.local_transform.tx, child.local_transform.ty);
            let (iw, ih) = (child.size.width, child.size.height);
            // The "original" parent size SCALE measures against is read from the current
            // content box, so SCALE is identity immediately after a layout pass.
            let w0 = cw;
            let h0 = ch;
            let r = cw - (ix + iw);
            let b = ch - (iy + ih);

            let (x, mut w) = match child.constraints.horizontal {
                HorizontalConstraint::Left => (ix, iw),
                HorizontalConstraint::Right => (cw - iw - r, iw),
                HorizontalConstraint::LeftRight => (ix, cw - ix - r),
                HorizontalConstraint::Center => ((cw - iw) / 2.0, iw),
                HorizontalConstraint::Scale => {
                    let scale = if w0 != 0.0 { cw / w0 } else { 1.0 };
                    (ix * scale, iw * scale)
                }
            };
            let (y, mut h) = match child.constraints.vertical {
                VerticalConstraint::Top => (iy, ih),
                VerticalConstraint::Bottom => (ch - ih - b, ih),
                VerticalConstraint::TopBottom => (iy, ch - iy - b),
                VerticalConstraint::Center => ((ch - ih) / 2.0, ih),
                VerticalConstraint::Scale => {
                    let scale = if h0 != 0.0 { ch / h0 } else { 1.0 };
                    (iy * scale, ih * scale)
                }
            };

            w = clamp_dim(w, child.layout.sizing.min_width, child.layout.sizing.max_width);
            h = clamp_dim(h, child.layout.sizing.min_height, child.layout.sizing.max_height);

            let hug = (
                child.layout.sizing.horizontal == SizingMode::Hug,
                child.layout.sizing.vertical == SizingMode::Hug,
            );
            // A HUG axis overrides the constraint-table result entirely once
            // this child's own children are laid out; what we emit here is
            // only the placeholder used for the recursion call.
            if hug.0 {
                w = iw;
            }
            if hug.1 {
                h = ih;
            }

            (child.id.clone(), x, y, w, h, hug)
        })
        .collect()
}

fn primary_align_start_and_gap(align: PrimaryAlign, free: f64, gap: f64, n: usize) -> (f64, f64) {
    match align {
        PrimaryAlign::Start => (0.0, gap),
        PrimaryAlign::Center => (free / 2.0, gap),
        PrimaryAlign::End => (free, gap),
        PrimaryAlign::SpaceBetween => {
            if n > 1 {
                (0.0, free / (n - 1) as f64)
            } else {
                (0.0, gap)
            }
        }
        PrimaryAlign::SpaceAround => {
            let eff_gap = free / n.max(1) as f64;
            (eff_gap / 2.0, eff_gap)
        }
        PrimaryAlign::SpaceEvenly => {
            let eff_gap = free / (n + 1) as f64;
            (eff_gap, eff_gap)
        }
    }
}

/// AUTO_LAYOUT mode. `children` must already be filtered to
/// existing, visible, non-absolute-positioned flow children.
fn place_auto_layout(
    children: &[&Node],
    content: (f64, f64),
    direction: Direction,
    gap: f64,
    primary_align: PrimaryAlign,
    counter_align: CounterAlign,
    reverse: bool,
) -> Vec<Placement> {
    let (cw, ch) = content;
    let (primary_extent, counter_extent) = match direction {
        Direction::Row => (cw, ch),
        Direction::Column => (ch, cw),
    };
    let defer = match direction {
        Direction::Row => AxisDefer::Row,
        Direction::Column => AxisDefer::Column,
    };

    let mut ordered: Vec<&Node> = children.to_vec();
    if reverse {
        ordered.reverse();
    }

    // (primary, counter, hug_primary, hug_counter) per item.
    let sizes: Vec<(f64, f64, bool, bool)> = ordered
        .iter()
        .map(|node| {
            let (w, h, hug_w, hug_h) = pre_size(node, (Some(cw), Some(ch)), defer);
            match direction {
                Direction::Row => (w, h, hug_w, hug_h),
                Direction::Column => (h, w, hug_h, hug_w),
            }
        })
        .collect();

    let n = ordered.len();
    let sum: f64 = sizes.iter().map(|(primary, ..)| primary).sum();
    let free = primary_extent - sum - gap * (n.saturating_sub(1)) as f64;
    let (start, eff_gap) = primary_align_start_and_gap(primary_align, free, gap, n);

    let mut out = Vec::with_capacity(n);
    let mut cursor = start;
    for (node, &(primary_size, counter_size, hug_primary, hug_counter)) in ordered.iter().zip(sizes.iter()) {
        let align = effective_counter_align(node.layout.flex_item.align_self, counter_align);
        let (counter_pos, counter_final) = place_on_counter_axis(align, counter_size, counter_extent);
        let (x, y, w, h, hug) = match direction {
            Direction::Row => (cursor, counter_pos, primary_size, counter_final, (hug_primary, hug_counter)),
            Direction::Column => (counter_pos, cursor, counter_final, primary_size, (hug_counter, hug_primary)),
        };
        out.push((node.id.clone(), x, y, w, h, hug));
        cursor += primary_size + eff_gap;
    }
    out
}

struct FlexItem<'n> {
    node: &'n Node,
    basis: f64,
    counter: f64,
    hug_counter: bool,
}

/// FLEX mode. `children` must already be filtered to existing,
/// visible, non-absolute-positioned flow children.
fn place_flex(
    children: &[&Node],
    content: (f64, f64),
    direction: Direction,
    gap: f64,
    row_gap: Option<f64>,
    primary_align: PrimaryAlign,
    counter_align: CounterAlign,
    wrap: bool,
    reverse: bool,
) -> Vec<Placement> {
    let (cw, ch) = content;
    let (primary_extent, counter_extent) = match direction {
        Direction::Row => (cw, ch),
        Direction::Column => (ch, cw),
    };
    let line_gap = row_gap.unwrap_or(gap);
    let defer = match direction {
        Direction::Row => AxisDefer::Row,
        Direction::Column => AxisDefer::Column,
    };

    let mut ordered: Vec<&Node> = children.to_vec();
    ordered.sort_by_key(|node| node.layout.flex_item.order);
    if reverse {
        ordered.reverse();
    }

    let items: Vec<FlexItem<'_>> = ordered
        .iter()
        .map(|&node| {
            let basis = match node.layout.flex_item.basis {
                FlexBasis::Value(v) => v,
                FlexBasis::Auto(AutoKeyword::Auto) => match direction {
                    Direction::Row => node.size.width,
                    Direction::Column => node.size.height,
                },
            };
            let (w, h, hug_w, hug_h) = pre_size(node, (Some(cw), Some(ch)), defer);
            let (counter, hug_counter) = match direction {
                Direction::Row => (h, hug_h),
                Direction::Column => (w, hug_w),
            };
            FlexItem { node, basis, counter, hug_counter }
        })
        .collect();

    // Greedy line wrapping. Never leave a line empty.
    let mut lines: Vec<Vec<usize>> = Vec::new();
    if wrap {
        let mut current: Vec<usize> = Vec::new();
        let mut current_primary = 0.0;
        for (i, item) in items.iter().enumerate() {
            let additional = if current.is_empty() { item.basis } else { gap + item.basis };
            if !current.is_empty() && current_primary + additional > primary_extent {
                lines.push(std::mem::take(&mut current));
                current_primary = 0.0;
            }
            let additional = if current.is_empty() { item.basis } else { gap + item.basis };
            current_primary += additional;
            current.push(i);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    } else {
        lines.push((0..items.len()).collect());
    }

    let mut out = Vec::with_capacity(items.len());
    let mut counter_cursor = 0.0;
    for line_indices in &lines {
        let line_items: Vec<&FlexItem<'_>> = line_indices.iter().map(|&i| &items[i]).collect();
        let n = line_items.len();

        // Per-line basis/grow/shrink resolution.
        let sum_basis: f64 = line_items.iter().map(|item| item.basis).sum();
        let free = primary_extent - sum_basis - gap * (n.saturating_sub(1)) as f64;
        let sum_grow: f64 = line_items.iter().map(|item| item.node.layout.flex_item.grow).sum();
        let sum_shrink_basis: f64 = line_items
            .iter()
            .map(|item| item.node.layout.flex_item.shrink * item.basis)
            .sum();

        let finals: Vec<f64> = line_items
            .iter()
            .map(|item| {
                let grow = item.node.layout.flex_item.grow;
                let shrink = item.node.layout.flex_item.shrink;
                let size = if free > 0.0 && sum_grow > 0.0 {
                    item.basis + free * (grow / sum_grow)
                } else if free < 0.0 && sum_shrink_basis > 0.0 {
                    (item.basis + free * (shrink * item.basis / sum_shrink_basis)).max(0.0)
                } else {
                    item.basis
                };
                clamp_dim(size, sizing_min_primary(item.node, direction), sizing_max_primary(item.node, direction))
            })
            .collect();

        // Counter-axis line extent.
        let line_counter = line_items
            .iter()
            .map(|item| {
                let align = effective_counter_align(item.node.layout.flex_item.align_self, counter_align);
                if align == CounterAlign::Stretch { counter_extent } else { item.counter }
            })
            .fold(0.0_f64, f64::max);

        // Placement along the primary axis.
        let placed_sum: f64 = finals.iter().sum();
        let free2 = primary_extent - placed_sum - gap * (n.saturating_sub(1)) as f64;
        let (start, eff_gap) = primary_align_start_and_gap(primary_align, free2, gap, n);

        let mut cursor = start;
        for (item, &final_primary) in line_items.iter().zip(finals.iter()) {
            // Placement along the counter axis within the line.
            let align = effective_counter_align(item.node.layout.flex_item.align_self, counter_align);
            let (counter_pos, counter_final) = if align == CounterAlign::Stretch {
                (0.0, line_counter)
            } else {
                place_on_counter_axis(align, item.counter, line_counter)
            };

            let (x, y, w, h, hug) = match direction {
                Direction::Row => (
                    cursor,
                    counter_cursor + counter_pos,
                    final_primary,
                    counter_final,
                    (false, item.hug_counter),
                ),
                Direction::Column => (
                    counter_cursor + counter_pos,
                    cursor,
                    counter_final,
                    final_primary,
                    (item.hug_counter, false),
                ),
            };
            out.push((item.node.id.clone(), x, y, w, h, hug));
            cursor += final_primary + eff_gap;
        }

        // Advance the counter offset between lines.
        counter_cursor += line_counter + line_gap;
    }

    out
}

struct Pass<'a> {
    scene: &'a SceneGraph,
    options: LayoutOptions,
    out: IndexMap<NodeId, ComputedLayout>,
}

impl<'a> Pass<'a> {
    fn new(scene: &'a SceneGraph, options: LayoutOptions) -> Self {
        Self { scene, options, out: IndexMap::new() }
    }

    fn run(&mut self) {
        let root_ids: Vec<NodeId> = self.scene.roots().map(|n| n.id.clone()).collect();
        for id in root_ids {
            let Some(node) = self.scene.get(&id) else { continue };
            let (w, h, hug_w, hug_h) = pre_size(
                node,
                (self.options.viewport_width, self.options.viewport_height),
                AxisDefer::None,
            );
            self.layout_one(node, (0.0, 0.0), (0.0, 0.0), (w, h), (hug_w, hug_h));
        }
        if self.options.round_to_pixels {
            for layout in self.out.values_mut() {
                layout.round_to_pixels();
            }
        }
    }

    /// Partitions `node`'s existing children into absolute / flow / invisible
    /// buckets and dispatches the flow bucket to the mode this container
    /// resolves its children under. Dangling child ids are silently skipped.
    fn dispatch_children(&self, node: &Node, content: (f64, f64)) -> Vec<Placement> {
        let mut absolute_nodes = Vec::new();
        let mut flow_nodes = Vec::new();
        let mut invisible_rows = Vec::new();

        for child_id in &node.children {
            let Some(child) = self.scene.get(child_id) else { continue };
            if !child.visible {
                invisible_rows.push((
                    child.id.clone(),
                    child.local_transform.tx,
                    child.local_transform.ty,
                    0.0,
                    0.0,
                    (false, false),
                ));
                continue;
            }
            if node.layout.mode == LayoutMode::Absolute || child.layout.absolute_position {
                absolute_nodes.push(child);
            } else {
                flow_nodes.push(child);
            }
        }

        let mut rows = place_absolute(&absolute_nodes, content);
        match node.layout.mode {
            LayoutMode::Absolute => {}
            LayoutMode::AutoLayout => rows.extend(place_auto_layout(
                &flow_nodes,
                content,
                node.layout.direction,
                node.layout.gap,
                node.layout.primary_align,
                node.layout.counter_align,
                node.layout.reverse,
            )),
            LayoutMode::Flex => rows.extend(place_flex(
                &flow_nodes,
                content,
                node.layout.direction,
                node.layout.gap,
                node.layout.row_gap,
                node.layout.primary_align,
                node.layout.counter_align,
                node.layout.wrap,
                node.layout.reverse,
            )),
        }
        rows.extend(invisible_rows);
        rows
    }

    /// Lays out `node` at `local_xy` relative to `parent_world_origin`, with
    /// `assigned_size` as the size its parent offered (pre-HUG). Returns the
    /// node's final, post-HUG, post-clamp `(width, height)`.
    fn layout_one(
        &mut self,
        node: &Node,
        local_xy: (f64, f64),
        parent_world_origin: (f64, f64),
        assigned_size: (f64, f64),
        hug: (bool, bool),
    ) -> (f64, f64) {
        let world_xy = (parent_world_origin.0 + local_xy.0, parent_world_origin.1 + local_xy.1);

        if !node.visible {
            self.out.insert(
                node.id.clone(),
                ComputedLayout {
                    x: local_xy.0,
                    y: local_xy.1,
                    width: 0.0,
                    height: 0.0,
                    world_x: world_xy.0,
                    world_y: world_xy.1,
                },
            );
            return (0.0, 0.0);
        }

        let padding = node.layout.padding;
        let content_w = (assigned_size.0 - padding.left - padding.right).max(0.0);
        let content_h = (assigned_size.1 - padding.top - padding.bottom).max(0.0);

        let placements = self.dispatch_children(node, (content_w, content_h));

        let mut max_edge_x = padding.left;
        let mut max_edge_y = padding.top;
        for (child_id, x, y, w, h, child_hug) in &placements {
            if let Some(child_node) = self.scene.get(child_id) {
                let child_xy = (x + padding.left, y + padding.top);
                let (fw, fh) = self.layout_one(child_node, child_xy, world_xy, (*w, *h), *child_hug);
                max_edge_x = max_edge_x.max(child_xy.0 + fw);
                max_edge_y = max_edge_y.max(child_xy.1 + fh);
            }
        }

        let mut final_w = if hug.0 { max_edge_x + padding.right } else { assigned_size.0 };
        let mut final_h = if hug.1 { max_edge_y + padding.bottom } else { assigned_size.1 };
        final_w = clamp_dim(final_w, node.layout.sizing.min_width, node.layout.sizing.max_width);
        final_h = clamp_dim(final_h, node.layout.sizing.min_height, node.layout.sizing.max_height);

        self.out.insert(
            node.id.clone(),
            ComputedLayout {
                x: local_xy.0,
                y: local_xy.1,
                width: final_w,
                height: final_h,
                world_x: world_xy.0,
                world_y: world_xy.1,
            },
        );

        (final_w, final_h)
    }
}

/// Resolves `{x, y, width, height, worldX, worldY}` for every node in a
/// scene graph, under each node's own container's layout mode.
///
/// Holds the most recent [`LayoutEngine::compute`] result so that
/// [`LayoutEngine::recompute_subtree`] can reuse a parent's cached world
/// origin without re-running a full pass.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    cache: IndexMap<NodeId, ComputedLayout>,
}

impl LayoutEngine {
    /// Creates an engine with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a full layout pass from every root and caches the result.
    pub fn compute(&mut self, scene: &SceneGraph, options: LayoutOptions) -> &IndexMap<NodeId, ComputedLayout> {
        let mut pass = Pass::new(scene, options);
        pass.run();
        self.cache = pass.out;
        &self.cache
    }

    /// Alias for [`LayoutEngine::compute`], matching the core API's naming.
    pub fn compute_from_scene_graph(
        &mut self,
        scene: &SceneGraph,
        options: LayoutOptions,
    ) -> &IndexMap<NodeId, ComputedLayout> {
        self.compute(scene, options)
    }

    /// Looks up a node's cached computed layout.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ComputedLayout> {
        self.cache.get(id)
    }

    /// Returns every cached computed layout.
    #[must_use]
    pub fn entries(&self) -> &IndexMap<NodeId, ComputedLayout> {
        &self.cache
    }

    /// Recomputes `root_id` and its descendants, reusing its
    /// parent's cached world origin as the base offset rather than
    /// recomputing the whole tree. Falls back to a full [`LayoutEngine::compute`]
    /// if `root_id` or its parent has no cache entry yet.
    pub fn recompute_subtree(&mut self, scene: &SceneGraph, root_id: &str, options: LayoutOptions) {
        let Some(node) = scene.get(root_id) else {
            log::warn!("layout engine: recompute_subtree on missing node {root_id}");
            return;
        };
        let Some(existing) = self.cache.get(root_id).copied() else {
            self.compute(scene, options);
            return;
        };
        let parent_world = match &node.parent_id {
            None => (0.0, 0.0),
            Some(parent_id) => match self.cache.get(parent_id) {
                Some(parent_layout) => (parent_layout.world_x, parent_layout.world_y),
                None => {
                    self.compute(scene, options);
                    return;
                }
            },
        };

        let hug = (
            node.layout.sizing.horizontal == SizingMode::Hug,
            node.layout.sizing.vertical == SizingMode::Hug,
        );

        let mut pass = Pass::new(scene, options);
        pass.out = std::mem::take(&mut self.cache);
        pass.layout_one(node, (existing.x, existing.y), parent_world, (existing.width, existing.height), hug);
        self.cache = pass.out;

        if options.round_to_pixels && let Some(layout) = self.cache.get_mut(root_id) {
            layout.round_to_pixels();
        }
    }
}
