//! Painter's-algorithm linearization of the scene graph into a flat,
//! world-space draw list.

use canopy_geometry::decompose;
use canopy_scene::{NodeId, SceneGraph};
use canopy_transform::TransformEngine;
use kurbo::Affine;

/// A single node's world-space draw record.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBox {
    /// Source node id.
    pub id: NodeId,
    /// Source node's parent id, if any.
    pub parent_id: Option<NodeId>,
    /// World-space x position.
    pub x: f64,
    /// World-space y position.
    pub y: f64,
    /// World-space width.
    pub width: f64,
    /// World-space height.
    pub height: f64,
    /// Rotation in degrees, decomposed from the world transform.
    pub rotation_degrees: f64,
    /// Opacity, copied from the node's own style.
    pub opacity: f64,
    /// Visibility, copied from the node.
    pub visible: bool,
    /// Whether this node clips its descendants.
    pub clips_content: bool,
    /// Monotonically increasing position in draw order, starting at `0`.
    pub z_index: u64,
}

/// Walks every root in insertion order, emitting each node's resolved box
/// before recursing into its `children[]` in order, so `z_index` is a
/// direct painter's-algorithm ordering: later entries paint over earlier
/// ones.
#[must_use]
pub fn compute_draw_order(scene: &SceneGraph, transforms: &TransformEngine) -> Vec<ResolvedBox> {
    let mut out = Vec::new();
    let mut z = 0u64;
    for root in scene.roots() {
        visit(scene, transforms, &root.id, &mut z, &mut out);
    }
    out
}

fn visit(scene: &SceneGraph, transforms: &TransformEngine, id: &str, z: &mut u64, out: &mut Vec<ResolvedBox>) {
    let Some(node) = scene.get(id) else { return };
    let world = transforms.get_world_transform(id).unwrap_or(Affine::IDENTITY);
    let decomposed = decompose(world);

    out.push(ResolvedBox {
        id: node.id.clone(),
        parent_id: node.parent_id.clone(),
        x: decomposed.translation.x,
        y: decomposed.translation.y,
        width: node.size.width * decomposed.scale_x,
        height: node.size.height * decomposed.scale_y,
        rotation_degrees: decomposed.rotation.to_degrees(),
        opacity: node.styles.opacity,
        visible: node.visible,
        clips_content: node.clips_content,
        z_index: *z,
    });
    *z += 1;

    for child_id in &node.children {
        visit(scene, transforms, child_id, z, out);
    }
}
