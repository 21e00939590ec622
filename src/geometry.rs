//! The geometry cache: pre-computed per-node world bounds, transforms,
//! and display records, kept in sync with the transform engine.

use canopy_geometry::decompose;
use canopy_scene::NodeId;
use indexmap::IndexMap;
use kurbo::{Affine, Point, Rect};

/// A node's position and size as a renderer would display it: rounded
/// world-space x/y/width/height plus rotation in degrees, decomposed from
/// the world transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation_degrees: f64,
}

/// Cached per-node geometry: everything a selection overlay or renderer
/// needs without re-deriving it from the transform engine on every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeGeometry {
    pub world_aabb: Rect,
    pub world_transform: Affine,
    pub display: DisplayRect,
    pub world_corners: [Point; 4],
    pub center: Point,
}

pub(crate) fn build(world: Affine, width: f64, height: f64) -> NodeGeometry {
    let aabb = canopy_geometry::aabb_from_affine(world, width, height);
    let corners = canopy_geometry::world_corners(world, width, height);
    let decomposed = decompose(world);
    NodeGeometry {
        world_aabb: aabb,
        world_transform: world,
        display: DisplayRect {
            x: decomposed.translation.x.round(),
            y: decomposed.translation.y.round(),
            width: (width * decomposed.scale_x).round(),
            height: (height * decomposed.scale_y).round(),
            rotation_degrees: decomposed.rotation.to_degrees(),
        },
        world_corners: corners,
        center: aabb.center(),
    }
}

/// A flat id → [`NodeGeometry`] cache, rebuilt wholesale by
/// [`crate::Document::sync_from_scene_graph`] and patched single-entry by
/// [`crate::Document::update_node_transform`].
pub(crate) type GeometryCache = IndexMap<NodeId, NodeGeometry>;
