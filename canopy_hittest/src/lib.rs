//! Canopy Hit-test: depth-first point/rectangle hit testing and
//! painter's-algorithm draw-order projection over a
//! [`canopy_scene::SceneGraph`] plus [`canopy_transform::TransformEngine`].
//!
//! `children[]` order is the scene graph's sole z-order source of truth
//! (see `canopy_scene`'s crate docs): [`draw_order::compute_draw_order`]
//! walks it forward, and [`hit_test::hit_test_point`] walks it in reverse,
//! so the two are exact mirror images of each other.

mod draw_order;

pub use draw_order::{ResolvedBox, compute_draw_order};
pub use hit_test::{HitResult, HitTestOptions, HitTester, RectHitMode, find_nodes_in_rect, hit_test_point};
