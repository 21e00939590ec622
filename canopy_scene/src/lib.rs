//! Canopy Scene: the scene graph data model and node store.
//!
//! This crate owns the canonical node map for a Canopy document: stable
//! string ids, parent/child consistency, and an ordered `children` list
//! that is the one and only z-order source of truth (see
//! `canopy_hittest` and the draw-order projector, which consume that
//! order directly rather than maintaining a secondary index).
//!
//! [`SceneGraph`] is intentionally narrow — it does not know about layout,
//! transforms, hit-testing, or undo. Those live in `canopy_layout`,
//! `canopy_transform`, `canopy_hittest`, and `canopy_command`
//! respectively, and are composed by the `canopy` facade crate.

mod graph;
mod types;

pub use graph::{ChangeEvent, NodePatch, SceneGraph, SubscriptionId};
pub use types::{
    AlignSelf, AutoKeyword, BlendMode, Color, Constraints, CornerRadius, CounterAlign, Direction,
    Effect, Fill, FlexBasis, FlexItem, GradientStop, HorizontalConstraint, LayoutConfig,
    LayoutMode, Node, NodeId, NodeType, Padding, Point2, PrimaryAlign, Size, Sizing, SizingMode,
    Stroke, StrokeAlign, Styles, TextAlign, TextStyle, Transform, VerticalConstraint,
};
