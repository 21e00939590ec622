//! Canopy: a headless design-canvas engine.
//!
//! This crate is the façade over the workspace's geometry, scene-graph,
//! transform, layout, hit-test, and command/history crates — the
//! computation core behind a Figma-like editor. It owns no rendering, no
//! UI bindings, no network transport, and no on-disk format beyond the
//! plain JSON shapes its command stream and history envelope already
//! produce; those are all external collaborators.
//!
//! [`Document`] is the single entry point a host application holds per
//! open document: it wires together a [`canopy_scene::SceneGraph`], a
//! [`canopy_transform::TransformEngine`], a [`canopy_layout::LayoutEngine`],
//! a [`canopy_hittest::HitTester`], and a [`canopy_command::History`], and
//! keeps a cache of per-node display geometry in sync with all of the
//! above. Every mutation to a document's scene graph should go through a
//! [`canopy_command::Command`] dispatched to [`Document::execute`] (or one
//! of its drag-session/transaction siblings) rather than a direct
//! `SceneGraph` call, so it is automatically undoable and so the
//! geometry cache stays correct.

mod document;
mod geometry;
mod snapshot;

pub use document::Document;
pub use geometry::{DisplayRect, NodeGeometry};
pub use snapshot::{Snapshot, SnapshotNode, SnapshotPayload};

pub use canopy_command::{
    Bounds, BatchPayload, Command, CommandPayload, CommandType, CornerRadiusPatch, CreatePayload,
    DeletePayload, History, HistoryChangeEvent, HistoryChangeKind, HistoryConfig, HistoryEnvelope,
    HistoryError, HistorySubscriptionId, MovePayload, NodePosition, ReparentPayload, ResizeHandle,
    ResizePayload, StyleChangePayload, StyleChanges, TextStylePatch,
};
pub use canopy_geometry::{Axis, Decomposed, SnapGuide, SnapSettings, compose, decompose};
pub use canopy_hittest::{HitResult, HitTestOptions, HitTester, RectHitMode, ResolvedBox};
pub use canopy_layout::{ComputedLayout, LayoutEngine, LayoutOptions};
pub use canopy_scene::{
    AlignSelf, AutoKeyword, BlendMode, ChangeEvent, Color, Constraints, CornerRadius,
    CounterAlign, Direction, Effect, Fill, FlexBasis, FlexItem, GradientStop,
    HorizontalConstraint, LayoutConfig, LayoutMode, Node, NodeId, NodePatch, NodeType, Padding,
    Point2, PrimaryAlign, SceneGraph, Size, Sizing, SizingMode, Stroke, StrokeAlign, Styles,
    SubscriptionId, TextAlign, TextStyle, Transform, VerticalConstraint,
};
pub use canopy_transform::TransformEngine;
