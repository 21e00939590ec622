//! Node record and the value types nested inside it: transforms, layout
//! configuration, constraints, and styles.

use kurbo::Affine;
use serde::{Deserialize, Serialize};

/// Stable identifier for a node. Nodes are addressed by this id rather than
/// by reference, so parent/child relationships are always a map lookup —
/// see the crate-level docs for why this sidesteps cyclic-ownership
/// concerns entirely.
pub type NodeId = String;

/// A 2-D affine transform, stored as the six coefficients `[a, b, c, d, tx,
/// ty]` the spec's data model and wire format use.
///
/// Composition is standard matrix multiplication; [`Transform::to_affine`]
/// and [`Transform::from_affine`] convert to/from `kurbo::Affine`, which
/// Canopy's geometry and transform engine use for the actual arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Linear part, row 1 column 1.
    pub a: f64,
    /// Linear part, row 1 column 2.
    pub b: f64,
    /// Linear part, row 2 column 1.
    pub c: f64,
    /// Linear part, row 2 column 2.
    pub d: f64,
    /// Translation along x.
    pub tx: f64,
    /// Translation along y.
    pub ty: f64,
}

impl Transform {
    /// The identity transform `[1, 0, 0, 1, 0, 0]`.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Builds a pure-translation transform.
    #[must_use]
    pub fn from_translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    /// Converts to `kurbo::Affine` for use with the geometry/transform crates.
    #[must_use]
    pub fn to_affine(self) -> Affine {
        Affine::new([self.a, self.b, self.c, self.d, self.tx, self.ty])
    }

    /// Converts from `kurbo::Affine`.
    #[must_use]
    pub fn from_affine(m: Affine) -> Self {
        let [a, b, c, d, tx, ty] = m.as_coeffs();
        Self { a, b, c, d, tx, ty }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An intrinsic width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in local units.
    pub width: f64,
    /// Height in local units.
    pub height: f64,
}

impl Size {
    /// The zero size.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };
}

/// Inset padding on each side of a container's content box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Padding {
    /// Inset from the top edge.
    pub top: f64,
    /// Inset from the right edge.
    pub right: f64,
    /// Inset from the bottom edge.
    pub bottom: f64,
    /// Inset from the left edge.
    pub left: f64,
}

/// The four node kinds the engine understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// A top-level or nested frame; typically a layout container.
    Frame,
    /// A non-visual grouping of children with no layout participation of its own.
    Group,
    /// A vector or primitive shape.
    Shape,
    /// A text node.
    Text,
}

/// Which of the three layout regimes a container resolves its children under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    /// Constraint-based placement relative to the parent's content box.
    #[default]
    Absolute,
    /// Figma-style row/column flow layout.
    AutoLayout,
    /// CSS-flexbox-parity row/column flow layout.
    Flex,
}

/// The axis a flow container lays its children out along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Children flow left to right; primary axis is width.
    #[default]
    Row,
    /// Children flow top to bottom; primary axis is height.
    Column,
}

/// Primary-axis alignment for a flow container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryAlign {
    /// Pack children at the start of the primary axis.
    #[default]
    Start,
    /// Center children as a group on the primary axis.
    Center,
    /// Pack children at the end of the primary axis.
    End,
    /// Distribute free space between children, none at the ends.
    SpaceBetween,
    /// Distribute free space around each child equally.
    SpaceAround,
    /// Distribute free space evenly, including before the first and after the last child.
    SpaceEvenly,
}

/// Counter-axis alignment for a flow container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterAlign {
    /// Align children to the start of the counter axis.
    #[default]
    Start,
    /// Center children on the counter axis.
    Center,
    /// Align children to the end of the counter axis.
    End,
    /// Stretch children to fill the counter axis.
    Stretch,
    /// Align to the first line's baseline. Falls back to `Start` — see crate docs.
    Baseline,
}

/// Per-child override of the container's counter-axis alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignSelf {
    /// Defer to the container's counter-axis alignment.
    #[default]
    Auto,
    /// Align to the start of the counter axis.
    Start,
    /// Center on the counter axis.
    Center,
    /// Align to the end of the counter axis.
    End,
    /// Stretch to fill the counter axis.
    Stretch,
    /// Align to the first line's baseline. Falls back to `Start` — see crate docs.
    Baseline,
}

/// A sizing mode for one axis of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingMode {
    /// Use the node's intrinsic size as authored.
    #[default]
    Fixed,
    /// Size to the bounding box of laid-out children plus padding.
    Hug,
    /// Adopt the size offered by the parent container.
    Fill,
}

/// Horizontal and vertical sizing modes plus optional clamp bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sizing {
    /// Horizontal sizing mode.
    pub horizontal: SizingMode,
    /// Vertical sizing mode.
    pub vertical: SizingMode,
    /// Minimum width clamp, applied after resolution.
    pub min_width: Option<f64>,
    /// Maximum width clamp, applied after resolution.
    pub max_width: Option<f64>,
    /// Minimum height clamp, applied after resolution.
    pub min_height: Option<f64>,
    /// Maximum height clamp, applied after resolution.
    pub max_height: Option<f64>,
}

/// A flex item's primary-axis basis: either an explicit number or `AUTO`,
/// meaning "use the item's intrinsic primary-axis size".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlexBasis {
    /// An explicit basis value in local units.
    Value(f64),
    /// Defer to the item's intrinsic primary-axis size.
    Auto(AutoKeyword),
}

impl Default for FlexBasis {
    fn default() -> Self {
        Self::Auto(AutoKeyword::Auto)
    }
}

/// Marker type serialized as the literal string `"AUTO"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoKeyword {
    /// The only value of this type.
    #[serde(rename = "AUTO")]
    Auto,
}

/// Flex-item-specific layout participation, meaningful only when the parent
/// container's `layout.mode` is [`LayoutMode::Flex`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexItem {
    /// Positive free-space distribution weight.
    pub grow: f64,
    /// Negative free-space (shrink) distribution weight.
    pub shrink: f64,
    /// Starting primary-axis size before grow/shrink distribution.
    pub basis: FlexBasis,
    /// Per-item override of the container's counter-axis alignment.
    pub align_self: AlignSelf,
    /// Stable sort key applied before layout (ties broken by original order).
    pub order: i32,
}

impl Default for FlexItem {
    fn default() -> Self {
        Self {
            grow: 0.0,
            shrink: 1.0,
            basis: FlexBasis::default(),
            align_self: AlignSelf::default(),
            order: 0,
        }
    }
}

/// Layout configuration for a node: both how it lays out its own children
/// and how it participates in its parent's layout.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Which layout regime this node's children are resolved under.
    pub mode: LayoutMode,
    /// Flow direction for `AUTO_LAYOUT` and `FLEX` containers.
    pub direction: Direction,
    /// Gap between children along the primary axis.
    pub gap: f64,
    /// Gap between wrapped lines; defaults to `gap` when unset.
    pub row_gap: Option<f64>,
    /// Inset applied to derive this node's content box.
    pub padding: Padding,
    /// Primary-axis alignment of this node's own flow children.
    pub primary_align: PrimaryAlign,
    /// Counter-axis alignment of this node's own flow children.
    pub counter_align: CounterAlign,
    /// Whether flex children may wrap onto additional lines.
    pub wrap: bool,
    /// Whether flow children are placed in reverse order.
    pub reverse: bool,
    /// This node's own sizing behavior within its parent.
    pub sizing: Sizing,
    /// If set, this node bypasses its parent's flow and is placed with
    /// `ABSOLUTE` semantics even inside an `AUTO_LAYOUT`/`FLEX` parent.
    pub absolute_position: bool,
    /// This node's participation as a flex item of its parent, when the
    /// parent's mode is `FLEX`.
    pub flex_item: FlexItem,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mode: LayoutMode::default(),
            direction: Direction::default(),
            gap: 0.0,
            row_gap: None,
            padding: Padding::default(),
            primary_align: PrimaryAlign::default(),
            counter_align: CounterAlign::default(),
            wrap: false,
            reverse: false,
            sizing: Sizing::default(),
            absolute_position: false,
            flex_item: FlexItem::default(),
        }
    }
}

/// Horizontal resize constraint, used only in `ABSOLUTE` layout on parent resize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HorizontalConstraint {
    /// Keep a fixed distance from the left edge.
    #[default]
    Left,
    /// Keep a fixed distance from the right edge.
    Right,
    /// Keep fixed distances from both edges, growing/shrinking the node.
    LeftRight,
    /// Keep centered horizontally.
    Center,
    /// Scale position and width proportionally to the parent's width.
    Scale,
}

/// Vertical resize constraint, the mirror of [`HorizontalConstraint`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerticalConstraint {
    /// Keep a fixed distance from the top edge.
    #[default]
    Top,
    /// Keep a fixed distance from the bottom edge.
    Bottom,
    /// Keep fixed distances from both edges, growing/shrinking the node.
    TopBottom,
    /// Keep centered vertically.
    Center,
    /// Scale position and height proportionally to the parent's height.
    Scale,
}

/// Resize constraints used only by `ABSOLUTE` layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Horizontal constraint.
    pub horizontal: HorizontalConstraint,
    /// Vertical constraint.
    pub vertical: VerticalConstraint,
}

/// An RGBA color with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
    /// Alpha channel.
    pub a: f64,
}

impl Color {
    /// Opaque black, the fallback color for newly created fills.
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
}

/// A gradient color stop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient, in `[0, 1]`.
    pub position: f64,
    /// Color at this stop.
    pub color: Color,
}

/// A 2-D point, used by gradient fills to describe direction and extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// A single fill layer. Fills are painted in list order, earlier entries
/// behind later ones, matching the painter's-algorithm convention used for
/// z-order elsewhere in the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fill {
    /// A flat color fill.
    Solid {
        /// Fill color.
        color: Color,
    },
    /// A linear gradient from `start` to `end`.
    LinearGradient {
        /// Ordered color stops.
        stops: Vec<GradientStop>,
        /// Gradient start point, in local space.
        start: Point2,
        /// Gradient end point, in local space.
        end: Point2,
    },
    /// A radial gradient centered at `center`.
    RadialGradient {
        /// Ordered color stops.
        stops: Vec<GradientStop>,
        /// Gradient center, in local space.
        center: Point2,
        /// Gradient radius, in local units.
        radius: f64,
    },
    /// An image fill, referencing image data external to the core.
    Image {
        /// Opaque reference to the image; resolved by an external collaborator.
        src: String,
        /// Fill opacity, independent of the node's own opacity.
        opacity: f64,
    },
}

impl Default for Fill {
    fn default() -> Self {
        Self::Solid {
            color: Color::BLACK,
        }
    }
}

/// Stroke alignment relative to the path it strokes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrokeAlign {
    /// Centered on the path.
    #[default]
    Center,
    /// Entirely inside the path.
    Inside,
    /// Entirely outside the path.
    Outside,
}

/// A single stroke layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Stroke width.
    pub weight: f64,
    /// Alignment relative to the stroked path.
    pub align: StrokeAlign,
    /// Dash pattern; empty means a solid line.
    pub dash: Vec<f64>,
    /// Stroke paint.
    pub fill: Fill,
}

/// Per-corner radius.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerRadius {
    /// Top-left corner radius.
    pub top_left: f64,
    /// Top-right corner radius.
    pub top_right: f64,
    /// Bottom-right corner radius.
    pub bottom_right: f64,
    /// Bottom-left corner radius.
    pub bottom_left: f64,
}

/// A single visual effect layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    /// A shadow cast behind the node.
    DropShadow {
        /// Shadow color.
        color: Color,
        /// Offset from the node's own position.
        offset: Point2,
        /// Gaussian blur radius.
        blur: f64,
        /// Amount the shadow shape grows before blurring.
        spread: f64,
    },
    /// A shadow cast inside the node's bounds.
    InnerShadow {
        /// Shadow color.
        color: Color,
        /// Offset from the node's own position.
        offset: Point2,
        /// Gaussian blur radius.
        blur: f64,
        /// Amount the shadow shape grows before blurring.
        spread: f64,
    },
    /// A Gaussian blur applied to the node's own content.
    LayerBlur {
        /// Blur radius.
        radius: f64,
    },
    /// A Gaussian blur applied to whatever is behind the node.
    BackgroundBlur {
        /// Blur radius.
        radius: f64,
    },
}

/// Blend mode applied when compositing a node over its backdrop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    /// Normal alpha compositing.
    #[default]
    Normal,
    /// Multiply blend.
    Multiply,
    /// Screen blend.
    Screen,
    /// Overlay blend.
    Overlay,
    /// Darken blend.
    Darken,
    /// Lighten blend.
    Lighten,
    /// Color dodge blend.
    ColorDodge,
    /// Color burn blend.
    ColorBurn,
    /// Hard light blend.
    HardLight,
    /// Soft light blend.
    SoftLight,
    /// Difference blend.
    Difference,
    /// Exclusion blend.
    Exclusion,
    /// Hue blend.
    Hue,
    /// Saturation blend.
    Saturation,
    /// Color blend.
    Color,
    /// Luminosity blend.
    Luminosity,
}

/// Text alignment within a `TEXT` node's box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlign {
    /// Left-aligned text.
    #[default]
    Left,
    /// Centered text.
    Center,
    /// Right-aligned text.
    Right,
    /// Justified text.
    Justify,
}

/// Text-specific style, present only on `TEXT` nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Font family name.
    pub font_family: String,
    /// Font size in local units.
    pub font_size: f64,
    /// Font weight, CSS-style (400 = regular, 700 = bold).
    pub font_weight: u16,
    /// Line height override; `None` uses the font's natural metrics.
    pub line_height: Option<f64>,
    /// Additional spacing between letters.
    pub letter_spacing: f64,
    /// Paragraph alignment.
    pub text_align: TextAlign,
    /// Text color.
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Inter".to_owned(),
            font_size: 16.0,
            font_weight: 400,
            line_height: None,
            letter_spacing: 0.0,
            text_align: TextAlign::default(),
            color: Color::BLACK,
        }
    }
}

/// The full paint/appearance record for a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styles {
    /// Ordered fill layers, earliest painted first.
    pub fills: Vec<Fill>,
    /// Ordered stroke layers, earliest painted first.
    pub strokes: Vec<Stroke>,
    /// Per-corner radius.
    pub corner_radius: CornerRadius,
    /// Ordered effect layers.
    pub effects: Vec<Effect>,
    /// Overall opacity in `[0, 1]`.
    pub opacity: f64,
    /// Blend mode against the backdrop.
    pub blend_mode: BlendMode,
    /// Text sub-style, meaningful only for `TEXT` nodes.
    pub text: Option<TextStyle>,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            fills: Vec::new(),
            strokes: Vec::new(),
            corner_radius: CornerRadius::default(),
            effects: Vec::new(),
            opacity: 1.0,
            blend_mode: BlendMode::default(),
            text: None,
        }
    }
}

/// A node in the scene graph.
///
/// See the crate-level docs for the invariants the [`crate::SceneGraph`]
/// store maintains over collections of `Node`s (parent/child consistency,
/// root discovery order, and so on).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable id, unique within a [`crate::SceneGraph`].
    pub id: NodeId,
    /// Parent id, or `None` for a root.
    pub parent_id: Option<NodeId>,
    /// Ordered child ids; this ordering is the sole source of truth for
    /// paint and hit-test z-order.
    pub children: Vec<NodeId>,
    /// Display name.
    pub name: String,
    /// Node kind.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Local affine transform relative to the parent.
    pub local_transform: Transform,
    /// Cached world affine transform. Maintained by the transform engine;
    /// do not set directly unless restoring a serialized snapshot.
    pub world_transform: Transform,
    /// Intrinsic size.
    pub size: Size,
    /// Layout participation and container configuration.
    pub layout: LayoutConfig,
    /// Resize constraints, used only in `ABSOLUTE` layout.
    pub constraints: Constraints,
    /// Paint/appearance record.
    pub styles: Styles,
    /// Whether the node is visible (rendered, hit-testable, and laid out
    /// with non-zero size).
    pub visible: bool,
    /// Whether the node is locked against interactive mutation.
    pub locked: bool,
    /// Whether this node clips its descendants' content to its bounds.
    pub clips_content: bool,
    /// Text content, meaningful only for `TEXT` nodes.
    pub text_content: Option<String>,
}

impl Node {
    /// Creates a new node with the given id, name, and kind, and otherwise
    /// default geometry/style/layout state.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            children: Vec::new(),
            name: name.into(),
            node_type,
            local_transform: Transform::IDENTITY,
            world_transform: Transform::IDENTITY,
            size: Size::ZERO,
            layout: LayoutConfig::default(),
            constraints: Constraints::default(),
            styles: Styles::default(),
            visible: true,
            locked: false,
            clips_content: false,
            text_content: None,
        }
    }
}
