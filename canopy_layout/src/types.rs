//! Output and option types for the layout engine.

/// A node's resolved box: position relative to its parent, size, and the
/// same position accumulated from the root.
///
/// This is a simplified translation-only coordinate system private to the
/// layout engine — it does not account for rotation or scale, which live in
/// the node's `localTransform` and are the transform engine's concern. The
/// two systems agree at `(0, 0)` but are otherwise independent lenses on the
/// same tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputedLayout {
    /// Position relative to the parent's own origin.
    pub x: f64,
    /// Position relative to the parent's own origin.
    pub y: f64,
    /// Resolved width.
    pub width: f64,
    /// Resolved height.
    pub height: f64,
    /// Position accumulated from the root.
    pub world_x: f64,
    /// Position accumulated from the root.
    pub world_y: f64,
}

impl ComputedLayout {
    /// Rounds every field to the nearest integer, in place.
    pub fn round_to_pixels(&mut self) {
        self.x = self.x.round();
        self.y = self.y.round();
        self.width = self.width.round();
        self.height = self.height.round();
        self.world_x = self.world_x.round();
        self.world_y = self.world_y.round();
    }
}

/// Options controlling a layout pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOptions {
    /// Offered width for root nodes whose horizontal sizing is `FILL`.
    pub viewport_width: Option<f64>,
    /// Offered height for root nodes whose vertical sizing is `FILL`.
    pub viewport_height: Option<f64>,
    /// Whether to round every resolved field to the nearest integer after
    /// all other resolution has finished.
    pub round_to_pixels: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            viewport_width: None,
            viewport_height: None,
            round_to_pixels: false,
        }
    }
}
