//! Canopy Geometry: 2-D affine matrix and rectangle primitives.
//!
//! This crate is the lowest layer of the Canopy design-canvas engine. It
//! owns no scene state of its own — it is a small set of pure functions over
//! [`kurbo::Affine`], [`kurbo::Rect`] and [`kurbo::Point`] that the rest of
//! the workspace (`canopy_transform`, `canopy_layout`, `canopy_hittest`)
//! builds on:
//!
//! - AABB and corner extraction from an affine transform plus a size.
//! - Scale/rotation/translation decomposition (and the inverse, composition),
//!   with shear intentionally left unmodelled.
//! - Grid- and peer-aware value snapping, used by the transform engine's
//!   `snap`/`snapBounds` operations.
//!
//! Canopy represents affine transforms as `kurbo::Affine` directly rather
//! than a bespoke six-number struct: `Affine`'s coefficient order `[a, b, c,
//! d, e, f]` already matches the `[a, b, c, d, tx, ty]` convention used
//! throughout the engine, and composition is exactly `Affine`'s `Mul` impl.

use kurbo::{Affine, Point, Rect, Vec2};

/// Decomposed affine transform: scale, rotation, and translation.
///
/// Shear is not modelled. A matrix that contains shear is decomposed into
/// the nearest scale/rotation approximation implied by the formulas below;
/// recomposing a [`Decomposed`] value will not reproduce the original
/// sheared matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    /// Scale factor along the local x axis, `||(a, b)||`.
    pub scale_x: f64,
    /// Scale factor along the local y axis, `||(c, d)||`.
    pub scale_y: f64,
    /// Rotation in radians, `atan2(b, a)`.
    pub rotation: f64,
    /// Translation component, `(tx, ty)`.
    pub translation: Vec2,
}

/// Decomposes `m` into scale, rotation, and translation.
///
/// `scale_x = ||(a, b)||`, `scale_y = ||(c, d)||`, `rotation = atan2(b, a)`,
/// `translation = (tx, ty)`. This is exact for similarity transforms
/// (uniform scale + rotation + translation) and an approximation for
/// sheared matrices, which this crate does not model separately.
#[must_use]
pub fn decompose(m: Affine) -> Decomposed {
    let [a, b, c, d, e, f] = m.as_coeffs();
    Decomposed {
        scale_x: (a * a + b * b).sqrt(),
        scale_y: (c * c + d * d).sqrt(),
        rotation: b.atan2(a),
        translation: Vec2::new(e, f),
    }
}

/// Recomposes an affine transform from scale, rotation, and translation.
///
/// This is the inverse of [`decompose`] for the similarity-transform case:
/// `decompose(compose(d)) == d` for any `d` with no shear.
#[must_use]
pub fn compose(decomposed: Decomposed) -> Affine {
    let Decomposed {
        scale_x,
        scale_y,
        rotation,
        translation,
    } = decomposed;
    Affine::translate(translation) * Affine::rotate(rotation) * Affine::scale_non_uniform(scale_x, scale_y)
}

/// Returns the four local-space corners of a `width` × `height` rectangle
/// anchored at the local origin, in the order `(0,0)`, `(w,0)`, `(w,h)`,
/// `(0,h)`.
#[must_use]
pub fn local_corners(width: f64, height: f64) -> [Point; 4] {
    [
        Point::new(0.0, 0.0),
        Point::new(width, 0.0),
        Point::new(width, height),
        Point::new(0.0, height),
    ]
}

/// Transforms the four corners of a `width` × `height` rectangle at the
/// local origin by `m`, returning them in world space in the same order as
/// [`local_corners`].
#[must_use]
pub fn world_corners(m: Affine, width: f64, height: f64) -> [Point; 4] {
    local_corners(width, height).map(|p| m * p)
}

/// Computes the axis-aligned bounding box of a `width` × `height` rectangle
/// transformed by `m`.
///
/// The four corners are transformed and the result is their componentwise
/// min/max — conservative (not tight) for rotated or sheared input.
#[must_use]
pub fn aabb_from_affine(m: Affine, width: f64, height: f64) -> Rect {
    let corners = world_corners(m, width, height);
    let mut min_x = corners[0].x;
    let mut min_y = corners[0].y;
    let mut max_x = corners[0].x;
    let mut max_y = corners[0].y;
    for p in &corners[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Rect::new(min_x, min_y, max_x, max_y)
}

/// A guide produced while snapping a point or bounds, describing the axis
/// and world-space position a value was pulled into alignment with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapGuide {
    /// Axis the guide lies along.
    pub axis: Axis,
    /// World-space position of the guide line.
    pub position: f64,
}

/// An axis of alignment for a [`SnapGuide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// A vertical guide line, constraining an x coordinate.
    Vertical,
    /// A horizontal guide line, constraining a y coordinate.
    Horizontal,
}

/// Configuration for grid- and peer-snapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapSettings {
    /// Grid cell size in world units. `None` disables grid snapping.
    pub grid_size: Option<f64>,
    /// Maximum world-space distance at which a value is pulled onto a grid
    /// line or peer edge.
    pub threshold: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            grid_size: Some(8.0),
            threshold: 4.0,
        }
    }
}

/// Snaps a single scalar coordinate against an optional grid and a set of
/// peer candidate values, preferring the closest candidate within
/// `settings.threshold`.
///
/// Peer values are checked before the grid line at equal distance, since
/// alignment with visible sibling geometry is usually the more meaningful
/// guide for a user to see. Returns the (possibly unchanged) value and the
/// guide that produced it, if any.
#[must_use]
pub fn snap_value(
    value: f64,
    peers: &[f64],
    axis: Axis,
    settings: SnapSettings,
) -> (f64, Option<SnapGuide>) {
    let mut best: Option<(f64, f64)> = None; // (candidate, distance)

    for &peer in peers {
        let dist = (peer - value).abs();
        if dist <= settings.threshold && best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((peer, dist));
        }
    }

    if best.is_none()
        && let Some(grid) = settings.grid_size
        && grid > 0.0
    {
        let nearest = (value / grid).round() * grid;
        let dist = (nearest - value).abs();
        if dist <= settings.threshold {
            best = Some((nearest, dist));
        }
    }

    match best {
        Some((snapped, _)) => (
            snapped,
            Some(SnapGuide {
                axis,
                position: snapped,
            }),
        ),
        None => (value, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_aabb_matches_rect() {
        let aabb = aabb_from_affine(Affine::IDENTITY, 50.0, 30.0);
        assert_eq!(aabb, Rect::new(0.0, 0.0, 50.0, 30.0));
    }

    #[test]
    fn translated_aabb_shifts() {
        let m = Affine::translate((10.0, 20.0));
        let aabb = aabb_from_affine(m, 50.0, 30.0);
        assert_eq!(aabb, Rect::new(10.0, 20.0, 60.0, 50.0));
    }

    #[test]
    fn rotated_aabb_is_conservative() {
        let m = Affine::rotate(FRAC_PI_2);
        let aabb = aabb_from_affine(m, 100.0, 10.0);
        // A 90-degree rotation of a 100x10 rect swaps its extent.
        assert!((aabb.width() - 10.0).abs() < 1e-9);
        assert!((aabb.height() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn decompose_identity() {
        let d = decompose(Affine::IDENTITY);
        assert!((d.scale_x - 1.0).abs() < 1e-12);
        assert!((d.scale_y - 1.0).abs() < 1e-12);
        assert!(d.rotation.abs() < 1e-12);
        assert_eq!(d.translation, Vec2::ZERO);
    }

    #[test]
    fn decompose_then_compose_roundtrips_without_shear() {
        let original = Decomposed {
            scale_x: 2.0,
            scale_y: 3.0,
            rotation: 0.4,
            translation: Vec2::new(5.0, -7.0),
        };
        let m = compose(original);
        let d = decompose(m);
        assert!((d.scale_x - original.scale_x).abs() < 1e-9);
        assert!((d.scale_y - original.scale_y).abs() < 1e-9);
        assert!((d.rotation - original.rotation).abs() < 1e-9);
        assert!((d.translation - original.translation).hypot() < 1e-9);
    }

    #[test]
    fn snap_prefers_nearest_peer_over_grid() {
        let settings = SnapSettings {
            grid_size: Some(10.0),
            threshold: 3.0,
        };
        // 101 is within threshold of peer 100 and of the grid line 100; peer wins ties.
        let (value, guide) = snap_value(101.0, &[100.0], Axis::Vertical, settings);
        assert_eq!(value, 100.0);
        assert_eq!(
            guide,
            Some(SnapGuide {
                axis: Axis::Vertical,
                position: 100.0
            })
        );
    }

    #[test]
    fn snap_falls_back_to_grid_without_peers() {
        let settings = SnapSettings {
            grid_size: Some(10.0),
            threshold: 3.0,
        };
        let (value, guide) = snap_value(42.0, &[], Axis::Horizontal, settings);
        assert_eq!(value, 40.0);
        assert!(guide.is_some());
    }

    #[test]
    fn snap_no_op_outside_threshold() {
        let settings = SnapSettings {
            grid_size: Some(10.0),
            threshold: 1.0,
        };
        let (value, guide) = snap_value(34.0, &[], Axis::Horizontal, settings);
        assert_eq!(value, 34.0);
        assert!(guide.is_none());
    }
}
