//! Canopy Layout: ABSOLUTE, AUTO_LAYOUT, and FLEX resolution over a
//! [`canopy_scene::SceneGraph`].
//!
//! [`LayoutEngine`] is a pure reader over the scene graph — it never writes
//! back into it. This mirrors [`canopy_scene::SceneGraph`]'s own
//! separation of concerns: the graph stores authored geometry, the
//! transform engine derives world affine transforms from it, and this
//! crate derives a second, simplified translation-only box model from it.
//! The two never need to agree except at the origin.

mod engine;
mod types;

pub use engine::LayoutEngine;
pub use types::{ComputedLayout, LayoutOptions};

#[cfg(test)]
mod tests {
    use canopy_scene::{
        Constraints, CounterAlign, Direction, FlexBasis, FlexItem, HorizontalConstraint, LayoutMode,
        Node, NodeType, Padding, PrimaryAlign, SceneGraph, Sizing, SizingMode, Transform,
        VerticalConstraint,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn frame(id: &str) -> Node {
        Node::new(id, id, NodeType::Frame)
    }

    fn child_at(id: &str, parent: &str, x: f64, y: f64, w: f64, h: f64) -> Node {
        let mut n = frame(id);
        n.parent_id = Some(parent.to_owned());
        n.local_transform = Transform::from_translation(x, y);
        n.size.width = w;
        n.size.height = h;
        n
    }

    #[test]
    fn absolute_left_right_constraint_grows_with_parent() {
        let mut sg = SceneGraph::new();
        let mut root = frame("root");
        root.size.width = 400.0;
        root.size.height = 300.0;
        sg.add(root);

        let mut child = child_at("child", "root", 20.0, 20.0, 100.0, 50.0);
        child.constraints = Constraints {
            horizontal: HorizontalConstraint::LeftRight,
            vertical: VerticalConstraint::Top,
        };
        sg.add(child);

        let mut engine = LayoutEngine::new();
        let layouts = engine.compute(&sg, LayoutOptions::default());

        let root_layout = layouts.get("root").unwrap();
        assert_eq!((root_layout.width, root_layout.height), (400.0, 300.0));

        // LEFT_RIGHT only changes the child's width once the parent's content box differs
        // from the child's originally authored right margin. Here the parent's own width is
        // FIXED at its intrinsic 400, so the content box matches and the child is unchanged.
        let child_layout = layouts.get("child").unwrap();
        assert_eq!((child_layout.x, child_layout.y), (20.0, 20.0));
        assert_eq!((child_layout.width, child_layout.height), (100.0, 50.0));
        assert_eq!((child_layout.world_x, child_layout.world_y), (20.0, 20.0));
    }

    #[test]
    fn auto_layout_center_center_centers_a_single_child() {
        let mut sg = SceneGraph::new();
        let mut root = frame("root");
        root.size.width = 200.0;
        root.size.height = 100.0;
        root.layout.mode = LayoutMode::AutoLayout;
        root.layout.direction = Direction::Row;
        root.layout.primary_align = PrimaryAlign::Center;
        root.layout.counter_align = CounterAlign::Center;
        sg.add(root);

        let child = child_at("child", "root", 0.0, 0.0, 40.0, 20.0);
        sg.add(child);

        let mut engine = LayoutEngine::new();
        let layouts = engine.compute(&sg, LayoutOptions::default());

        let child_layout = layouts.get("child").unwrap();
        // Primary free = 200 - 40 = 160, centered start = 80. Counter free = 100 - 20 = 80, centered = 40.
        assert_eq!((child_layout.x, child_layout.y), (80.0, 40.0));
        assert_eq!((child_layout.width, child_layout.height), (40.0, 20.0));
    }

    #[test]
    fn flex_distributes_grow_among_two_children() {
        let mut sg = SceneGraph::new();
        let mut root = frame("root");
        root.size.width = 300.0;
        root.size.height = 100.0;
        root.layout.mode = LayoutMode::Flex;
        root.layout.direction = Direction::Row;
        root.layout.gap = 10.0;
        sg.add(root);

        let mut a = child_at("a", "root", 0.0, 0.0, 50.0, 40.0);
        a.layout.flex_item = FlexItem { grow: 1.0, shrink: 1.0, basis: FlexBasis::Value(50.0), ..FlexItem::default() };
        sg.add(a);

        let mut b = child_at("b", "root", 0.0, 0.0, 50.0, 40.0);
        b.layout.flex_item = FlexItem { grow: 1.0, shrink: 1.0, basis: FlexBasis::Value(50.0), ..FlexItem::default() };
        sg.add(b);

        let mut engine = LayoutEngine::new();
        let layouts = engine.compute(&sg, LayoutOptions::default());

        // free = 300 - 100 - 10 = 190, split evenly: each item grows by 95 -> 145.
        let a_layout = layouts.get("a").unwrap();
        let b_layout = layouts.get("b").unwrap();
        assert_eq!(a_layout.width, 145.0);
        assert_eq!(a_layout.x, 0.0);
        assert_eq!(b_layout.width, 145.0);
        assert_eq!(b_layout.x, 155.0);
    }

    #[test]
    fn hug_container_with_padding_and_no_children_collapses_to_padding() {
        let mut sg = SceneGraph::new();
        let mut root = frame("root");
        root.layout.sizing = Sizing { horizontal: SizingMode::Hug, vertical: SizingMode::Hug, ..Sizing::default() };
        root.layout.padding = Padding { top: 8.0, right: 8.0, bottom: 8.0, left: 8.0 };
        sg.add(root);

        let mut engine = LayoutEngine::new();
        let layouts = engine.compute(&sg, LayoutOptions::default());

        let root_layout = layouts.get("root").unwrap();
        assert_eq!((root_layout.width, root_layout.height), (16.0, 16.0));
    }

    #[test]
    fn dangling_child_id_is_skipped_without_an_entry() {
        let mut sg = SceneGraph::new();
        let mut root = frame("root");
        root.children.push("ghost".to_owned());
        sg.add(root);

        let mut engine = LayoutEngine::new();
        let layouts = engine.compute(&sg, LayoutOptions::default());

        assert!(layouts.get("ghost").is_none());
        assert!(layouts.get("root").is_some());
    }

    #[test]
    fn invisible_node_gets_zero_size_entry_and_is_not_recursed_into() {
        let mut sg = SceneGraph::new();
        let root = frame("root");
        sg.add(root);

        let mut hidden = child_at("hidden", "root", 10.0, 10.0, 100.0, 100.0);
        hidden.visible = false;
        sg.add(hidden);

        let grandchild = child_at("grandchild", "hidden", 0.0, 0.0, 10.0, 10.0);
        sg.add(grandchild);

        let mut engine = LayoutEngine::new();
        let layouts = engine.compute(&sg, LayoutOptions::default());

        let hidden_layout = layouts.get("hidden").unwrap();
        assert_eq!((hidden_layout.width, hidden_layout.height), (0.0, 0.0));
        assert_eq!((hidden_layout.x, hidden_layout.y), (10.0, 10.0));
        assert!(layouts.get("grandchild").is_none());
    }

    #[test]
    fn recompute_subtree_matches_a_full_compute() {
        let mut sg = SceneGraph::new();
        let root = frame("root");
        sg.add(root);

        let child = child_at("child", "root", 5.0, 5.0, 20.0, 20.0);
        sg.add(child);

        let mut engine = LayoutEngine::new();
        engine.compute(&sg, LayoutOptions::default());
        let before = *engine.get("child").unwrap();

        engine.recompute_subtree(&sg, "child", LayoutOptions::default());
        let after = *engine.get("child").unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn round_to_pixels_rounds_every_field() {
        let mut sg = SceneGraph::new();
        let mut root = frame("root");
        root.size.width = 10.3;
        root.size.height = 10.7;
        sg.add(root);

        let mut engine = LayoutEngine::new();
        let options = LayoutOptions { round_to_pixels: true, ..LayoutOptions::default() };
        let layouts = engine.compute(&sg, options);
        let root_layout = layouts.get("root").unwrap();
        assert_eq!((root_layout.width, root_layout.height), (10.0, 11.0));
    }
}
