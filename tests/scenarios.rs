//! End-to-end scenarios exercising the full façade: scene authoring,
//! layout, hit-testing, and undoable commands together.

use canopy::{
    Bounds, Command, CounterAlign, Direction, Document, FlexBasis, FlexItem, HitTestOptions,
    LayoutMode, Node, NodeType, PrimaryAlign, Transform,
};
use indexmap::IndexMap;
use kurbo::Point;
use pretty_assertions::assert_eq;

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
fn absolute_placement_matches_intrinsic_position() {
    let mut doc = Document::new();
    let mut root = frame("root");
    root.size.width = 200.0;
    root.size.height = 100.0;
    doc.add_node(root);
    doc.add_node(child_at("c", "root", 10.0, 20.0, 50.0, 30.0));

    let layouts = doc.compute_layout();
    let c = layouts.get("c").unwrap();
    assert_eq!((c.x, c.y, c.width, c.height), (10.0, 20.0, 50.0, 30.0));
    assert_eq!((c.world_x, c.world_y), (10.0, 20.0));
}

#[test]
fn auto_layout_row_center_centers_two_children() {
    let mut doc = Document::new();
    let mut root = frame("root");
    root.size.width = 300.0;
    root.size.height = 100.0;
    root.layout.mode = LayoutMode::AutoLayout;
    root.layout.direction = Direction::Row;
    root.layout.gap = 10.0;
    root.layout.primary_align = PrimaryAlign::Center;
    root.layout.counter_align = CounterAlign::Center;
    doc.add_node(root);
    doc.add_node(child_at("a", "root", 0.0, 0.0, 50.0, 40.0));
    doc.add_node(child_at("b", "root", 0.0, 0.0, 50.0, 40.0));

    let layouts = doc.compute_layout();
    let a = layouts.get("a").unwrap();
    let b = layouts.get("b").unwrap();
    // free = 300 - 110 = 190, start = 95.
    assert_eq!((a.x, a.y), (95.0, 30.0));
    assert_eq!((b.x, b.y), (155.0, 30.0));
}

#[test]
fn flex_grow_distributes_free_space_by_weight() {
    let mut doc = Document::new();
    let mut root = frame("root");
    root.size.width = 400.0;
    root.size.height = 100.0;
    root.layout.mode = LayoutMode::Flex;
    root.layout.direction = Direction::Row;
    doc.add_node(root);

    let mut a = child_at("a", "root", 0.0, 0.0, 100.0, 40.0);
    a.layout.flex_item = FlexItem { grow: 1.0, shrink: 1.0, basis: FlexBasis::Value(100.0), ..FlexItem::default() };
    doc.add_node(a);

    let mut b = child_at("b", "root", 0.0, 0.0, 100.0, 40.0);
    b.layout.flex_item = FlexItem { grow: 3.0, shrink: 1.0, basis: FlexBasis::Value(100.0), ..FlexItem::default() };
    doc.add_node(b);

    let layouts = doc.compute_layout();
    let a_layout = layouts.get("a").unwrap();
    let b_layout = layouts.get("b").unwrap();
    // free = 400 - 200 = 200; a = 100 + 200*(1/4) = 150; b = 100 + 200*(3/4) = 250.
    assert_eq!(a_layout.width, 150.0);
    assert_eq!(a_layout.x, 0.0);
    assert_eq!(b_layout.width, 250.0);
    assert_eq!(b_layout.x, 150.0);
}

#[test]
fn move_commands_within_coalesce_window_merge_into_one_undo_entry() {
    let mut doc = Document::new();
    doc.add_node(Node::new("n", "n", NodeType::Shape));
    doc.sync_from_scene_graph();

    let m1 = Command::new_move(doc.scene(), "c1", 0, "move", vec!["n".to_string()], 5.0, 0.0).unwrap();
    assert!(doc.execute(m1));

    let m2 = Command::new_move(doc.scene(), "c2", 50, "move", vec!["n".to_string()], 3.0, 0.0).unwrap();
    assert!(doc.execute(m2));

    assert_eq!(doc.undo_depth(), 1);
    assert_eq!(doc.get_node("n").unwrap().world_transform.tx, 8.0);

    assert!(doc.undo());
    assert_eq!(doc.get_node("n").unwrap().world_transform.tx, 0.0);

    assert!(doc.redo());
    assert_eq!(doc.get_node("n").unwrap().world_transform.tx, 8.0);
}

#[test]
fn delete_undo_restores_subtree_with_original_fields() {
    let mut doc = Document::new();
    doc.add_node(frame("root"));
    let mut a = frame("a");
    a.parent_id = Some("root".to_string());
    doc.add_node(a);
    let mut g = frame("g");
    g.parent_id = Some("a".to_string());
    doc.add_node(g);
    doc.sync_from_scene_graph();

    let before_a = doc.get_node("a").unwrap().clone();
    let before_g = doc.get_node("g").unwrap().clone();

    let delete = Command::new_delete(doc.scene(), "c1", 0, "delete a", "a").unwrap();
    assert!(doc.execute(delete));
    assert!(doc.get_node("root").unwrap().children.is_empty());
    assert!(doc.get_node("a").is_none());
    assert!(doc.get_node("g").is_none());

    assert!(doc.undo());
    assert_eq!(doc.get_node("root").unwrap().children, vec!["a".to_string()]);
    assert_eq!(doc.get_node("a").unwrap(), &before_a);
    assert_eq!(doc.get_node("g").unwrap(), &before_g);
}

#[test]
fn hit_test_reports_later_sibling_first() {
    let mut doc = Document::new();
    let mut root = frame("root");
    root.size.width = 200.0;
    root.size.height = 200.0;
    doc.add_node(root);
    doc.add_node(child_at("s1", "root", 0.0, 0.0, 100.0, 100.0));
    doc.add_node(child_at("s2", "root", 0.0, 0.0, 100.0, 100.0));
    doc.sync_from_scene_graph();

    let hits = doc.hit_test(Point::new(50.0, 50.0), &HitTestOptions::default());
    let ids: Vec<_> = hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(ids, vec!["s2".to_string(), "s1".to_string(), "root".to_string()]);

    let draw_order = doc.compute_draw_order();
    assert_eq!(draw_order.last().unwrap().id, "s2");
}

#[test]
fn resize_command_round_trips_through_document() {
    let mut doc = Document::new();
    let mut n = Node::new("n", "n", NodeType::Shape);
    n.size.width = 50.0;
    n.size.height = 50.0;
    doc.add_node(n);
    doc.sync_from_scene_graph();

    let resize = Command::new_resize(
        doc.scene(),
        "c1",
        0,
        "resize",
        "n".to_string(),
        Bounds { x: 0.0, y: 0.0, width: 120.0, height: 80.0 },
        None,
    )
    .unwrap();
    assert!(doc.execute(resize));

    let geometry = doc.get_geometry("n").unwrap();
    assert_eq!((geometry.display.width, geometry.display.height), (120.0, 80.0));

    assert!(doc.undo());
    let geometry = doc.get_geometry("n").unwrap();
    assert_eq!((geometry.display.width, geometry.display.height), (50.0, 50.0));
}

#[test]
fn snapshot_carries_local_and_world_coordinates_for_the_whole_tree() {
    let mut doc = Document::new();
    let mut root = frame("root");
    root.size.width = 200.0;
    root.size.height = 100.0;
    doc.add_node(root);
    doc.add_node(child_at("c", "root", 10.0, 20.0, 50.0, 30.0));
    doc.sync_from_scene_graph();

    let mut manifest = IndexMap::new();
    manifest.insert("imageRef".to_string(), "https://example.invalid/image.png".to_string());
    let snapshot = doc.snapshot(1, manifest, 1920.0, 1080.0);

    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.payload.ref_w, 1920);
    assert_eq!(snapshot.payload.ref_h, 1080);
    assert_eq!(snapshot.payload.manifest.get("imageRef").unwrap(), "https://example.invalid/image.png");

    let root_node = &snapshot.payload.roots[0];
    assert_eq!(root_node.id, "root");
    assert_eq!((root_node.width, root_node.height), (200, 100));

    let child = &root_node.children[0];
    assert_eq!(child.id, "c");
    assert_eq!((child.x, child.y), (10, 20));
    assert_eq!((child.ax, child.ay), (10, 20));
    assert_eq!((child.width, child.height), (50, 30));
}
