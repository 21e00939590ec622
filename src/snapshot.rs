//! The snapshot shape (spec §6): consumed by an out-of-scope live-publish
//! collaborator, produced here because the core is the only party that can
//! compute it. `Document` emits one from its current scene graph and the
//! layout already cached by [`Document::compute_layout`]; nothing in this
//! crate reads one back in — restoring a document means reconstructing a
//! [`canopy_scene::SceneGraph`] from its own (richer) node records.

use canopy_layout::ComputedLayout;
use canopy_scene::{NodeId, SceneGraph};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Document;

/// `{ version, payload: { roots, manifest, refW, refH } }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub payload: SnapshotPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub roots: Vec<SnapshotNode>,
    pub manifest: IndexMap<String, String>,
    pub ref_w: i64,
    pub ref_h: i64,
}

/// A node's rounded local `(x,y)`, rounded world `(ax,ay)`, and size, with
/// its own children nested inline — `children` order is z-order, carried
/// straight from the scene graph's own ordered `children` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    pub x: i64,
    pub y: i64,
    pub ax: i64,
    pub ay: i64,
    pub width: i64,
    pub height: i64,
    pub children: Vec<SnapshotNode>,
}

impl Document {
    /// Builds a [`Snapshot`] of the document's current contents, running a
    /// fresh [`Document::compute_layout`] pass first so `x`/`y`/`ax`/`ay`
    /// reflect the scene graph as it stands now rather than a stale cache.
    ///
    /// `manifest` is passed through verbatim (for example, `imageRef` urls
    /// a live-publish collaborator needs) — this crate has no opinion on
    /// its contents.
    #[must_use]
    pub fn snapshot(
        &mut self,
        version: u32,
        manifest: IndexMap<String, String>,
        ref_width: f64,
        ref_height: f64,
    ) -> Snapshot {
        let layouts = self.compute_layout().clone();
        let root_ids: Vec<NodeId> = self.scene().roots().map(|n| n.id.clone()).collect();
        let roots = root_ids.iter().map(|id| snapshot_node(self.scene(), &layouts, id)).collect();
        Snapshot {
            version,
            payload: SnapshotPayload {
                roots,
                manifest,
                ref_w: ref_width.round() as i64,
                ref_h: ref_height.round() as i64,
            },
        }
    }
}

fn snapshot_node(scene: &SceneGraph, layouts: &IndexMap<NodeId, ComputedLayout>, id: &str) -> SnapshotNode {
    let node = scene.get(id).expect("snapshot_node only called with ids drawn from the live scene");
    let (x, y, ax, ay, width, height) = layouts.get(id).map_or((0, 0, 0, 0, 0, 0), |l| {
        (
            l.x.round() as i64,
            l.y.round() as i64,
            l.world_x.round() as i64,
            l.world_y.round() as i64,
            l.width.round() as i64,
            l.height.round() as i64,
        )
    });
    SnapshotNode {
        id: node.id.clone(),
        x,
        y,
        ax,
        ay,
        width,
        height,
        children: node.children.iter().map(|child_id| snapshot_node(scene, layouts, child_id)).collect(),
    }
}
