//! The scene graph store: a node map keyed by id, with parent/child
//! consistency enforced at the edges of its API.

use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexMap;

use crate::types::{Node, NodeId};

/// A notification fired after a completed mutation.
///
/// The store itself does not decide *when* to fire this — see
/// [`SceneGraph::notify`]. In this engine that decision belongs to
/// `canopy_command::History`, which guarantees exactly one `notify` call
/// per completed top-level command, per §5's ordering guarantees.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    /// Human-readable description of what changed, usually a command's
    /// own description.
    pub description: String,
}

type Listener = Box<dyn FnMut(&ChangeEvent)>;

/// Opaque handle returned by [`SceneGraph::subscribe`], usable to remove a
/// listener later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A partial update to apply to an existing node. Every field left `None`
/// is left unchanged on the target node.
#[derive(Clone, Debug, Default)]
pub struct NodePatch {
    /// New local transform, if changing.
    pub local_transform: Option<crate::types::Transform>,
    /// New world transform, if changing (normally only the transform engine sets this).
    pub world_transform: Option<crate::types::Transform>,
    /// New size, if changing.
    pub size: Option<crate::types::Size>,
    /// New layout config, if changing.
    pub layout: Option<crate::types::LayoutConfig>,
    /// New constraints, if changing.
    pub constraints: Option<crate::types::Constraints>,
    /// New styles record, if changing.
    pub styles: Option<crate::types::Styles>,
    /// New name, if changing.
    pub name: Option<String>,
    /// New visibility, if changing.
    pub visible: Option<bool>,
    /// New locked state, if changing.
    pub locked: Option<bool>,
    /// New clips-content state, if changing.
    pub clips_content: Option<bool>,
    /// New text content, if changing. `Some(None)` clears it.
    pub text_content: Option<Option<String>>,
}

/// The canonical node map for a document: owns every [`Node`] and enforces
/// parent/child consistency across `add`/`remove`/`reparent`.
///
/// `SceneGraph` does not itself cascade deletes, coalesce commands, or
/// maintain undo history — those are the command layer's job (see
/// `canopy_command`). It is deliberately "dumb": a consistent tree plus a
/// notification hook.
pub struct SceneGraph {
    nodes: IndexMap<NodeId, Node>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes)
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl SceneGraph {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            listeners: Vec::new(),
            next_subscription_id: 0,
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up a node by id, mutably.
    ///
    /// Prefer [`SceneGraph::update`] for external callers; this is exposed
    /// for `canopy_transform`'s world-transform cache writeback and similar
    /// same-crate-family collaborators.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Returns `true` if a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterates over all nodes in insertion order.
    pub fn iterate(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterates over root nodes (no parent) in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.parent_id.is_none())
    }

    /// Number of nodes currently in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts a new node.
    ///
    /// Returns `false` (a no-op) if a node with this id already exists, or
    /// if `node.parent_id` names a node that doesn't exist. On success, the
    /// node is appended to its parent's `children` (if any) and to the
    /// graph's insertion order.
    pub fn add(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            log::warn!("scene graph: refusing to add duplicate node id {}", node.id);
            return false;
        }
        if let Some(parent_id) = &node.parent_id
            && !self.nodes.contains_key(parent_id)
        {
            log::warn!(
                "scene graph: refusing to add node {} with missing parent {}",
                node.id,
                parent_id
            );
            return false;
        }

        let id = node.id.clone();
        if let Some(parent_id) = node.parent_id.clone() {
            let parent = self
                .nodes
                .get_mut(&parent_id)
                .expect("parent existence checked above");
            if !parent.children.contains(&id) {
                parent.children.push(id.clone());
            }
        }
        self.nodes.insert(id, node);
        true
    }

    /// Inserts a new node as a child of `parent_id` at `index` within the
    /// parent's children list (clamped to the list's length).
    ///
    /// Returns `false` if `parent_id` is `Some` and doesn't exist, or if a
    /// node with this id already exists.
    pub fn insert_at(&mut self, mut node: Node, parent_id: Option<&str>, index: usize) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        if let Some(parent_id) = parent_id
            && !self.nodes.contains_key(parent_id)
        {
            return false;
        }

        node.parent_id = parent_id.map(str::to_owned);
        let id = node.id.clone();
        if let Some(parent_id) = parent_id {
            let parent = self
                .nodes
                .get_mut(parent_id)
                .expect("parent existence checked above");
            let index = index.min(parent.children.len());
            parent.children.insert(index, id.clone());
        }
        self.nodes.insert(id, node);
        true
    }

    /// Removes a single node (not its descendants) and detaches it from its
    /// parent's children list. Returns the removed node, or `None` if it
    /// didn't exist.
    ///
    /// Descendants are left in place, now referencing a `parentId` that no
    /// longer resolves. Cascading a delete through a subtree is the command
    /// layer's responsibility, so that undo can restore exactly what
    /// existed before.
    pub fn remove(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.shift_remove(id)?;
        if let Some(parent_id) = &node.parent_id
            && let Some(parent) = self.nodes.get_mut(parent_id)
        {
            parent.children.retain(|child| child != id);
        }
        Some(node)
    }

    /// Applies a partial update to an existing node. Returns `false` (a
    /// no-op) if `id` doesn't exist.
    pub fn update(&mut self, id: &str, patch: NodePatch) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            log::warn!("scene graph: update on missing node {id}");
            return false;
        };

        if let Some(v) = patch.local_transform {
            node.local_transform = v;
        }
        if let Some(v) = patch.world_transform {
            node.world_transform = v;
        }
        if let Some(v) = patch.size {
            node.size = v;
        }
        if let Some(v) = patch.layout {
            node.layout = v;
        }
        if let Some(v) = patch.constraints {
            node.constraints = v;
        }
        if let Some(v) = patch.styles {
            node.styles = v;
        }
        if let Some(v) = patch.name {
            node.name = v;
        }
        if let Some(v) = patch.visible {
            node.visible = v;
        }
        if let Some(v) = patch.locked {
            node.locked = v;
        }
        if let Some(v) = patch.clips_content {
            node.clips_content = v;
        }
        if let Some(v) = patch.text_content {
            node.text_content = v;
        }
        true
    }

    /// Returns `true` if `id` is a (possibly indirect) descendant of `ancestor_id`.
    ///
    /// Used both by hit-test convenience queries and by [`SceneGraph::reparent`]
    /// to reject cycles.
    #[must_use]
    pub fn is_descendant_of(&self, id: &str, ancestor_id: &str) -> bool {
        let mut current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        while let Some(parent) = current {
            if parent == ancestor_id {
                return true;
            }
            current = self.nodes.get(parent).and_then(|n| n.parent_id.as_deref());
        }
        false
    }

    /// Moves an existing node to a new parent (or to the root set) at
    /// `new_index` within the destination's children list.
    ///
    /// Returns `false` without mutating anything if: `id` doesn't exist,
    /// `new_parent_id` doesn't exist, or the move would make a node its own
    /// ancestor (`new_parent_id == id` or `new_parent_id` is a descendant of
    /// `id`).
    pub fn reparent(&mut self, id: &str, new_parent_id: Option<&str>, new_index: usize) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        if let Some(new_parent_id) = new_parent_id {
            if !self.nodes.contains_key(new_parent_id) {
                return false;
            }
            if new_parent_id == id || self.is_descendant_of(new_parent_id, id) {
                log::warn!("scene graph: refusing reparent of {id} that would create a cycle");
                return false;
            }
        }

        let old_parent_id = self.nodes.get(id).and_then(|n| n.parent_id.clone());
        if let Some(old_parent_id) = &old_parent_id
            && let Some(old_parent) = self.nodes.get_mut(old_parent_id)
        {
            old_parent.children.retain(|child| child != id);
        }

        if let Some(new_parent_id) = new_parent_id {
            let new_parent = self
                .nodes
                .get_mut(new_parent_id)
                .expect("existence checked above");
            let new_index = new_index.min(new_parent.children.len());
            new_parent.children.insert(new_index, id.to_owned());
        }

        let node = self.nodes.get_mut(id).expect("existence checked above");
        node.parent_id = new_parent_id.map(str::to_owned);
        true
    }

    /// Registers a listener to be called from [`SceneGraph::notify`].
    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a previously registered listener. Returns `false` if the id
    /// is unknown (already unsubscribed, or never valid).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Calls every registered listener with `event`.
    ///
    /// A listener that panics is caught and logged; the remaining listeners
    /// still run and the scene graph's own state is unaffected, matching
    /// the "Listener exception" row of the engine's error taxonomy.
    pub fn notify(&mut self, event: &ChangeEvent) {
        for (_, listener) in &mut self.listeners {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if let Err(panic) = result {
                let message = panic
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("<non-string panic payload>");
                log::error!("scene graph: change listener panicked: {message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    fn frame(id: &str) -> Node {
        Node::new(id, id, NodeType::Frame)
    }

    #[test]
    fn add_appends_to_parent_children_once() {
        let mut sg = SceneGraph::new();
        sg.add(frame("root"));
        let mut child = frame("a");
        child.parent_id = Some("root".into());
        assert!(sg.add(child));
        assert_eq!(sg.get("root").unwrap().children, vec!["a".to_string()]);
    }

    #[test]
    fn add_rejects_missing_parent() {
        let mut sg = SceneGraph::new();
        let mut child = frame("a");
        child.parent_id = Some("missing".into());
        assert!(!sg.add(child));
        assert!(sg.get("a").is_none());
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut sg = SceneGraph::new();
        assert!(sg.add(frame("a")));
        assert!(!sg.add(frame("a")));
    }

    #[test]
    fn roots_preserve_insertion_order() {
        let mut sg = SceneGraph::new();
        sg.add(frame("b"));
        sg.add(frame("a"));
        let ids: Vec<_> = sg.roots().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn remove_detaches_from_parent_but_not_descendants() {
        let mut sg = SceneGraph::new();
        sg.add(frame("root"));
        let mut a = frame("a");
        a.parent_id = Some("root".into());
        sg.add(a);
        let mut g = frame("g");
        g.parent_id = Some("a".into());
        sg.add(g);

        let removed = sg.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(sg.get("root").unwrap().children.is_empty());
        // "g" is left dangling; the command layer is responsible for cascading.
        assert!(sg.get("g").is_some());
    }

    #[test]
    fn reparent_rejects_cycle() {
        let mut sg = SceneGraph::new();
        sg.add(frame("root"));
        let mut a = frame("a");
        a.parent_id = Some("root".into());
        sg.add(a);

        assert!(!sg.reparent("root", Some("a"), 0));
        assert_eq!(sg.get("root").unwrap().parent_id, None);
    }

    #[test]
    fn reparent_moves_node_and_splices_index() {
        let mut sg = SceneGraph::new();
        sg.add(frame("root"));
        for id in ["a", "b"] {
            let mut n = frame(id);
            n.parent_id = Some("root".into());
            sg.add(n);
        }
        sg.add(frame("other"));

        assert!(sg.reparent("a", Some("other"), 0));
        assert_eq!(sg.get("root").unwrap().children, vec!["b".to_string()]);
        assert_eq!(sg.get("other").unwrap().children, vec!["a".to_string()]);
        assert_eq!(sg.get("a").unwrap().parent_id, Some("other".to_string()));
    }

    #[test]
    fn notify_survives_panicking_listener() {
        let mut sg = SceneGraph::new();
        let calls = std::rc::Rc::new(std::cell::RefCell::new(0));
        let calls_clone = calls.clone();
        sg.subscribe(|_| panic!("boom"));
        sg.subscribe(move |_| *calls_clone.borrow_mut() += 1);

        sg.notify(&ChangeEvent {
            description: "test".into(),
        });

        assert_eq!(*calls.borrow(), 1);
    }
}
