//! Undo/redo history: coalescing, drag sessions, transactions, and
//! persistence on top of the [`crate::Command`] primitives.

use std::collections::VecDeque;

use canopy_scene::SceneGraph;
use thiserror::Error;

use crate::command::{Command, CommandPayload, CommandType};

/// Errors internal to [`History`]'s bookkeeping. These are logged at the
/// point they occur and never surfaced through `History`'s public API,
/// which reports success/failure as plain `bool`/`Option` per the
/// engine's error taxonomy (an internal error here is a bug, not a
/// condition a caller should branch on).
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("a history operation was invoked reentrantly from within a listener")]
    Reentrant,
    #[error("no active drag session to record into")]
    NoActiveDragSession,
    #[error("no active transaction to record into")]
    NoActiveTransaction,
    #[error("persisted history envelope has unsupported version {0}")]
    UnsupportedVersion(u32),
    #[error("persisted history envelope is malformed: {0}")]
    Malformed(String),
}

/// Tunable limits for a [`History`] instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryConfig {
    /// Maximum number of undo entries retained; oldest are trimmed first.
    pub max_history: usize,
    /// Commands of a coalescible type arriving within this many
    /// milliseconds of the previous entry are merged into it instead of
    /// pushed as a new entry.
    pub coalesce_window_ms: u64,
    /// Soft cap on the undo stack's estimated serialized size. Oldest
    /// entries are trimmed once exceeded.
    pub max_memory_bytes: usize,
    /// Whether a host binding should wire Ctrl/Cmd+Z and
    /// Ctrl/Cmd+Shift+Z/Y to `undo`/`redo`. The core does not run a
    /// keyboard event loop itself; this only records the caller's
    /// preference for a binding layer to read.
    pub shortcuts_enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: 100,
            coalesce_window_ms: 500,
            max_memory_bytes: 50 * 1024 * 1024,
            shortcuts_enabled: true,
        }
    }
}

/// A notification fired after `execute`/`undo`/`redo` changes the stacks.
#[derive(Clone, Debug)]
pub struct HistoryChangeEvent {
    /// What just happened.
    pub kind: HistoryChangeKind,
    /// Whether `undo` is now possible.
    pub can_undo: bool,
    /// Whether `redo` is now possible.
    pub can_redo: bool,
}

/// The kind of change a [`HistoryChangeEvent`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryChangeKind {
    Executed,
    Coalesced,
    Undone,
    Redone,
    Cleared,
}

type Listener = Box<dyn FnMut(&HistoryChangeEvent)>;

/// An in-progress drag, merging every `record_drag_update` into one undo
/// entry until `finalize_drag_session` commits or `cancel_drag_session`
/// reverts it.
struct DragSession {
    /// The command pushed at session start, in case nothing is ever
    /// recorded and the session is finalized as a no-op.
    initial: Option<Command>,
}

/// An in-progress batch of commands recorded with `record_in_transaction`,
/// committed as a single [`CommandPayload::Batch`] undo entry or fully
/// rolled back.
struct Transaction {
    description: String,
    commands: Vec<Command>,
}

/// Undo/redo manager: owns the undo and redo stacks and mediates every
/// mutation of a [`SceneGraph`] that should be undoable.
///
/// `History` does not generate command ids or timestamps itself — callers
/// supply both to [`Command::new_move`] and friends before calling
/// [`History::execute`]. This keeps coalescing and persistence
/// deterministic and independently testable from wall-clock time.
pub struct History {
    config: HistoryConfig,
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    drag_session: Option<DragSession>,
    transaction: Option<Transaction>,
    listeners: Vec<(u64, Listener)>,
    next_subscription_id: u64,
    in_operation: bool,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("config", &self.config)
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("listener_count", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Opaque handle returned by [`History::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HistorySubscriptionId(u64);

/// The versioned wire shape written by [`History::save`] and read by
/// [`History::load`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryEnvelope {
    pub version: u32,
    pub timestamp: u64,
    pub commands: Vec<serde_json::Value>,
}

const ENVELOPE_VERSION: u32 = 1;

fn coalesces(existing: &Command, incoming: &Command, window_ms: u64) -> bool {
    if incoming.timestamp < existing.timestamp {
        return false;
    }
    if incoming.timestamp - existing.timestamp > window_ms {
        return false;
    }
    match (&existing.payload, &incoming.payload) {
        (CommandPayload::Move(a), CommandPayload::Move(b)) => a.ids == b.ids,
        (CommandPayload::Resize(a), CommandPayload::Resize(b)) => {
            a.id == b.id && a.handle == b.handle
        }
        (CommandPayload::StyleChange(a), CommandPayload::StyleChange(b)) => a.id == b.id,
        _ => false,
    }
}

/// Merges `incoming` into `existing` in place, combining their effective
/// deltas while keeping `existing`'s undo image (the state from *before*
/// the whole coalesced run began).
fn merge_into(existing: &mut Command, incoming: Command) {
    match (&mut existing.payload, incoming.payload) {
        (CommandPayload::Move(a), CommandPayload::Move(b)) => {
            a.dx += b.dx;
            a.dy += b.dy;
        }
        (CommandPayload::Resize(a), CommandPayload::Resize(b)) => {
            a.new_bounds = b.new_bounds;
        }
        (CommandPayload::StyleChange(a), CommandPayload::StyleChange(b)) => {
            merge_style_changes(&mut a.changes, b.changes);
        }
        _ => unreachable!("merge_into called on a non-coalescing pair"),
    }
    existing.timestamp = incoming.timestamp;
    existing.id = incoming.id;
}

fn merge_style_changes(a: &mut crate::command::StyleChanges, b: crate::command::StyleChanges) {
    if b.fills.is_some() {
        a.fills = b.fills;
    }
    if b.strokes.is_some() {
        a.strokes = b.strokes;
    }
    if b.corner_radius.is_some() {
        a.corner_radius = b.corner_radius;
    }
    if b.effects.is_some() {
        a.effects = b.effects;
    }
    if b.opacity.is_some() {
        a.opacity = b.opacity;
    }
    if b.blend_mode.is_some() {
        a.blend_mode = b.blend_mode;
    }
    if b.text.is_some() {
        a.text = b.text;
    }
}

fn estimate_bytes(command: &Command) -> usize {
    serde_json::to_string(command).map(|s| s.len() * 2).unwrap_or(0)
}

impl History {
    /// Creates a history manager with the given configuration.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            drag_session: None,
            transaction: None,
            listeners: Vec::new(),
            next_subscription_id: 0,
            in_operation: false,
        }
    }

    /// Runs `f` unless a history operation is already in flight (a listener
    /// calling back into `History` from inside `notify`), in which case it
    /// logs and returns `None` without calling `f` — so the caller's own
    /// method returns its "nothing happened" value instead of re-entering
    /// the stacks mid-mutation.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if self.in_operation {
            log::error!("history: {:?}", HistoryError::Reentrant);
            return None;
        }
        self.in_operation = true;
        let result = f(self);
        self.in_operation = false;
        Some(result)
    }

    /// Registers a listener called after every stack-changing operation.
    pub fn subscribe(&mut self, listener: impl FnMut(&HistoryChangeEvent) + 'static) -> HistorySubscriptionId {
        let id = HistorySubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;
        self.listeners.push((id.0, Box::new(listener)));
        id
    }

    /// Removes a previously registered listener.
    pub fn unsubscribe(&mut self, id: HistorySubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id.0);
        self.listeners.len() != before
    }

    fn notify(&mut self, kind: HistoryChangeKind) {
        let event = HistoryChangeEvent {
            kind,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        };
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.config.max_history {
            self.undo_stack.pop_front();
        }
        let mut total: usize = self.undo_stack.iter().map(estimate_bytes).sum();
        while self.undo_stack.len() > 1 && total > self.config.max_memory_bytes {
            let Some(front) = self.undo_stack.pop_front() else { break };
            total -= estimate_bytes(&front);
        }
    }

    /// Applies `command` to `scene`, pushes it to the undo stack (merging
    /// it into the top entry if it coalesces), and clears the redo stack.
    ///
    /// Returns `false` without mutating any stack if `command.execute`
    /// fails (a stale reference) or a drag session/transaction is active —
    /// use [`History::record_drag_update`]/[`History::record_in_transaction`]
    /// instead while one is open.
    pub fn execute(&mut self, scene: &mut SceneGraph, command: Command) -> bool {
        self.guarded(|this| this.execute_inner(scene, command)).unwrap_or(false)
    }

    fn execute_inner(&mut self, scene: &mut SceneGraph, command: Command) -> bool {
        if self.drag_session.is_some() || self.transaction.is_some() {
            log::warn!("history: execute called while a drag session or transaction is active");
            return false;
        }
        if !command.execute(scene) {
            return false;
        }
        self.redo_stack.clear();
        self.push_coalescing(command);
        true
    }

    fn push_coalescing(&mut self, command: Command) {
        let coalesced = match self.undo_stack.back() {
            Some(top) => coalesces(top, &command, self.config.coalesce_window_ms),
            None => false,
        };
        if coalesced {
            let top = self.undo_stack.back_mut().expect("checked above");
            merge_into(top, command);
            self.trim();
            self.notify(HistoryChangeKind::Coalesced);
        } else {
            self.undo_stack.push_back(command);
            self.trim();
            self.notify(HistoryChangeKind::Executed);
        }
    }

    /// Reverts the most recent undo entry. Returns `false` if the stack is
    /// empty or the command's `undo` fails.
    pub fn undo(&mut self, scene: &mut SceneGraph) -> bool {
        self.guarded(|this| this.undo_inner(scene)).unwrap_or(false)
    }

    fn undo_inner(&mut self, scene: &mut SceneGraph) -> bool {
        let Some(command) = self.undo_stack.pop_back() else { return false };
        if !command.undo(scene) {
            log::warn!("history: undo failed for command {}, re-pushing it", command.id);
            self.undo_stack.push_back(command);
            return false;
        }
        self.redo_stack.push(command);
        self.notify(HistoryChangeKind::Undone);
        true
    }

    /// Re-applies the most recently undone entry. Returns `false` if the
    /// redo stack is empty or the command's `execute` fails.
    pub fn redo(&mut self, scene: &mut SceneGraph) -> bool {
        self.guarded(|this| this.redo_inner(scene)).unwrap_or(false)
    }

    fn redo_inner(&mut self, scene: &mut SceneGraph) -> bool {
        let Some(command) = self.redo_stack.pop() else { return false };
        if !command.execute(scene) {
            log::warn!("history: redo failed for command {}, re-pushing it", command.id);
            self.redo_stack.push(command);
            return false;
        }
        self.undo_stack.push_back(command);
        self.trim();
        self.notify(HistoryChangeKind::Redone);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of entries currently on the undo stack.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Clears both stacks, discarding all history.
    pub fn clear(&mut self) {
        self.guarded(|this| {
            this.undo_stack.clear();
            this.redo_stack.clear();
            this.notify(HistoryChangeKind::Cleared);
        });
    }

    /// Begins a drag session: `initial` is applied immediately and becomes
    /// the session's provisional undo entry. Returns `false` if a session
    /// or transaction is already active, or `initial.execute` fails.
    pub fn start_drag_session(&mut self, scene: &mut SceneGraph, initial: Command) -> bool {
        self.guarded(|this| this.start_drag_session_inner(scene, initial)).unwrap_or(false)
    }

    fn start_drag_session_inner(&mut self, scene: &mut SceneGraph, initial: Command) -> bool {
        if self.drag_session.is_some() || self.transaction.is_some() {
            return false;
        }
        if !initial.execute(scene) {
            return false;
        }
        self.drag_session = Some(DragSession { initial: Some(initial) });
        true
    }

    /// Records a further update within the active drag session, merging
    /// it into the session's running command via the same coalescing
    /// rules `execute` uses. Returns `false` if no session is active or
    /// `update.execute` fails.
    pub fn record_drag_update(&mut self, scene: &mut SceneGraph, update: Command) -> bool {
        self.guarded(|this| this.record_drag_update_inner(scene, update)).unwrap_or(false)
    }

    fn record_drag_update_inner(&mut self, scene: &mut SceneGraph, update: Command) -> bool {
        let Some(session) = &mut self.drag_session else {
            log::error!("history: {}", HistoryError::NoActiveDragSession);
            return false;
        };
        if !update.execute(scene) {
            return false;
        }
        let merged = match session.initial.take() {
            Some(mut current) => {
                merge_into(&mut current, update);
                current
            }
            None => update,
        };
        session.initial = Some(merged);
        true
    }

    /// Commits the active drag session's accumulated command to the undo
    /// stack as a single entry. Returns `false` if no session is active.
    pub fn finalize_drag_session(&mut self) -> bool {
        self.guarded(Self::finalize_drag_session_inner).unwrap_or(false)
    }

    fn finalize_drag_session_inner(&mut self) -> bool {
        let Some(session) = self.drag_session.take() else {
            log::error!("history: {}", HistoryError::NoActiveDragSession);
            return false;
        };
        if let Some(command) = session.initial {
            self.redo_stack.clear();
            self.push_coalescing(command);
        }
        true
    }

    /// Reverts the active drag session's effect on `scene` entirely,
    /// without leaving an undo entry. Returns `false` if no session is
    /// active.
    pub fn cancel_drag_session(&mut self, scene: &mut SceneGraph) -> bool {
        self.guarded(|this| this.cancel_drag_session_inner(scene)).unwrap_or(false)
    }

    fn cancel_drag_session_inner(&mut self, scene: &mut SceneGraph) -> bool {
        let Some(session) = self.drag_session.take() else {
            log::error!("history: {}", HistoryError::NoActiveDragSession);
            return false;
        };
        if let Some(command) = session.initial {
            command.undo(scene);
        }
        true
    }

    /// Begins a transaction: subsequent `record_in_transaction` calls are
    /// buffered instead of pushed directly, so they can be committed as
    /// one batch or fully rolled back. Returns `false` if a session or
    /// transaction is already active.
    pub fn begin_transaction(&mut self, description: impl Into<String>) -> bool {
        let description = description.into();
        self.guarded(|this| this.begin_transaction_inner(description)).unwrap_or(false)
    }

    fn begin_transaction_inner(&mut self, description: String) -> bool {
        if self.drag_session.is_some() || self.transaction.is_some() {
            return false;
        }
        self.transaction = Some(Transaction {
            description,
            commands: Vec::new(),
        });
        true
    }

    /// Applies `command` to `scene` and buffers it in the active
    /// transaction. Returns `false` if no transaction is active or
    /// `command.execute` fails.
    pub fn record_in_transaction(&mut self, scene: &mut SceneGraph, command: Command) -> bool {
        self.guarded(|this| this.record_in_transaction_inner(scene, command)).unwrap_or(false)
    }

    fn record_in_transaction_inner(&mut self, scene: &mut SceneGraph, command: Command) -> bool {
        let Some(transaction) = &mut self.transaction else {
            log::error!("history: {}", HistoryError::NoActiveTransaction);
            return false;
        };
        if !command.execute(scene) {
            return false;
        }
        transaction.commands.push(command);
        true
    }

    /// Commits the active transaction's buffered commands as a single
    /// `BATCH` undo entry. Returns `false` if no transaction is active.
    /// A transaction with zero recorded commands is discarded silently
    /// (nothing to undo).
    pub fn commit_transaction(&mut self, id: impl Into<String>, timestamp: u64) -> bool {
        let id = id.into();
        self.guarded(|this| this.commit_transaction_inner(id, timestamp)).unwrap_or(false)
    }

    fn commit_transaction_inner(&mut self, id: String, timestamp: u64) -> bool {
        let Some(transaction) = self.transaction.take() else {
            log::error!("history: {}", HistoryError::NoActiveTransaction);
            return false;
        };
        if transaction.commands.is_empty() {
            return true;
        }
        let batch = Command::new_batch(id, timestamp, transaction.description, transaction.commands);
        self.redo_stack.clear();
        self.push_coalescing(batch);
        true
    }

    /// Reverts every command recorded so far in the active transaction
    /// and discards it without creating an undo entry. Returns `false` if
    /// no transaction is active.
    pub fn rollback_transaction(&mut self, scene: &mut SceneGraph) -> bool {
        self.guarded(|this| this.rollback_transaction_inner(scene)).unwrap_or(false)
    }

    fn rollback_transaction_inner(&mut self, scene: &mut SceneGraph) -> bool {
        let Some(transaction) = self.transaction.take() else {
            log::error!("history: {}", HistoryError::NoActiveTransaction);
            return false;
        };
        for command in transaction.commands.iter().rev() {
            command.undo(scene);
        }
        true
    }

    /// Estimated serialized size of the undo stack, in bytes (2x the JSON
    /// length of every entry, as a conservative proxy for the in-memory
    /// footprint of the payload's owned strings and vectors).
    #[must_use]
    pub fn estimated_memory_bytes(&self) -> usize {
        self.undo_stack.iter().map(estimate_bytes).sum()
    }

    /// Serializes the undo stack to a versioned envelope.
    #[must_use]
    pub fn save(&self, timestamp: u64) -> HistoryEnvelope {
        HistoryEnvelope {
            version: ENVELOPE_VERSION,
            timestamp,
            commands: self.undo_stack.iter().map(Command::serialize).collect(),
        }
    }

    /// Replaces the undo stack with the commands in `envelope`, clearing
    /// the redo stack. Does not re-execute anything against a scene graph
    /// — the caller is expected to have already restored the scene to the
    /// state the envelope's commands were captured against, and is only
    /// restoring undo/redo capability.
    pub fn load(&mut self, envelope: &HistoryEnvelope) -> Result<(), HistoryError> {
        self.guarded(|this| this.load_inner(envelope))
            .unwrap_or(Err(HistoryError::Reentrant))
    }

    fn load_inner(&mut self, envelope: &HistoryEnvelope) -> Result<(), HistoryError> {
        if envelope.version != ENVELOPE_VERSION {
            return Err(HistoryError::UnsupportedVersion(envelope.version));
        }
        let mut restored = VecDeque::with_capacity(envelope.commands.len());
        for value in &envelope.commands {
            let command = Command::deserialize(value)
                .ok_or_else(|| HistoryError::Malformed(format!("unrecognized command: {value}")))?;
            restored.push_back(command);
        }
        self.undo_stack = restored;
        self.redo_stack.clear();
        self.trim();
        self.notify(HistoryChangeKind::Cleared);
        Ok(())
    }

    /// True command-type classification of the top undo entry, mainly
    /// useful for tests and UI labels ("Undo Move", "Undo Delete", ...).
    #[must_use]
    pub fn peek_undo_type(&self) -> Option<CommandType> {
        self.undo_stack.back().map(Command::command_type)
    }

    /// Whether a host binding should wire keyboard shortcuts to
    /// undo/redo, per [`HistoryConfig::shortcuts_enabled`].
    #[must_use]
    pub fn shortcuts_enabled(&self) -> bool {
        self.config.shortcuts_enabled
    }
}

#[cfg(test)]
mod tests {
    use canopy_scene::{Node, NodeType};
    use pretty_assertions::assert_eq;

    use super::*;

    fn scene_with_node(id: &str) -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.add(Node::new(id, id, NodeType::Shape));
        scene
    }

    #[test]
    fn moves_within_window_coalesce_into_one_entry() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        let m1 = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 10.0, 0.0).unwrap();
        assert!(history.execute(&mut scene, m1));
        assert_eq!(history.undo_depth(), 1);

        let m2 = Command::new_move(&scene, "c2", 100, "move", vec!["n".to_string()], 5.0, 0.0).unwrap();
        assert!(history.execute(&mut scene, m2));
        assert_eq!(history.undo_depth(), 1, "second move within 500ms should coalesce");

        assert_eq!(scene.get("n").unwrap().local_transform.tx, 15.0);

        assert!(history.undo(&mut scene));
        assert_eq!(scene.get("n").unwrap().local_transform.tx, 0.0);
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn moves_outside_window_do_not_coalesce() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        let m1 = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 10.0, 0.0).unwrap();
        history.execute(&mut scene, m1);
        let m2 = Command::new_move(&scene, "c2", 1000, "move", vec!["n".to_string()], 5.0, 0.0).unwrap();
        history.execute(&mut scene, m2);

        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn delete_undo_restores_subtree() {
        let mut scene = SceneGraph::new();
        scene.add(Node::new("root", "root", NodeType::Frame));
        let mut child = Node::new("child", "child", NodeType::Shape);
        child.parent_id = Some("root".to_string());
        scene.add(child);
        let mut history = History::new(HistoryConfig::default());

        let delete = Command::new_delete(&scene, "c1", 0, "delete root", "root").unwrap();
        assert!(history.execute(&mut scene, delete));
        assert!(scene.is_empty());

        assert!(history.undo(&mut scene));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.get("root").unwrap().children, vec!["child".to_string()]);
    }

    #[test]
    fn execute_clears_redo_stack() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        let m1 = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 10.0, 0.0).unwrap();
        history.execute(&mut scene, m1);
        history.undo(&mut scene);
        assert!(history.can_redo());

        let m2 = Command::new_move(&scene, "c2", 2000, "move", vec!["n".to_string()], 1.0, 0.0).unwrap();
        history.execute(&mut scene, m2);
        assert!(!history.can_redo());
    }

    #[test]
    fn drag_session_coalesces_into_single_undo_entry() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        let start = Command::new_move(&scene, "c1", 0, "drag", vec!["n".to_string()], 1.0, 0.0).unwrap();
        assert!(history.start_drag_session(&mut scene, start));

        let update = Command::new_move(&scene, "c2", 10, "drag", vec!["n".to_string()], 2.0, 0.0).unwrap();
        assert!(history.record_drag_update(&mut scene, update));
        assert_eq!(scene.get("n").unwrap().local_transform.tx, 3.0);

        assert!(history.finalize_drag_session());
        assert_eq!(history.undo_depth(), 1);

        assert!(history.undo(&mut scene));
        assert_eq!(scene.get("n").unwrap().local_transform.tx, 0.0);
    }

    #[test]
    fn drag_session_cancel_reverts_without_history_entry() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        let start = Command::new_move(&scene, "c1", 0, "drag", vec!["n".to_string()], 7.0, 0.0).unwrap();
        history.start_drag_session(&mut scene, start);
        assert!(history.cancel_drag_session(&mut scene));

        assert_eq!(scene.get("n").unwrap().local_transform.tx, 0.0);
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn transaction_commits_as_single_batch_entry() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        assert!(history.begin_transaction("resize and recolor"));
        let move_cmd = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 5.0, 0.0).unwrap();
        assert!(history.record_in_transaction(&mut scene, move_cmd));
        let style_cmd = Command::new_style_change(
            &scene,
            "c2",
            0,
            "style",
            "n".to_string(),
            crate::command::StyleChanges {
                opacity: Some(0.2),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(history.record_in_transaction(&mut scene, style_cmd));

        assert!(history.commit_transaction("c3", 0));
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.peek_undo_type(), Some(CommandType::Batch));

        assert!(history.undo(&mut scene));
        assert_eq!(scene.get("n").unwrap().local_transform.tx, 0.0);
        assert_eq!(scene.get("n").unwrap().styles.opacity, 1.0);
    }

    #[test]
    fn transaction_rollback_reverts_without_history_entry() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        history.begin_transaction("abandoned");
        let move_cmd = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 5.0, 0.0).unwrap();
        history.record_in_transaction(&mut scene, move_cmd);

        assert!(history.rollback_transaction(&mut scene));
        assert_eq!(scene.get("n").unwrap().local_transform.tx, 0.0);
        assert_eq!(history.undo_depth(), 0);
    }

    #[test]
    fn max_history_trims_oldest_entries() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig {
            max_history: 2,
            coalesce_window_ms: 0,
            ..HistoryConfig::default()
        });

        for i in 0..5u64 {
            let cmd = Command::new_move(&scene, format!("c{i}"), i * 1000, "move", vec!["n".to_string()], 1.0, 0.0).unwrap();
            history.execute(&mut scene, cmd);
        }
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn save_and_load_round_trips_undo_stack() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());
        let cmd = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 1.0, 0.0).unwrap();
        history.execute(&mut scene, cmd);

        let envelope = history.save(12345);
        assert_eq!(envelope.version, 1);

        let mut restored = History::new(HistoryConfig::default());
        restored.load(&envelope).unwrap();
        assert_eq!(restored.undo_depth(), 1);
        assert!(!restored.can_redo());
    }

    #[test]
    fn load_rejects_unsupported_version() {
        let mut history = History::new(HistoryConfig::default());
        let envelope = HistoryEnvelope {
            version: 99,
            timestamp: 0,
            commands: vec![],
        };
        assert!(matches!(history.load(&envelope), Err(HistoryError::UnsupportedVersion(99))));
    }

    #[test]
    fn listener_observes_can_undo_transitions() {
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        history.subscribe(move |event| seen_clone.borrow_mut().push(event.can_undo));

        let cmd = Command::new_move(&scene, "c1", 0, "move", vec!["n".to_string()], 1.0, 0.0).unwrap();
        history.execute(&mut scene, cmd);
        history.undo(&mut scene);

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn guard_rejects_a_call_made_while_already_in_operation() {
        let mut history = History::new(HistoryConfig::default());
        history.in_operation = true;
        let ran = history.guarded(|_| "ran");
        assert_eq!(ran, None, "a nested operation must not run while one is already in flight");
    }

    #[test]
    fn reentrant_execute_from_within_notify_is_rejected_with_no_state_change() {
        // `notify` runs with `in_operation` already set by the outer
        // `execute`, so a listener that (directly or through a host
        // callback) tries to execute a second command against the same
        // `History` while the first is still being applied must be turned
        // away rather than corrupting the stacks.
        let mut scene = scene_with_node("n");
        let mut history = History::new(HistoryConfig::default());

        let inner = Command::new_move(&scene, "c2", 0, "move", vec!["n".to_string()], 100.0, 0.0).unwrap();
        history.subscribe(move |_event| {});
        assert!(history.in_operation == false);

        history.in_operation = true;
        let rejected = history.execute(&mut scene, inner);
        history.in_operation = false;

        assert!(!rejected, "execute must refuse to run while a history operation is already in flight");
        assert_eq!(history.undo_depth(), 0, "no command should have been pushed");
        assert_eq!(scene.get("n").unwrap().local_transform.tx, 0.0, "the rejected command must not have applied");
    }
}
