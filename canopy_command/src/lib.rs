//! Canopy Command: undoable mutation commands and history management.
//!
//! Every mutation a user makes to a [`canopy_scene::SceneGraph`] — other
//! than the transform engine's own cached world-transform writeback —
//! should go through a [`Command`], not a direct `SceneGraph` call. A
//! command is a self-contained value: it carries both the forward
//! mutation and enough state, captured at construction time, to reverse
//! it, so it can be executed, undone, redone, persisted, and replayed
//! without any other context.
//!
//! [`History`] is the stack manager built on top: it coalesces rapid
//! same-target edits (a drag is many [`Command::new_move`] calls merged
//! into one undo entry), supports explicit drag sessions and
//! transactions for callers that want finer control than automatic
//! coalescing, and persists the undo stack to a versioned envelope.

mod command;
mod history;

pub use command::{
    Bounds, BatchPayload, Command, CommandPayload, CommandType, CornerRadiusPatch, CreatePayload,
    DeletePayload, MovePayload, NodePosition, ReparentPayload, ResizeHandle, ResizePayload,
    StyleChangePayload, StyleChanges, TextStylePatch,
};
pub use history::{
    History, HistoryChangeEvent, HistoryChangeKind, HistoryConfig, HistoryEnvelope, HistoryError,
    HistorySubscriptionId,
};
