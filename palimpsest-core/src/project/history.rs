//! Shared command history and per-session undo bookkeeping.

use palimpsest_types::{Command, CommandKind, EntityTable, WideId};

/// Every command of the project, addressable by id and iterable in
/// revision order. Commands are never removed.
#[derive(Debug, Default)]
pub struct CommandLog {
    commands: EntityTable<Command>,
    order: Vec<WideId>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &WideId) -> Option<&Command> {
        self.commands.get(id)
    }

    pub fn last_revision(&self) -> u64 {
        self.order
            .last()
            .and_then(|id| self.commands.get(id))
            .map_or(0, |cmd| cmd.revision)
    }

    pub fn next_revision(&self) -> u64 {
        self.last_revision() + 1
    }

    /// Append a command. Revisions must strictly increase.
    pub fn push(&mut self, command: Command) {
        assert!(
            command.revision > self.last_revision(),
            "command revision {} does not follow {}",
            command.revision,
            self.last_revision()
        );
        self.order.push(command.id);
        self.commands.insert(command);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Commands in revision order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> + '_ {
        self.order.iter().filter_map(|id| self.commands.get(id))
    }
}

/// One user's undoable commands and the cursor separating applied entries
/// (below) from undone ones (at and above).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UndoStack {
    entries: Vec<WideId>,
    cursor: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a committed command authored by this stack's user.
    pub fn record(&mut self, command: &Command) {
        match command.kind {
            CommandKind::Undo { other } => {
                debug_assert_eq!(self.undo_target(), Some(other));
                self.cursor = self.cursor.saturating_sub(1);
            }
            CommandKind::Redo { other } => {
                debug_assert_eq!(self.redo_target(), Some(other));
                self.cursor = (self.cursor + 1).min(self.entries.len());
            }
            _ => {
                self.entries.truncate(self.cursor);
                self.entries.push(command.id);
                self.cursor = self.entries.len();
            }
        }
    }

    /// Command the next undo reverts.
    pub fn undo_target(&self) -> Option<WideId> {
        self.cursor.checked_sub(1).map(|i| self.entries[i])
    }

    /// Command the next redo re-applies.
    pub fn redo_target(&self) -> Option<WideId> {
        self.entries.get(self.cursor).copied()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[WideId] {
        &self.entries
    }
}
