//! Undo boundary used by the edit controllers

use crate::mesh::SpriteMeshData;

/// Receives a snapshot before every logical mutation.
pub trait UndoRecorder {
    /// Called with the mesh state about to be changed by `action`.
    fn record(&mut self, action: &str, mesh: &SpriteMeshData);

    /// Close the current undo group.
    fn increment_group(&mut self) {}
}

/// Recorder that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUndo;

impl UndoRecorder for NoUndo {
    fn record(&mut self, _action: &str, _mesh: &SpriteMeshData) {}
}

/// Bounded stack of full mesh snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: Vec<(String, SpriteMeshData)>,
    limit: usize,
    group: u32,
}

impl SnapshotHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
            group: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the most recent recorded action
    pub fn last_action(&self) -> Option<&str> {
        self.entries.last().map(|(name, _)| name.as_str())
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    /// Restore the most recent snapshot into `mesh`.
    pub fn undo(&mut self, mesh: &mut SpriteMeshData) -> bool {
        match self.entries.pop() {
            Some((_, snapshot)) => {
                *mesh = snapshot;
                true
            }
            None => false,
        }
    }
}

impl UndoRecorder for SnapshotHistory {
    fn record(&mut self, action: &str, mesh: &SpriteMeshData) {
        if self.entries.len() == self.limit {
            self.entries.remove(0);
        }
        self.entries.push((action.to_string(), mesh.clone()));
    }

    fn increment_group(&mut self) {
        self.group += 1;
    }
}
