//! Per-session whiteboard state.

use std::collections::HashMap;

use parking_lot::Mutex;
use slidecast_core::{SessionId, Stroke, WhiteboardSnapshot};

#[derive(Default)]
struct BoardState {
    enabled: bool,
    strokes: Vec<Stroke>,
}

/// Whiteboard flag and stroke log for every live session, in memory only.
///
/// An entry exists from [`open`](Self::open) until [`remove`](Self::remove)
/// and survives its session's connections coming and going. Mutations on a
/// session without an entry are refused, so traffic for unknown or ended
/// sessions leaves nothing behind. Nothing here is persisted.
#[derive(Default)]
pub struct SessionStateCache {
    boards: Mutex<HashMap<SessionId, BoardState>>,
}

impl SessionStateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `session_id` with a closed, empty board. Idempotent;
    /// returns whether the entry is new.
    pub fn open(&self, session_id: &SessionId) -> bool {
        let mut boards = self.boards.lock();
        if boards.contains_key(session_id) {
            return false;
        }
        let _ = boards.insert(session_id.clone(), BoardState::default());
        true
    }

    /// Whether `session_id` has an entry.
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.boards.lock().contains_key(session_id)
    }

    /// Open or close the whiteboard. Opening always starts from a blank
    /// canvas; closing keeps the log. Returns `false` for an untracked session.
    pub fn set_enabled(&self, session_id: &SessionId, enabled: bool) -> bool {
        let mut boards = self.boards.lock();
        let Some(board) = boards.get_mut(session_id) else {
            return false;
        };
        board.enabled = enabled;
        if enabled {
            board.strokes.clear();
        }
        true
    }

    /// Append a stroke. Returns `false`, storing nothing, when the stroke is
    /// too short to draw or the session is untracked.
    pub fn append_stroke(&self, session_id: &SessionId, stroke: Stroke) -> bool {
        if !stroke.is_drawable() {
            return false;
        }
        match self.boards.lock().get_mut(session_id) {
            Some(board) => {
                board.strokes.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Empty the stroke log. Returns `false` for an untracked session.
    pub fn clear(&self, session_id: &SessionId) -> bool {
        match self.boards.lock().get_mut(session_id) {
            Some(board) => {
                board.strokes.clear();
                true
            }
            None => false,
        }
    }

    /// Current state; a session with no whiteboard activity reads as closed
    /// and empty.
    pub fn get(&self, session_id: &SessionId) -> WhiteboardSnapshot {
        self.boards
            .lock()
            .get(session_id)
            .map(|b| WhiteboardSnapshot {
                enabled: b.enabled,
                strokes: b.strokes.clone(),
            })
            .unwrap_or_default()
    }

    /// Forget a session entirely.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        self.boards.lock().remove(session_id).is_some()
    }

    /// Sessions with whiteboard state.
    pub fn len(&self) -> usize {
        self.boards.lock().len()
    }

    /// Whether no session has whiteboard state.
    pub fn is_empty(&self) -> bool {
        self.boards.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecast_core::Point;

    fn stroke(n: usize) -> Stroke {
        Stroke {
            points: (0..n).map(|i| Point(i as f64 / 10.0, 0.5)).collect(),
            color: "#FF0000".into(),
            width: 3.0,
        }
    }

    fn sid() -> SessionId {
        SessionId::from("S")
    }

    fn opened() -> SessionStateCache {
        let cache = SessionStateCache::new();
        assert!(cache.open(&sid()));
        cache
    }

    #[test]
    fn unknown_session_reads_closed_and_empty() {
        let cache = SessionStateCache::new();
        assert_eq!(cache.get(&sid()), WhiteboardSnapshot::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn open_is_idempotent_and_starts_closed() {
        let cache = opened();
        assert!(cache.set_enabled(&sid(), true));
        assert!(!cache.open(&sid()));
        assert!(cache.get(&sid()).enabled);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn untracked_session_refuses_mutations() {
        let cache = SessionStateCache::new();
        assert!(!cache.set_enabled(&sid(), true));
        assert!(!cache.append_stroke(&sid(), stroke(3)));
        assert!(!cache.clear(&sid()));
        assert!(cache.is_empty());
        assert!(!cache.contains(&sid()));
    }

    #[test]
    fn removed_session_is_not_recreated() {
        let cache = opened();
        assert!(cache.remove(&sid()));
        assert!(!cache.append_stroke(&sid(), stroke(2)));
        assert!(!cache.set_enabled(&sid(), false));
        assert!(cache.is_empty());
    }

    #[test]
    fn enable_clears_previous_strokes() {
        let cache = opened();
        let _ = cache.set_enabled(&sid(), true);
        assert!(cache.append_stroke(&sid(), stroke(3)));
        let _ = cache.set_enabled(&sid(), false);
        let _ = cache.set_enabled(&sid(), true);
        let snap = cache.get(&sid());
        assert!(snap.enabled);
        assert!(snap.strokes.is_empty());
    }

    #[test]
    fn disable_keeps_strokes() {
        let cache = opened();
        let _ = cache.set_enabled(&sid(), true);
        let _ = cache.append_stroke(&sid(), stroke(2));
        let _ = cache.set_enabled(&sid(), false);
        let snap = cache.get(&sid());
        assert!(!snap.enabled);
        assert_eq!(snap.strokes.len(), 1);
    }

    #[test]
    fn single_point_stroke_dropped() {
        let cache = opened();
        assert!(!cache.append_stroke(&sid(), stroke(1)));
        assert!(!cache.append_stroke(&sid(), stroke(0)));
        assert!(cache.get(&sid()).strokes.is_empty());
    }

    #[test]
    fn strokes_keep_order_and_content() {
        let cache = opened();
        let first = stroke(2);
        let second = stroke(5);
        let _ = cache.append_stroke(&sid(), first.clone());
        let _ = cache.append_stroke(&sid(), second.clone());
        assert_eq!(cache.get(&sid()).strokes, vec![first, second]);
    }

    #[test]
    fn clear_and_remove() {
        let cache = opened();
        let _ = cache.set_enabled(&sid(), true);
        let _ = cache.append_stroke(&sid(), stroke(2));
        assert!(cache.clear(&sid()));
        let snap = cache.get(&sid());
        assert!(snap.enabled);
        assert!(snap.strokes.is_empty());
        assert!(cache.remove(&sid()));
        assert!(!cache.remove(&sid()));
        assert_eq!(cache.len(), 0);
    }
}
