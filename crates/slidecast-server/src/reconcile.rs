//! Late-join snapshots.
//!
//! A connection that joins or rejoins mid-session gets the current state in
//! a few frames instead of a replay of everything it missed:
//!
//! 1. `slideChange` with the current slide and deck size
//! 2. `whiteboardToggle {enabled: true}`, only if the board is open
//! 3. `whiteboardState` with the full stroke log, right after the toggle
//!
//! The toggle must precede the strokes; a client paints onto the canvas the
//! toggle creates. Sessions that are not live produce nothing and the client
//! stays on its waiting screen. Reconciling a live session also starts
//! tracking its whiteboard, which covers sessions that outlive a restart.

use slidecast_core::protocol::ServerMessage;
use slidecast_core::{SessionId, SessionRecord, SyncError, WhiteboardSnapshot};
use tracing::debug;

use crate::hub::SessionHub;
use crate::lifecycle::LifecycleController;
use crate::websocket::connection::ClientConnection;

/// Frames that bring a client to the current state of `record`.
pub fn snapshot(record: &SessionRecord, board: &WhiteboardSnapshot) -> Vec<ServerMessage> {
    if !record.is_live() {
        return Vec::new();
    }
    let session_id = record.session_id.clone();
    let mut frames = vec![ServerMessage::SlideChange {
        session_id: session_id.clone(),
        slide: record.current_slide,
        slide_count: record.slide_count,
        client_id: None,
    }];
    if board.enabled {
        frames.push(ServerMessage::WhiteboardToggle {
            session_id: session_id.clone(),
            enabled: true,
            slide: None,
            slide_count: None,
            client_id: None,
        });
        frames.push(ServerMessage::WhiteboardState {
            session_id,
            strokes: board.strokes.clone(),
        });
    }
    frames
}

/// Send the snapshot of `session_id` to `conn` alone. Returns the number of
/// frames queued.
pub async fn reconcile(
    lifecycle: &LifecycleController,
    hub: &SessionHub,
    conn: &ClientConnection,
    session_id: &SessionId,
) -> Result<usize, SyncError> {
    let Some(record) = lifecycle.session(session_id).await? else {
        return Err(SyncError::NotFound(session_id.to_string()));
    };
    // no await between reading the board and queueing the frames
    if record.is_live() && hub.states.open(session_id) {
        debug!(%session_id, "whiteboard state opened");
    }
    let board = hub.states.get(session_id);
    let frames = snapshot(&record, &board);
    let sent = frames.iter().filter(|f| conn.send_message(f)).count();
    debug!(conn_id = %conn.id, %session_id, frames = frames.len(), sent, "reconciled");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use slidecast_core::{Point, SessionStatus, Stroke};

    fn record(status: SessionStatus) -> SessionRecord {
        let mut r = SessionRecord::new(SessionId::from("ABCD123"), Utc::now());
        r.status = status;
        r.current_slide = 5;
        r.slide_count = 10;
        r
    }

    fn three_point_stroke() -> Stroke {
        Stroke {
            points: vec![Point(0.1, 0.1), Point(0.2, 0.2), Point(0.3, 0.3)],
            color: "#FF0000".into(),
            width: 2.0,
        }
    }

    fn to_values(frames: &[ServerMessage]) -> Vec<serde_json::Value> {
        frames.iter().map(|f| serde_json::to_value(f).unwrap()).collect()
    }

    #[test]
    fn not_live_sends_nothing() {
        let board = WhiteboardSnapshot {
            enabled: true,
            strokes: vec![three_point_stroke()],
        };
        assert!(snapshot(&record(SessionStatus::Scheduled), &board).is_empty());
        assert!(snapshot(&record(SessionStatus::Ended), &board).is_empty());
    }

    #[test]
    fn live_without_board_is_slide_only() {
        let frames = snapshot(&record(SessionStatus::Live), &WhiteboardSnapshot::default());
        assert_eq!(
            to_values(&frames),
            vec![json!({"action": "slideChange", "sessionId": "ABCD123", "slide": 5, "slideCount": 10})]
        );
    }

    #[test]
    fn open_board_orders_toggle_before_strokes() {
        let board = WhiteboardSnapshot {
            enabled: true,
            strokes: vec![three_point_stroke()],
        };
        let frames = snapshot(&record(SessionStatus::Live), &board);
        let actions: Vec<&str> = frames.iter().map(ServerMessage::action).collect();
        assert_eq!(actions, vec!["slideChange", "whiteboardToggle", "whiteboardState"]);
        assert_eq!(
            to_values(&frames)[2],
            json!({
                "action": "whiteboardState",
                "sessionId": "ABCD123",
                "strokes": [{"points": [[0.1, 0.1], [0.2, 0.2], [0.3, 0.3]], "color": "#FF0000", "width": 2.0}]
            })
        );
    }

    #[test]
    fn closed_board_with_strokes_sends_slide_only() {
        let board = WhiteboardSnapshot {
            enabled: false,
            strokes: vec![three_point_stroke()],
        };
        assert_eq!(snapshot(&record(SessionStatus::Live), &board).len(), 1);
    }
}
