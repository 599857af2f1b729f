// src/game/advance.rs

use crate::models::room::{HistoryEntry, Outcome, RoomState, RoomStatus};

/// Records `outcome` for the term on display and moves to the next one.
///
/// Shared by the manual buttons and the gesture path. Returns `false`
/// without touching `room` when no term is on display, or when
/// `expected_index` names a term that has already been answered.
pub fn advance(room: &mut RoomState, outcome: Outcome, expected_index: Option<usize>) -> bool {
    if room.state != RoomStatus::Playing || room.current_index >= room.queue.len() {
        return false;
    }
    if expected_index.is_some_and(|expected| expected != room.current_index) {
        tracing::debug!(
            "Dropping stale advance for index {:?}, room is at {}",
            expected_index,
            room.current_index
        );
        return false;
    }

    let term = room.queue[room.current_index].term.clone();
    room.history.push(HistoryEntry { term, outcome });
    room.current_index += 1;
    room.recompute_score();

    if room.current_index == room.queue.len() {
        room.finish_round();
    }
    true
}
